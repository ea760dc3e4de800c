use rusqlite::{Connection, OptionalExtension, Row};

use super::reviews::require_review;
use super::{dedup_ids, Database};
use crate::error::{Error, Result};
use crate::models::*;

fn author_from_row(row: &Row) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        review_id: row.get(1)?,
        name: row.get(2)?,
    })
}

pub(crate) fn list_authors(conn: &Connection, review_id: i64) -> Result<Vec<Author>> {
    let mut stmt = conn.prepare(
        "SELECT id, review_id, name FROM authors WHERE review_id = ? ORDER BY name, id",
    )?;
    let authors = stmt
        .query_map([review_id], author_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(authors)
}

fn insert_author(conn: &Connection, review_id: i64, name: &str) -> Result<Author> {
    if name.trim().is_empty() {
        return Err(Error::invalid("author name must not be empty"));
    }
    conn.execute(
        "INSERT INTO authors (review_id, name) VALUES (?, ?)",
        (review_id, name),
    )
    .map_err(|e| match Error::from(e) {
        Error::Conflict(_) => {
            Error::Conflict(format!("author {name:?} already exists in review {review_id}"))
        }
        other => other,
    })?;
    Ok(Author {
        id: conn.last_insert_rowid(),
        review_id,
        name: name.to_string(),
    })
}

/// Return the author named `name` in the review, creating it if needed.
///
/// The flag is `true` when the author was created.
pub(crate) fn get_or_create_author(
    conn: &Connection,
    review_id: i64,
    name: &str,
) -> Result<(Author, bool)> {
    let existing = conn
        .query_row(
            "SELECT id, review_id, name FROM authors WHERE review_id = ? AND name = ?",
            (review_id, name),
            author_from_row,
        )
        .optional()?;
    match existing {
        Some(author) => Ok((author, false)),
        None => Ok((insert_author(conn, review_id, name)?, true)),
    }
}

impl Database {
    // ============================================================
    // Author operations
    // ============================================================

    pub fn list_authors(&self, review_id: i64) -> Result<Vec<Author>> {
        let conn = self.conn();
        require_review(&conn, review_id)?;
        list_authors(&conn, review_id)
    }

    pub fn get_author(&self, review_id: i64, id: i64) -> Result<Author> {
        self.conn()
            .query_row(
                "SELECT id, review_id, name FROM authors WHERE id = ? AND review_id = ?",
                [id, review_id],
                author_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(format!("Author {id} in review {review_id}")))
    }

    /// Create authors atomically. A name already taken in the review is a conflict.
    pub fn create_authors(
        &self,
        review_id: i64,
        inputs: Vec<CreateAuthorInput>,
    ) -> Result<Vec<Author>> {
        self.transaction(|conn| {
            require_review(conn, review_id)?;
            inputs
                .iter()
                .map(|input| insert_author(conn, review_id, &input.name))
                .collect()
        })
    }

    /// Delete the given authors, returning exactly the ids that existed.
    ///
    /// Ids that are unknown or belong to another review are skipped silently.
    pub fn delete_authors(&self, review_id: i64, ids: &[i64]) -> Result<DeleteAuthorsResult> {
        self.transaction(|conn| {
            require_review(conn, review_id)?;
            let mut deleted = Vec::new();
            for id in dedup_ids(ids) {
                let rows = conn.execute(
                    "DELETE FROM authors WHERE id = ? AND review_id = ?",
                    [id, review_id],
                )?;
                if rows > 0 {
                    deleted.push(id);
                }
            }
            tracing::debug!(review_id, requested = ids.len(), deleted = deleted.len(), "Deleted authors");
            Ok(DeleteAuthorsResult { deleted })
        })
    }
}
