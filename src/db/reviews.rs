use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::*;

const REVIEW_COLUMNS: &str = "id, name, start_date, end_date, status, created_at, updated_at";

fn review_from_row(row: &Row) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get::<_, Option<String>>(2)?.map(parse_datetime),
        end_date: row.get::<_, Option<String>>(3)?.map(parse_datetime),
        status: ReviewStatus::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        created_at: parse_datetime(row.get(5)?),
        updated_at: parse_datetime(row.get(6)?),
    })
}

fn find_review(conn: &Connection, id: i64) -> Result<Option<Review>> {
    let review = conn
        .query_row(
            &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?"),
            [id],
            review_from_row,
        )
        .optional()?;
    Ok(review)
}

/// Fail with `NotFound` unless the review exists.
pub(crate) fn require_review(conn: &Connection, id: i64) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE id = ?)",
        [id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(Error::not_found(format!("Review {id}")))
    }
}

impl Database {
    // ============================================================
    // Review operations
    // ============================================================

    pub fn list_reviews(&self) -> Result<Vec<Review>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY name, id"
        ))?;
        let reviews = stmt
            .query_map([], review_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reviews)
    }

    pub fn get_review(&self, id: i64) -> Result<Review> {
        find_review(&self.conn(), id)?.ok_or_else(|| Error::not_found(format!("Review {id}")))
    }

    pub fn create_review(&self, input: CreateReviewInput) -> Result<Review> {
        let name = match input.name {
            Some(name) if name.trim().is_empty() => {
                return Err(Error::invalid("review name must not be empty"))
            }
            Some(name) => name,
            None => DEFAULT_REVIEW_NAME.to_string(),
        };
        let status = input.status.unwrap_or_default();
        let now = Utc::now();

        let conn = self.conn();
        conn.execute(
            "INSERT INTO reviews (name, start_date, end_date, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                &name,
                input.start_date.map(|d| d.to_rfc3339()),
                input.end_date.map(|d| d.to_rfc3339()),
                status.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Review {
            id: conn.last_insert_rowid(),
            name,
            start_date: input.start_date,
            end_date: input.end_date,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_review(&self, id: i64, input: UpdateReviewInput) -> Result<Review> {
        let conn = self.conn();
        let existing =
            find_review(&conn, id)?.ok_or_else(|| Error::not_found(format!("Review {id}")))?;

        if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::invalid("review name must not be empty"));
        }

        let now = Utc::now();
        let review = Review {
            id,
            name: input.name.unwrap_or(existing.name),
            start_date: input.start_date.unwrap_or(existing.start_date),
            end_date: input.end_date.unwrap_or(existing.end_date),
            status: input.status.unwrap_or(existing.status),
            created_at: existing.created_at,
            updated_at: now,
        };

        conn.execute(
            "UPDATE reviews SET name = ?, start_date = ?, end_date = ?, status = ?, updated_at = ?
             WHERE id = ?",
            (
                &review.name,
                review.start_date.map(|d| d.to_rfc3339()),
                review.end_date.map(|d| d.to_rfc3339()),
                review.status.as_str(),
                now.to_rfc3339(),
                id,
            ),
        )?;

        Ok(review)
    }

    /// Delete a review together with every tag, study and author it owns.
    pub fn delete_review(&self, id: i64) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM reviews WHERE id = ?", [id])?;
        if rows == 0 {
            return Err(Error::not_found(format!("Review {id}")));
        }
        tracing::info!(review_id = id, "Deleted review");
        Ok(())
    }
}
