use std::collections::HashMap;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use super::reviews::require_review;
use super::{dedup_ids, parse_datetime, placeholders, Database};
use crate::error::{Error, Result};
use crate::models::*;

const STUDY_COLUMNS: &str = "id, review_id, title, year, summary, abstract, flags, doi, url, pages, \
                             file_path, created_at, updated_at";

/// Maps a study row without its tag and author sets.
fn study_from_row(row: &Row) -> rusqlite::Result<Study> {
    let flags_json: String = row.get(6)?;
    let flags: Vec<StudyFlag> = serde_json::from_str(&flags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(Study {
        id: row.get(0)?,
        review_id: row.get(1)?,
        title: row.get(2)?,
        year: row.get(3)?,
        summary: row.get(4)?,
        abstract_text: row.get(5)?,
        flags,
        tags: Vec::new(),
        authors: Vec::new(),
        doi: row.get(7)?,
        url: row.get(8)?,
        pages: row.get(9)?,
        file_path: row.get(10)?,
        created_at: parse_datetime(row.get(11)?),
        updated_at: parse_datetime(row.get(12)?),
    })
}

/// Association table, and the entity table its ids must come from.
#[derive(Debug, Clone, Copy)]
enum Link {
    Tags,
    Authors,
}

impl Link {
    fn table(self) -> &'static str {
        match self {
            Self::Tags => "study_tags",
            Self::Authors => "study_authors",
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Tags => "tag_id",
            Self::Authors => "author_id",
        }
    }

    fn target(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Authors => "authors",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Tags => "Tag",
            Self::Authors => "Author",
        }
    }
}

/// Fail with `NotFound` unless every id names an entity of this review.
fn check_links(conn: &Connection, review_id: i64, link: Link, ids: &[i64]) -> Result<Vec<i64>> {
    let ids = dedup_ids(ids);
    if ids.is_empty() {
        return Ok(ids);
    }

    let sql = format!(
        "SELECT id FROM {} WHERE review_id = ? AND id IN ({})",
        link.target(),
        placeholders(ids.len())
    );
    let mut params = vec![review_id];
    params.extend(&ids);

    let mut stmt = conn.prepare(&sql)?;
    let found = stmt
        .query_map(rusqlite::params_from_iter(params), |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(*id))
        .map(|id| id.to_string())
        .collect();
    if missing.is_empty() {
        Ok(ids)
    } else {
        Err(Error::not_found(format!(
            "{} {} in review {review_id}",
            link.label(),
            missing.join(", ")
        )))
    }
}

/// Replace the study's association set with `ids`.
fn set_links(conn: &Connection, study_id: i64, link: Link, ids: &[i64]) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE study_id = ?", link.table()),
        [study_id],
    )?;
    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {} (study_id, {}) VALUES (?, ?)",
        link.table(),
        link.column()
    ))?;
    for id in ids {
        stmt.execute([study_id, *id])?;
    }
    Ok(())
}

pub(crate) fn set_study_tags(conn: &Connection, study_id: i64, tag_ids: &[i64]) -> Result<()> {
    set_links(conn, study_id, Link::Tags, tag_ids)
}

pub(crate) fn set_study_authors(conn: &Connection, study_id: i64, author_ids: &[i64]) -> Result<()> {
    set_links(conn, study_id, Link::Authors, author_ids)
}

/// Study id → linked ids, for every study of a review.
fn load_links(conn: &Connection, review_id: i64, link: Link) -> Result<HashMap<i64, Vec<i64>>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT l.study_id, l.{col} FROM {table} l
         JOIN studies s ON s.id = l.study_id
         WHERE s.review_id = ?
         ORDER BY l.study_id, l.{col}",
        col = link.column(),
        table = link.table(),
    ))?;
    let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
    let rows = stmt.query_map([review_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (study_id, id) = row?;
        links.entry(study_id).or_default().push(id);
    }
    Ok(links)
}

fn load_study_links(conn: &Connection, study_id: i64, link: Link) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {col} FROM {table} WHERE study_id = ? ORDER BY {col}",
        col = link.column(),
        table = link.table(),
    ))?;
    let ids = stmt
        .query_map([study_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Every study of a review with its tag and author sets.
pub(crate) fn list_studies(conn: &Connection, review_id: i64) -> Result<Vec<Study>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STUDY_COLUMNS} FROM studies WHERE review_id = ? ORDER BY id"
    ))?;
    let mut studies = stmt
        .query_map([review_id], study_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut tags = load_links(conn, review_id, Link::Tags)?;
    let mut authors = load_links(conn, review_id, Link::Authors)?;
    for study in &mut studies {
        study.tags = tags.remove(&study.id).unwrap_or_default();
        study.authors = authors.remove(&study.id).unwrap_or_default();
    }
    Ok(studies)
}

pub(crate) fn require_study(conn: &Connection, review_id: i64, id: i64) -> Result<Study> {
    let mut study = conn
        .query_row(
            &format!("SELECT {STUDY_COLUMNS} FROM studies WHERE id = ? AND review_id = ?"),
            [id, review_id],
            study_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found(format!("Study {id} in review {review_id}")))?;
    study.tags = load_study_links(conn, id, Link::Tags)?;
    study.authors = load_study_links(conn, id, Link::Authors)?;
    Ok(study)
}

/// Id of the first study matching `(title, year)` in the review. A missing year only matches a missing year.
pub(crate) fn find_study_by_title_year(
    conn: &Connection,
    review_id: i64,
    title: &str,
    year: Option<i32>,
) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM studies WHERE review_id = ? AND title = ? AND year IS ?
             ORDER BY id LIMIT 1",
            (review_id, title, year),
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Insert the study row only; associations are set separately.
pub(crate) fn insert_study(
    conn: &Connection,
    review_id: i64,
    input: &CreateStudyInput,
    flags: &[StudyFlag],
) -> Result<i64> {
    if input.title.trim().is_empty() {
        return Err(Error::invalid("study title must not be empty"));
    }
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO studies (review_id, title, year, summary, abstract, flags, doi, url, pages,
                              file_path, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            review_id,
            &input.title,
            input.year,
            &input.summary,
            &input.abstract_text,
            serde_json::to_string(flags)?,
            &input.doi,
            &input.url,
            &input.pages,
            &input.file_path,
            &now,
            &now,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    // ============================================================
    // Study operations
    // ============================================================

    pub fn list_studies(&self, review_id: i64) -> Result<Vec<Study>> {
        let conn = self.conn();
        require_review(&conn, review_id)?;
        list_studies(&conn, review_id)
    }

    pub fn get_study(&self, review_id: i64, id: i64) -> Result<Study> {
        require_study(&self.conn(), review_id, id)
    }

    pub fn create_study(&self, review_id: i64, input: CreateStudyInput) -> Result<Study> {
        let mut created = self.create_studies(review_id, vec![input])?;
        created
            .pop()
            .ok_or_else(|| Error::invalid("no study to create"))
    }

    /// Create studies atomically, validating flags and tag/author references first.
    pub fn create_studies(
        &self,
        review_id: i64,
        inputs: Vec<CreateStudyInput>,
    ) -> Result<Vec<Study>> {
        self.transaction(|conn| {
            require_review(conn, review_id)?;
            inputs
                .iter()
                .map(|input| {
                    let flags = StudyFlag::parse_all(&input.flags)?;
                    let tags = check_links(conn, review_id, Link::Tags, &input.tags)?;
                    let authors = check_links(conn, review_id, Link::Authors, &input.authors)?;

                    let id = insert_study(conn, review_id, input, &flags)?;
                    set_study_tags(conn, id, &tags)?;
                    set_study_authors(conn, id, &authors)?;
                    require_study(conn, review_id, id)
                })
                .collect()
        })
    }

    /// Patch a study. Supplied `tags` or `authors` lists replace the current sets.
    pub fn update_study(&self, review_id: i64, id: i64, input: UpdateStudyInput) -> Result<Study> {
        self.transaction(|conn| {
            let existing = require_study(conn, review_id, id)?;

            if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
                return Err(Error::invalid("study title must not be empty"));
            }
            let flags = match &input.flags {
                Some(raw) => StudyFlag::parse_all(raw)?,
                None => existing.flags,
            };
            let tags = input
                .tags
                .as_deref()
                .map(|ids| check_links(conn, review_id, Link::Tags, ids))
                .transpose()?;
            let authors = input
                .authors
                .as_deref()
                .map(|ids| check_links(conn, review_id, Link::Authors, ids))
                .transpose()?;

            conn.execute(
                "UPDATE studies SET title = ?, year = ?, summary = ?, abstract = ?, flags = ?,
                                    doi = ?, url = ?, pages = ?, file_path = ?, updated_at = ?
                 WHERE id = ?",
                (
                    input.title.unwrap_or(existing.title),
                    input.year.unwrap_or(existing.year),
                    input.summary.unwrap_or(existing.summary),
                    input.abstract_text.unwrap_or(existing.abstract_text),
                    serde_json::to_string(&flags)?,
                    input.doi.unwrap_or(existing.doi),
                    input.url.unwrap_or(existing.url),
                    input.pages.unwrap_or(existing.pages),
                    input.file_path.unwrap_or(existing.file_path),
                    Utc::now().to_rfc3339(),
                    id,
                ),
            )?;

            if let Some(tags) = tags {
                set_study_tags(conn, id, &tags)?;
            }
            if let Some(authors) = authors {
                set_study_authors(conn, id, &authors)?;
            }

            require_study(conn, review_id, id)
        })
    }

    pub fn delete_study(&self, review_id: i64, id: i64) -> Result<()> {
        let rows = self.conn().execute(
            "DELETE FROM studies WHERE id = ? AND review_id = ?",
            [id, review_id],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("Study {id} in review {review_id}")));
        }
        Ok(())
    }
}
