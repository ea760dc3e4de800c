use super::reviews::require_review;
use super::Database;
use crate::error::Result;
use crate::models::*;

impl Database {
    // ============================================================
    // Aggregates
    // ============================================================

    /// Study count for every tag of the review, including tags no study uses.
    pub fn tag_study_counts(&self, review_id: i64) -> Result<Vec<TagStudyCount>> {
        let conn = self.conn();
        require_review(&conn, review_id)?;

        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.parent_id, COUNT(st.study_id)
             FROM tags t
             LEFT JOIN study_tags st ON st.tag_id = t.id
             WHERE t.review_id = ?
             GROUP BY t.id
             ORDER BY t.name, t.id",
        )?;
        let counts = stmt
            .query_map([review_id], |row| {
                Ok(TagStudyCount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    parent_id: row.get(2)?,
                    study_count: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }

    /// Number of studies carrying each flag. Flags on no study are left out.
    pub fn flag_study_counts(&self, review_id: i64) -> Result<FlagStudyCounts> {
        let conn = self.conn();
        require_review(&conn, review_id)?;

        let mut stmt = conn.prepare("SELECT flags FROM studies WHERE review_id = ?")?;
        let rows = stmt.query_map([review_id], |row| row.get::<_, String>(0))?;

        let mut counts = FlagStudyCounts::new();
        for flags_json in rows {
            let flags: Vec<StudyFlag> = serde_json::from_str(&flags_json?)?;
            for flag in flags {
                *counts.entry(flag.as_str().to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
