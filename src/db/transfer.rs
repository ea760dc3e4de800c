//! Whole-review export and idempotent import.

use std::collections::{HashMap, VecDeque};

use rusqlite::Connection;

use super::authors::{get_or_create_author, list_authors};
use super::reviews::require_review;
use super::studies::{
    find_study_by_title_year, insert_study, list_studies, set_study_authors, set_study_tags,
};
use super::tags::{insert_tag, list_tags, TagForest};
use super::{dedup_ids, Database};
use crate::error::Result;
use crate::models::*;

/// Tags of one review keyed by their natural key `(name, parent_id)`.
///
/// Same-named tags under different parents stay distinct. Looking a tag up by
/// bare name picks the lowest id among the candidates.
struct TagIndex {
    by_key: HashMap<(String, Option<i64>), i64>,
    by_name: HashMap<String, i64>,
}

impl TagIndex {
    fn new(tags: Vec<Tag>) -> Self {
        let mut index = Self {
            by_key: HashMap::new(),
            by_name: HashMap::new(),
        };
        for tag in tags {
            index.insert(tag.name, tag.parent_id, tag.id);
        }
        index
    }

    fn insert(&mut self, name: String, parent_id: Option<i64>, id: i64) {
        self.by_name
            .entry(name.clone())
            .and_modify(|existing| *existing = (*existing).min(id))
            .or_insert(id);
        self.by_key
            .entry((name, parent_id))
            .and_modify(|existing| *existing = (*existing).min(id))
            .or_insert(id);
    }

    fn get(&self, name: &str, parent_id: Option<i64>) -> Option<i64> {
        self.by_key.get(&(name.to_string(), parent_id)).copied()
    }

    fn resolve(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }
}

/// Get-or-create `template` under `parent_id`, then recurse into its children.
///
/// An existing tag keeps its description.
fn import_tag(
    conn: &Connection,
    review_id: i64,
    parent_id: Option<i64>,
    template: &TagTemplate,
    index: &mut TagIndex,
    summary: &mut ImportSummary,
) -> Result<()> {
    let id = match index.get(&template.name, parent_id) {
        Some(id) => {
            summary.tags_reused += 1;
            id
        }
        None => {
            let tag = insert_tag(
                conn,
                review_id,
                parent_id,
                &template.name,
                template.description.as_deref(),
            )?;
            index.insert(tag.name, parent_id, tag.id);
            summary.tags_created += 1;
            tag.id
        }
    };

    for child in &template.children {
        import_tag(conn, review_id, Some(id), child, index, summary)?;
    }
    Ok(())
}

/// Tag ids a study currently holds, grouped by tag name in id order.
fn held_tags(conn: &Connection, study_id: i64) -> Result<HashMap<String, VecDeque<i64>>> {
    let mut stmt = conn.prepare(
        "SELECT t.name, t.id FROM study_tags st
         JOIN tags t ON t.id = st.tag_id
         WHERE st.study_id = ?
         ORDER BY t.id",
    )?;
    let rows = stmt.query_map([study_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut held: HashMap<String, VecDeque<i64>> = HashMap::new();
    for row in rows {
        let (name, id) = row?;
        held.entry(name).or_default().push_back(id);
    }
    Ok(held)
}

fn import_studies(
    conn: &Connection,
    review_id: i64,
    records: &[StudyRecord],
    tags: &TagIndex,
    authors: &HashMap<String, i64>,
    summary: &mut ImportSummary,
) -> Result<()> {
    for record in records {
        let flags = StudyFlag::parse_all(&record.flags)?;

        let mut held = HashMap::new();
        let study_id = match find_study_by_title_year(conn, review_id, &record.title, record.year)? {
            Some(id) => {
                summary.studies_reused += 1;
                held = held_tags(conn, id)?;
                id
            }
            None => {
                let input = CreateStudyInput {
                    title: record.title.clone(),
                    year: record.year,
                    summary: record.summary.clone(),
                    abstract_text: record.abstract_text.clone(),
                    doi: record.doi.clone(),
                    url: record.url.clone(),
                    pages: record.pages.clone(),
                    ..Default::default()
                };
                summary.studies_created += 1;
                insert_study(conn, review_id, &input, &flags)?
            }
        };

        // A name the study already holds keeps its tag; unknown names drop out silently
        let tag_ids: Vec<i64> = record
            .tags
            .iter()
            .filter_map(|name| {
                held.get_mut(name)
                    .and_then(VecDeque::pop_front)
                    .or_else(|| tags.resolve(name))
            })
            .collect();
        let author_ids: Vec<i64> = record
            .authors
            .iter()
            .filter_map(|n| authors.get(n).copied())
            .collect();
        set_study_tags(conn, study_id, &dedup_ids(&tag_ids))?;
        set_study_authors(conn, study_id, &dedup_ids(&author_ids))?;
    }
    Ok(())
}

impl Database {
    // ============================================================
    // Export / import
    // ============================================================

    /// Snapshot a review as an identity-free document. Read-only.
    pub fn export_review(&self, review_id: i64) -> Result<ReviewDocument> {
        let conn = self.conn();
        require_review(&conn, review_id)?;

        let tags = list_tags(&conn, review_id)?;
        let tag_names: HashMap<i64, String> =
            tags.iter().map(|t| (t.id, t.name.clone())).collect();
        let tag_tree = TagForest::new(tags)
            .roots()
            .iter()
            .map(TagTemplate::from)
            .collect();

        let authors = list_authors(&conn, review_id)?;
        let author_names: HashMap<i64, String> =
            authors.iter().map(|a| (a.id, a.name.clone())).collect();

        let studies = list_studies(&conn, review_id)?
            .into_iter()
            .map(|study| StudyRecord {
                flags: study.flags.iter().map(|f| f.as_str().to_string()).collect(),
                tags: study
                    .tags
                    .iter()
                    .filter_map(|id| tag_names.get(id).cloned())
                    .collect(),
                authors: study
                    .authors
                    .iter()
                    .filter_map(|id| author_names.get(id).cloned())
                    .collect(),
                title: study.title,
                year: study.year,
                summary: study.summary,
                abstract_text: study.abstract_text,
                doi: study.doi,
                url: study.url,
                pages: study.pages,
            })
            .collect();

        Ok(ReviewDocument {
            tag_tree,
            authors: authors
                .into_iter()
                .map(|a| AuthorRecord { name: a.name })
                .collect(),
            studies,
        })
    }

    /// Reconcile a document into a review without duplicating what is already there.
    ///
    /// Tags are matched by `(name, parent)`, authors by name and studies by
    /// `(title, year)`. Matched entities keep their stored fields, except that a
    /// study's tag and author sets are always replaced by the document's. A tag
    /// name a matched study already holds resolves to the tag it holds.
    /// The whole import commits or rolls back as one transaction.
    pub fn import_review(&self, review_id: i64, document: &ReviewDocument) -> Result<ImportSummary> {
        let summary = self.transaction(|conn| {
            require_review(conn, review_id)?;
            let mut summary = ImportSummary::default();

            let mut tags = TagIndex::new(list_tags(conn, review_id)?);
            for template in &document.tag_tree {
                import_tag(conn, review_id, None, template, &mut tags, &mut summary)?;
            }

            for record in &document.authors {
                let (_, created) = get_or_create_author(conn, review_id, &record.name)?;
                if created {
                    summary.authors_created += 1;
                } else {
                    summary.authors_reused += 1;
                }
            }
            let authors: HashMap<String, i64> = list_authors(conn, review_id)?
                .into_iter()
                .map(|a| (a.name, a.id))
                .collect();

            import_studies(conn, review_id, &document.studies, &tags, &authors, &mut summary)?;
            Ok(summary)
        })?;

        tracing::info!(
            review_id,
            created = summary.created(),
            tags_created = summary.tags_created,
            authors_created = summary.authors_created,
            studies_created = summary.studies_created,
            "Imported review document"
        );
        Ok(summary)
    }
}
