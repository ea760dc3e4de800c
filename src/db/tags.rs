use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, OptionalExtension, Row};

use super::reviews::require_review;
use super::Database;
use crate::error::{Error, Result};
use crate::models::*;

const TAG_COLUMNS: &str = "id, review_id, parent_id, name, description";

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        review_id: row.get(1)?,
        parent_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
    })
}

pub(crate) fn find_tag(conn: &Connection, review_id: i64, id: i64) -> Result<Option<Tag>> {
    let tag = conn
        .query_row(
            &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ? AND review_id = ?"),
            [id, review_id],
            tag_from_row,
        )
        .optional()?;
    Ok(tag)
}

pub(crate) fn require_tag(conn: &Connection, review_id: i64, id: i64) -> Result<Tag> {
    find_tag(conn, review_id, id)?
        .ok_or_else(|| Error::not_found(format!("Tag {id} in review {review_id}")))
}

/// All tags of a review, ordered by name then id.
pub(crate) fn list_tags(conn: &Connection, review_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TAG_COLUMNS} FROM tags WHERE review_id = ? ORDER BY name, id"
    ))?;
    let tags = stmt
        .query_map([review_id], tag_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}

pub(crate) fn insert_tag(
    conn: &Connection,
    review_id: i64,
    parent_id: Option<i64>,
    name: &str,
    description: Option<&str>,
) -> Result<Tag> {
    if name.trim().is_empty() {
        return Err(Error::invalid("tag name must not be empty"));
    }

    conn.execute(
        "INSERT INTO tags (review_id, parent_id, name, description) VALUES (?, ?, ?, ?)",
        (review_id, parent_id, name, description),
    )?;

    Ok(Tag {
        id: conn.last_insert_rowid(),
        review_id,
        parent_id,
        name: name.to_string(),
        description: description.map(str::to_string),
    })
}

/// Create `template` under `parent_id`, then each of its children beneath it.
fn insert_subtree(
    conn: &Connection,
    review_id: i64,
    parent_id: Option<i64>,
    template: &TagTemplate,
) -> Result<TagTreeNode> {
    let tag = insert_tag(
        conn,
        review_id,
        parent_id,
        &template.name,
        template.description.as_deref(),
    )?;
    let mut children = template
        .children
        .iter()
        .map(|child| insert_subtree(conn, review_id, Some(tag.id), child))
        .collect::<Result<Vec<_>>>()?;
    children.sort_by(|a, b| (&a.tag.name, a.tag.id).cmp(&(&b.tag.name, b.tag.id)));
    Ok(TagTreeNode { tag, children })
}

/// Parent → children index over a flat tag list.
///
/// Children keep the order of the input list, so feeding it tags sorted by
/// name gives deterministic sibling order.
pub(crate) struct TagForest {
    children: HashMap<Option<i64>, Vec<Tag>>,
}

impl TagForest {
    pub(crate) fn new(tags: Vec<Tag>) -> Self {
        let mut children: HashMap<Option<i64>, Vec<Tag>> = HashMap::new();
        for tag in tags {
            children.entry(tag.parent_id).or_default().push(tag);
        }
        Self { children }
    }

    pub(crate) fn roots(&self) -> Vec<TagTreeNode> {
        self.subtrees(None)
    }

    pub(crate) fn materialize(&self, tag: Tag) -> TagTreeNode {
        let children = self.subtrees(Some(tag.id));
        TagTreeNode { tag, children }
    }

    fn subtrees(&self, parent_id: Option<i64>) -> Vec<TagTreeNode> {
        self.children
            .get(&parent_id)
            .map(|tags| {
                tags.iter()
                    .map(|tag| self.materialize(tag.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Whether `candidate` is `tag_id` itself or sits somewhere beneath it.
fn is_self_or_descendant(conn: &Connection, tag_id: i64, candidate: i64) -> Result<bool> {
    let mut visited = HashSet::new();
    let mut current = Some(candidate);
    while let Some(id) = current {
        if id == tag_id {
            return Ok(true);
        }
        if !visited.insert(id) {
            break;
        }
        current = conn
            .query_row("SELECT parent_id FROM tags WHERE id = ?", [id], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()?
            .flatten();
    }
    Ok(false)
}

impl Database {
    // ============================================================
    // Tag tree operations
    // ============================================================

    /// Flat list of every tag in a review.
    pub fn list_tags(&self, review_id: i64) -> Result<Vec<Tag>> {
        let conn = self.conn();
        require_review(&conn, review_id)?;
        list_tags(&conn, review_id)
    }

    pub fn get_tag(&self, review_id: i64, id: i64) -> Result<Tag> {
        require_tag(&self.conn(), review_id, id)
    }

    /// The forest of root tags, each materialized with all its descendants.
    pub fn get_tag_forest(&self, review_id: i64) -> Result<Vec<TagTreeNode>> {
        let conn = self.conn();
        require_review(&conn, review_id)?;
        Ok(TagForest::new(list_tags(&conn, review_id)?).roots())
    }

    /// One tag materialized with all its descendants.
    pub fn get_tag_subtree(&self, review_id: i64, id: i64) -> Result<TagTreeNode> {
        let conn = self.conn();
        let tag = require_tag(&conn, review_id, id)?;
        Ok(TagForest::new(list_tags(&conn, review_id)?).materialize(tag))
    }

    /// Create a tag and any nested children it carries.
    pub fn create_tag(&self, review_id: i64, input: CreateTagInput) -> Result<TagTreeNode> {
        let mut created = self.create_tags(review_id, vec![input])?;
        created
            .pop()
            .ok_or_else(|| Error::invalid("no tag to create"))
    }

    /// Create several tag subtrees atomically. Returns the created subtrees in input order.
    pub fn create_tags(
        &self,
        review_id: i64,
        inputs: Vec<CreateTagInput>,
    ) -> Result<Vec<TagTreeNode>> {
        self.transaction(|conn| {
            require_review(conn, review_id)?;
            inputs
                .iter()
                .map(|input| {
                    if let Some(parent_id) = input.parent_id {
                        require_tag(conn, review_id, parent_id)?;
                    }
                    let template = input.template();
                    tracing::debug!(
                        review_id,
                        parent_id = ?input.parent_id,
                        tags = template.size(),
                        "Creating tag subtree"
                    );
                    insert_subtree(conn, review_id, input.parent_id, &template)
                })
                .collect()
        })
    }

    /// Reparent a tag. `None` makes it a root.
    ///
    /// Moving a tag under itself or one of its descendants is rejected, since
    /// that would detach the whole branch from the forest.
    pub fn move_tag(&self, review_id: i64, id: i64, new_parent_id: Option<i64>) -> Result<Tag> {
        let conn = self.conn();
        let mut tag = require_tag(&conn, review_id, id)?;

        if let Some(parent_id) = new_parent_id {
            require_tag(&conn, review_id, parent_id)?;
            if is_self_or_descendant(&conn, id, parent_id)? {
                return Err(Error::invalid(format!(
                    "cannot move tag {id} under its own descendant {parent_id}"
                )));
            }
        }

        conn.execute(
            "UPDATE tags SET parent_id = ? WHERE id = ?",
            (new_parent_id, id),
        )?;
        tracing::debug!(review_id, tag_id = id, ?new_parent_id, "Moved tag");

        tag.parent_id = new_parent_id;
        Ok(tag)
    }

    /// Rename and/or redescribe a tag.
    pub fn update_tag(&self, review_id: i64, id: i64, input: UpdateTagInput) -> Result<Tag> {
        if input.name.is_none() && input.description.is_none() {
            return Err(Error::invalid("name or description is required"));
        }
        if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::invalid("tag name must not be empty"));
        }

        let conn = self.conn();
        let existing = require_tag(&conn, review_id, id)?;
        let tag = Tag {
            name: input.name.unwrap_or(existing.name),
            description: input.description.unwrap_or(existing.description),
            ..existing
        };

        conn.execute(
            "UPDATE tags SET name = ?, description = ? WHERE id = ?",
            (&tag.name, &tag.description, id),
        )?;

        Ok(tag)
    }

    /// Delete a tag and all its descendants. Studies lose the association.
    pub fn delete_tag(&self, review_id: i64, id: i64) -> Result<()> {
        let conn = self.conn();
        let rows = conn.execute(
            "DELETE FROM tags WHERE id = ? AND review_id = ?",
            [id, review_id],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("Tag {id} in review {review_id}")));
        }
        tracing::debug!(review_id, tag_id = id, "Deleted tag subtree");
        Ok(())
    }
}
