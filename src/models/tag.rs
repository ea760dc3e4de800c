use serde::{Deserialize, Serialize};

use super::payload::{deserialize_nullable, deserialize_parent_id};

/// A node in a review's classification taxonomy.
///
/// Tags form a forest via `parent_id`: a tag without a parent is a root.
/// A parent always belongs to the same review as its child, and the
/// parent chain never loops back on itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub review_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
}

/// A tag with its nested children, used for tree responses.
///
/// The `tag` fields are flattened into the JSON response, with an additional
/// `children` array containing nested `TagTreeNode` objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagTreeNode {
    #[serde(flatten)]
    pub tag: Tag,
    pub children: Vec<TagTreeNode>,
}

/// An identity-free subtree: what bulk creation consumes and export produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<TagTemplate>,
}

impl From<&TagTreeNode> for TagTemplate {
    fn from(node: &TagTreeNode) -> Self {
        Self {
            name: node.tag.name.clone(),
            description: node.tag.description.clone(),
            children: node.children.iter().map(TagTemplate::from).collect(),
        }
    }
}

impl TagTemplate {
    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TagTemplate::size).sum::<usize>()
    }
}

/// Input for creating a tag, optionally with a whole subtree beneath it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Parent tag. `None`, `0` and `"null"` create a root tag.
    #[serde(
        default,
        alias = "parent_tag",
        deserialize_with = "deserialize_parent_id"
    )]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub children: Vec<TagTemplate>,
}

impl CreateTagInput {
    pub fn template(&self) -> TagTemplate {
        TagTemplate {
            name: self.name.clone(),
            description: self.description.clone(),
            children: self.children.clone(),
        }
    }
}

/// Input for moving a tag under a new parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveTagInput {
    /// New parent. `0`, `null` and `"null"` turn the tag into a root.
    #[serde(alias = "parent_tag", deserialize_with = "deserialize_parent_id")]
    pub new_parent_id: Option<i64>,
}

/// Input for renaming or redescribing a tag. At least one field is required.
///
/// An explicit `"description": null` clears the description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTagInput {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
}
