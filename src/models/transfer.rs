use serde::{Deserialize, Serialize};

use super::tag::TagTemplate;
use crate::error::{Error, Result};

/// Portable, identity-free snapshot of a review.
///
/// Tags are nested by structure, and studies reference tags and authors by
/// name, so the document can be imported into any review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewDocument {
    #[serde(default)]
    pub tag_tree: Vec<TagTemplate>,
    #[serde(default)]
    pub authors: Vec<AuthorRecord>,
    #[serde(default)]
    pub studies: Vec<StudyRecord>,
}

impl ReviewDocument {
    /// Parse an untrusted JSON document, reporting shape problems as invalid arguments.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::invalid(format!("malformed review document: {e}")))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::invalid(format!("malformed review document: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorRecord {
    pub name: String,
}

/// A study as it appears in a [`ReviewDocument`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyRecord {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    /// Tag names.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pages: Option<String>,
}

/// What an import created versus found already present.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub tags_created: usize,
    pub tags_reused: usize,
    pub authors_created: usize,
    pub authors_reused: usize,
    pub studies_created: usize,
    pub studies_reused: usize,
}

impl ImportSummary {
    pub fn created(&self) -> usize {
        self.tags_created + self.authors_created + self.studies_created
    }
}
