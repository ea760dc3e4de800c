use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::deserialize_nullable;
use crate::error::{Error, Result};

/// A paper under review.
///
/// Studies are classified by flags, tags and authors. Tags and authors are
/// non-owning associations: deleting either detaches it from the study.
/// Everything a study references lives in the study's own review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Study {
    pub id: i64,
    pub review_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub summary: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub flags: Vec<StudyFlag>,
    /// Ids of the tags attached to this study.
    pub tags: Vec<i64>,
    /// Ids of the authors attached to this study.
    pub authors: Vec<i64>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pages: Option<String>,
    /// Where the study's PDF is stored, if anywhere.
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review classification label on a study. The set is closed.
///
/// - `Reviewed`: Screened and classified
/// - `PendingReview`: Waiting for a reviewer
/// - `MissingData`: Cannot be classified until more data is found
/// - `Flagged`: Needs attention
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StudyFlag {
    Reviewed,
    #[serde(rename = "Pending Review")]
    PendingReview,
    #[serde(rename = "Missing Data")]
    MissingData,
    Flagged,
}

impl StudyFlag {
    pub const ALL: [StudyFlag; 4] = [
        Self::Reviewed,
        Self::PendingReview,
        Self::MissingData,
        Self::Flagged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reviewed => "Reviewed",
            Self::PendingReview => "Pending Review",
            Self::MissingData => "Missing Data",
            Self::Flagged => "Flagged",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.as_str() == s)
    }

    /// Parse a list of raw flag values, naming every value that is not a flag.
    ///
    /// Duplicates collapse; the result keeps first-seen order.
    pub fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Vec<StudyFlag>> {
        let mut flags = Vec::new();
        let mut invalid = Vec::new();
        for value in values {
            match Self::from_str(value.as_ref()) {
                Some(flag) if !flags.contains(&flag) => flags.push(flag),
                Some(_) => {}
                None => invalid.push(format!("{:?}", value.as_ref())),
            }
        }
        if invalid.is_empty() {
            Ok(flags)
        } else {
            Err(Error::invalid(format!(
                "invalid flag value(s): {}",
                invalid.join(", ")
            )))
        }
    }
}

/// Input for creating a study.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateStudyInput {
    pub title: String,
    pub year: Option<i32>,
    pub summary: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Raw flag values, validated against [`StudyFlag`].
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub authors: Vec<i64>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pages: Option<String>,
    pub file_path: Option<String>,
}

/// Input for patching a study. All fields are optional for partial updates.
///
/// `tags` and `authors`, when present, replace the current sets. Optional
/// scalar fields are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStudyInput {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<Option<String>>,
    #[serde(
        rename = "abstract",
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<Option<String>>,
    pub flags: Option<Vec<String>>,
    pub tags: Option<Vec<i64>>,
    pub authors: Option<Vec<i64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub doi: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub pages: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_path: Option<Option<String>>,
}
