use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::deserialize_nullable;

pub const DEFAULT_REVIEW_NAME: &str = "Untitled Review";

/// An isolated systematic review workspace.
///
/// A review owns one tag taxonomy, one author list and one study list.
/// Deleting a review deletes everything it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Completion status of a review.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    InProgress,
    Completed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Input for creating a review. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateReviewInput {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<ReviewStatus>,
}

/// Input for updating a review. All fields are optional for partial updates;
/// an explicit `null` clears a date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewInput {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<ReviewStatus>,
}
