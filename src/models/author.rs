use serde::{Deserialize, Serialize};

/// A study author. Names are unique within a review, not globally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub review_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuthorInput {
    pub name: String,
}

/// Batch of author ids to delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAuthorsInput {
    pub ids: Vec<i64>,
}

/// The ids that existed and were deleted. Unknown ids are left out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteAuthorsResult {
    pub deleted: Vec<i64>,
}
