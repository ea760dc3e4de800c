use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::extract::{ApiError, Payload};
use crate::db::Database;
use crate::models::*;

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Reviews
// ============================================================

pub async fn list_reviews(State(db): State<Database>) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(db.list_reviews()?))
}

pub async fn get_review(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Review>> {
    Ok(Json(db.get_review(id)?))
}

pub async fn create_review(
    State(db): State<Database>,
    Payload(input): Payload<CreateReviewInput>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    Ok((StatusCode::CREATED, Json(db.create_review(input)?)))
}

pub async fn update_review(
    State(db): State<Database>,
    Path(id): Path<i64>,
    Payload(input): Payload<UpdateReviewInput>,
) -> ApiResult<Json<Review>> {
    Ok(Json(db.update_review(id, input)?))
}

pub async fn delete_review(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    db.delete_review(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Tags
// ============================================================

pub async fn get_tag_forest(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
) -> ApiResult<Json<Vec<TagTreeNode>>> {
    Ok(Json(db.get_tag_forest(review_id)?))
}

pub async fn get_tag_subtree(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
) -> ApiResult<Json<TagTreeNode>> {
    Ok(Json(db.get_tag_subtree(review_id, id)?))
}

/// Create one tag or a list of them, each with optional nested children.
pub async fn create_tags(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
    Payload(input): Payload<OneOrMany<CreateTagInput>>,
) -> ApiResult<(StatusCode, Json<OneOrMany<TagTreeNode>>)> {
    let one = input.is_one();
    let created = db.create_tags(review_id, input.into_vec())?;
    Ok((
        StatusCode::CREATED,
        Json(OneOrMany::from_vec(created, one)),
    ))
}

pub async fn move_tag(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
    Payload(input): Payload<MoveTagInput>,
) -> ApiResult<Json<Tag>> {
    Ok(Json(db.move_tag(review_id, id, input.new_parent_id)?))
}

pub async fn update_tag(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
    Payload(input): Payload<UpdateTagInput>,
) -> ApiResult<Json<Tag>> {
    Ok(Json(db.update_tag(review_id, id, input)?))
}

pub async fn delete_tag(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    db.delete_tag(review_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn tag_study_counts(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
) -> ApiResult<Json<Vec<TagStudyCount>>> {
    Ok(Json(db.tag_study_counts(review_id)?))
}

// ============================================================
// Studies
// ============================================================

pub async fn list_studies(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
) -> ApiResult<Json<Vec<Study>>> {
    Ok(Json(db.list_studies(review_id)?))
}

pub async fn get_study(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
) -> ApiResult<Json<Study>> {
    Ok(Json(db.get_study(review_id, id)?))
}

pub async fn create_studies(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
    Payload(input): Payload<OneOrMany<CreateStudyInput>>,
) -> ApiResult<(StatusCode, Json<OneOrMany<Study>>)> {
    let one = input.is_one();
    let created = db.create_studies(review_id, input.into_vec())?;
    Ok((
        StatusCode::CREATED,
        Json(OneOrMany::from_vec(created, one)),
    ))
}

pub async fn update_study(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
    Payload(input): Payload<UpdateStudyInput>,
) -> ApiResult<Json<Study>> {
    Ok(Json(db.update_study(review_id, id, input)?))
}

pub async fn delete_study(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    db.delete_study(review_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn flag_study_counts(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
) -> ApiResult<Json<FlagStudyCounts>> {
    Ok(Json(db.flag_study_counts(review_id)?))
}

// ============================================================
// Authors
// ============================================================

pub async fn list_authors(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
) -> ApiResult<Json<Vec<Author>>> {
    Ok(Json(db.list_authors(review_id)?))
}

pub async fn get_author(
    State(db): State<Database>,
    Path((review_id, id)): Path<(i64, i64)>,
) -> ApiResult<Json<Author>> {
    Ok(Json(db.get_author(review_id, id)?))
}

pub async fn create_authors(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
    Payload(input): Payload<OneOrMany<CreateAuthorInput>>,
) -> ApiResult<(StatusCode, Json<OneOrMany<Author>>)> {
    let one = input.is_one();
    let created = db.create_authors(review_id, input.into_vec())?;
    Ok((
        StatusCode::CREATED,
        Json(OneOrMany::from_vec(created, one)),
    ))
}

pub async fn delete_authors(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
    Payload(input): Payload<DeleteAuthorsInput>,
) -> ApiResult<Json<DeleteAuthorsResult>> {
    Ok(Json(db.delete_authors(review_id, &input.ids)?))
}

// ============================================================
// Export / import
// ============================================================

pub async fn export_review(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
) -> ApiResult<Json<ReviewDocument>> {
    Ok(Json(db.export_review(review_id)?))
}

pub async fn import_review(
    State(db): State<Database>,
    Path(review_id): Path<i64>,
    Payload(document): Payload<serde_json::Value>,
) -> ApiResult<Json<ImportSummary>> {
    let document = ReviewDocument::from_value(document)?;
    Ok(Json(db.import_review(review_id, &document)?))
}
