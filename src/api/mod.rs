mod extract;
mod handlers;

pub use extract::{ApiError, Payload};

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::Database;

/// Router with permissive CORS, for local use and tests.
pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, &AppConfig::default())
}

pub fn create_router_with_config(db: Database, config: &AppConfig) -> Router {
    let api = Router::new()
        // Reviews
        .route(
            "/reviews",
            get(handlers::list_reviews).post(handlers::create_review),
        )
        .route(
            "/reviews/{review_id}",
            get(handlers::get_review)
                .patch(handlers::update_review)
                .delete(handlers::delete_review),
        )
        // Tags
        .route(
            "/reviews/{review_id}/tags",
            get(handlers::get_tag_forest).post(handlers::create_tags),
        )
        .route(
            "/reviews/{review_id}/tags/count",
            get(handlers::tag_study_counts),
        )
        .route(
            "/reviews/{review_id}/tags/{id}",
            get(handlers::get_tag_subtree)
                .put(handlers::move_tag)
                .patch(handlers::update_tag)
                .delete(handlers::delete_tag),
        )
        // Studies
        .route(
            "/reviews/{review_id}/studies",
            get(handlers::list_studies).post(handlers::create_studies),
        )
        .route(
            "/reviews/{review_id}/studies/flags/count",
            get(handlers::flag_study_counts),
        )
        .route(
            "/reviews/{review_id}/studies/{id}",
            get(handlers::get_study)
                .patch(handlers::update_study)
                .delete(handlers::delete_study),
        )
        // Authors
        .route(
            "/reviews/{review_id}/authors",
            get(handlers::list_authors).post(handlers::create_authors),
        )
        .route(
            "/reviews/{review_id}/authors/delete",
            post(handlers::delete_authors),
        )
        .route(
            "/reviews/{review_id}/authors/{id}",
            get(handlers::get_author),
        )
        // Transfer
        .route("/reviews/{review_id}/export", get(handlers::export_review))
        .route("/reviews/{review_id}/import", post(handlers::import_review))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(db)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    match &config.cors_origins {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}
