use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use sysrev::api::create_router;
use sysrev::db::Database;
use sysrev::models::*;

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router(db);
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_review(server: &TestServer) -> Review {
    server
        .post("/api/v1/reviews")
        .json(&json!({ "name": "Test Review" }))
        .await
        .json::<Review>()
}

async fn create_tag(server: &TestServer, review_id: i64, body: serde_json::Value) -> TagTreeNode {
    server
        .post(&format!("/api/v1/reviews/{}/tags", review_id))
        .json(&body)
        .await
        .json::<TagTreeNode>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();

        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

mod reviews {
    use super::*;

    #[tokio::test]
    async fn creates_and_lists_reviews() {
        let server = setup();

        let response = server
            .post("/api/v1/reviews")
            .json(&json!({ "name": "Deep Learning Survey" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let review: Review = response.json();
        assert_eq!(review.name, "Deep Learning Survey");
        assert_eq!(review.status, ReviewStatus::InProgress);

        let reviews: Vec<Review> = server.get("/api/v1/reviews").await.json();
        assert_eq!(reviews.len(), 1);
    }

    #[tokio::test]
    async fn patches_the_status() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .patch(&format!("/api/v1/reviews/{}", review.id))
            .json(&json!({ "status": "completed" }))
            .await;

        response.assert_status_ok();
        let updated: Review = response.json();
        assert_eq!(updated.status, ReviewStatus::Completed);
        assert_eq!(updated.name, "Test Review");
    }

    #[tokio::test]
    async fn deletes_a_review() {
        let server = setup();
        let review = create_test_review(&server).await;

        server
            .delete(&format!("/api/v1/reviews/{}", review.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/v1/reviews/{}", review.id))
            .await
            .assert_status_not_found();
    }
}

mod tags {
    use super::*;

    #[tokio::test]
    async fn creates_a_nested_tree_and_returns_the_forest() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .post(&format!("/api/v1/reviews/{}/tags", review.id))
            .json(&json!({
                "name": "ML",
                "parent_tag": "null",
                "children": [{ "name": "Supervised", "children": [{ "name": "SVM" }] }]
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let node: TagTreeNode = response.json();
        assert_eq!(node.tag.name, "ML");
        assert_eq!(node.children[0].children[0].tag.name, "SVM");

        let forest: Vec<TagTreeNode> = server
            .get(&format!("/api/v1/reviews/{}/tags", review.id))
            .await
            .json();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children[0].tag.name, "Supervised");
    }

    #[tokio::test]
    async fn answers_a_list_with_a_list() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .post(&format!("/api/v1/reviews/{}/tags", review.id))
            .json(&json!([{ "name": "ML" }, { "name": "Stats" }]))
            .await;

        response.assert_status(StatusCode::CREATED);
        let nodes: Vec<TagTreeNode> = response.json();
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn returns_not_found_for_a_missing_parent() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .post(&format!("/api/v1/reviews/{}/tags", review.id))
            .json(&json!({ "name": "Orphan", "parent_id": 999 }))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn moves_a_tag_to_the_root_with_zero() {
        let server = setup();
        let review = create_test_review(&server).await;
        let ml = create_tag(
            &server,
            review.id,
            json!({ "name": "ML", "children": [{ "name": "SVM" }] }),
        )
        .await;
        let svm = ml.children[0].tag.id;

        let response = server
            .put(&format!("/api/v1/reviews/{}/tags/{}", review.id, svm))
            .json(&json!({ "new_parent_id": 0 }))
            .await;

        response.assert_status_ok();
        let moved: Tag = response.json();
        assert!(moved.parent_id.is_none());
    }

    #[tokio::test]
    async fn rejects_a_move_into_its_own_subtree() {
        let server = setup();
        let review = create_test_review(&server).await;
        let ml = create_tag(
            &server,
            review.id,
            json!({ "name": "ML", "children": [{ "name": "SVM" }] }),
        )
        .await;

        let response = server
            .put(&format!("/api/v1/reviews/{}/tags/{}", review.id, ml.tag.id))
            .json(&json!({ "new_parent_id": ml.children[0].tag.id }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn clears_a_description_with_null() {
        let server = setup();
        let review = create_test_review(&server).await;
        let ml = create_tag(
            &server,
            review.id,
            json!({ "name": "ML", "description": "Machine learning" }),
        )
        .await;

        let response = server
            .patch(&format!("/api/v1/reviews/{}/tags/{}", review.id, ml.tag.id))
            .json(&json!({ "description": null }))
            .await;

        response.assert_status_ok();
        let updated: Tag = response.json();
        assert_eq!(updated.name, "ML");
        assert!(updated.description.is_none());
    }

    #[tokio::test]
    async fn rejects_a_rename_without_fields() {
        let server = setup();
        let review = create_test_review(&server).await;
        let ml = create_tag(&server, review.id, json!({ "name": "ML" })).await;

        let response = server
            .patch(&format!("/api/v1/reviews/{}/tags/{}", review.id, ml.tag.id))
            .json(&json!({}))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .post(&format!("/api/v1/reviews/{}/tags", review.id))
            .text("{not json")
            .content_type("application/json")
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn deletes_a_subtree() {
        let server = setup();
        let review = create_test_review(&server).await;
        let ml = create_tag(
            &server,
            review.id,
            json!({ "name": "ML", "children": [{ "name": "SVM" }] }),
        )
        .await;

        server
            .delete(&format!("/api/v1/reviews/{}/tags/{}", review.id, ml.tag.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!(
                "/api/v1/reviews/{}/tags/{}",
                review.id, ml.children[0].tag.id
            ))
            .await
            .assert_status_not_found();
    }
}

mod studies {
    use super::*;

    #[tokio::test]
    async fn reports_the_invalid_flag() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .post(&format!("/api/v1/reviews/{}/studies", review.id))
            .json(&json!({ "title": "S1", "flags": ["Reviewed", "Bogus"] }))
            .await;

        response.assert_status_bad_request();
        assert!(response.text().contains("Bogus"));
    }

    #[tokio::test]
    async fn counts_studies_per_tag_and_flag() {
        let server = setup();
        let review = create_test_review(&server).await;
        let ml = create_tag(&server, review.id, json!({ "name": "ML" })).await;
        create_tag(&server, review.id, json!({ "name": "Unused" })).await;

        server
            .post(&format!("/api/v1/reviews/{}/studies", review.id))
            .json(&json!([
                { "title": "S1", "tags": [ml.tag.id], "flags": ["Reviewed"] },
                { "title": "S2", "tags": [ml.tag.id], "flags": ["Pending Review"] }
            ]))
            .await
            .assert_status(StatusCode::CREATED);

        let tag_counts: Vec<TagStudyCount> = server
            .get(&format!("/api/v1/reviews/{}/tags/count", review.id))
            .await
            .json();
        assert_eq!(tag_counts.len(), 2);
        assert_eq!(tag_counts[0].name, "ML");
        assert_eq!(tag_counts[0].study_count, 2);
        assert_eq!(tag_counts[1].study_count, 0);

        let response = server
            .get(&format!("/api/v1/reviews/{}/studies/flags/count", review.id))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "Pending Review": 1, "Reviewed": 1 }));
    }

    #[tokio::test]
    async fn serializes_the_abstract_field() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .post(&format!("/api/v1/reviews/{}/studies", review.id))
            .json(&json!({ "title": "S1", "abstract": "We study things." }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["abstract"], "We study things.");
    }
}

mod authors {
    use super::*;

    #[tokio::test]
    async fn bulk_deletes_existing_ids_only() {
        let server = setup();
        let review = create_test_review(&server).await;
        let authors: Vec<Author> = server
            .post(&format!("/api/v1/reviews/{}/authors", review.id))
            .json(&json!([{ "name": "A. Smith" }, { "name": "B. Jones" }]))
            .await
            .json();

        let response = server
            .post(&format!("/api/v1/reviews/{}/authors/delete", review.id))
            .json(&json!({ "ids": [authors[0].id, authors[1].id, 999] }))
            .await;

        response.assert_status_ok();
        let result: DeleteAuthorsResult = response.json();
        assert_eq!(result.deleted, vec![authors[0].id, authors[1].id]);
    }

    #[tokio::test]
    async fn rejects_a_duplicate_name() {
        let server = setup();
        let review = create_test_review(&server).await;
        let path = format!("/api/v1/reviews/{}/authors", review.id);

        server
            .post(&path)
            .json(&json!({ "name": "A. Smith" }))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post(&path)
            .json(&json!({ "name": "A. Smith" }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}

mod transfer {
    use super::*;

    #[tokio::test]
    async fn imports_twice_without_duplicates() {
        let server = setup();
        let review = create_test_review(&server).await;
        let document = json!({
            "tag_tree": [{ "name": "ML", "children": [{ "name": "Supervised" }] }],
            "authors": [{ "name": "A. Smith" }],
            "studies": [{
                "title": "S1",
                "year": 2020,
                "tags": ["Supervised"],
                "authors": ["A. Smith"],
                "flags": ["Reviewed"]
            }]
        });
        let path = format!("/api/v1/reviews/{}/import", review.id);

        let first: ImportSummary = server.post(&path).json(&document).await.json();
        assert_eq!(first.tags_created, 2);
        assert_eq!(first.studies_created, 1);

        let response = server.post(&path).json(&document).await;
        response.assert_status_ok();
        let second: ImportSummary = response.json();
        assert_eq!(second.created(), 0);

        let exported: ReviewDocument = server
            .get(&format!("/api/v1/reviews/{}/export", review.id))
            .await
            .json();
        assert_eq!(exported.tag_tree.len(), 1);
        assert_eq!(exported.studies.len(), 1);
        assert_eq!(exported.studies[0].tags, vec!["Supervised".to_string()]);
    }

    #[tokio::test]
    async fn rejects_a_document_of_the_wrong_shape() {
        let server = setup();
        let review = create_test_review(&server).await;

        let response = server
            .post(&format!("/api/v1/reviews/{}/import", review.id))
            .json(&json!({ "tag_tree": "not a list" }))
            .await;

        response.assert_status_bad_request();
    }
}
