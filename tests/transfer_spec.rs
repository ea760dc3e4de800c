use speculate2::speculate;
use sysrev::db::Database;
use sysrev::models::*;
use sysrev::tree_render::render_templates;
use sysrev::Error;

fn create_test_review(db: &Database, name: &str) -> Review {
    db.create_review(CreateReviewInput {
        name: Some(name.to_string()),
        ..Default::default()
    })
    .expect("Failed to create review")
}

fn sample_document() -> ReviewDocument {
    ReviewDocument::from_json(
        r#"{
            "tag_tree": [
                {"name": "ML", "description": "Machine learning", "children": [
                    {"name": "Supervised", "children": [{"name": "SVM"}]},
                    {"name": "Unsupervised"}
                ]},
                {"name": "Stats"}
            ],
            "authors": [{"name": "A. Smith"}, {"name": "B. Jones"}],
            "studies": [
                {
                    "title": "S1",
                    "year": 2020,
                    "abstract": "First study",
                    "flags": ["Reviewed"],
                    "tags": ["SVM", "Stats"],
                    "authors": ["A. Smith"]
                },
                {
                    "title": "S2",
                    "tags": ["Unsupervised", "Nonexistent"],
                    "authors": ["Nobody"]
                }
            ]
        }"#,
    )
    .expect("Sample document should parse")
}

fn tag_count(db: &Database, review_id: i64) -> usize {
    db.list_tags(review_id).expect("Query failed").len()
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let review = create_test_review(&db, "Source");
    }

    describe "import_review" {
        it "creates every entity on first import" {
            let summary = db.import_review(review.id, &sample_document()).expect("Import failed");

            assert_eq!(summary.tags_created, 5);
            assert_eq!(summary.authors_created, 2);
            assert_eq!(summary.studies_created, 2);
            assert_eq!(tag_count(&db, review.id), 5);
        }

        it "is idempotent" {
            let document = sample_document();
            db.import_review(review.id, &document).expect("First import failed");
            let before = db.export_review(review.id).expect("Export failed");

            let summary = db.import_review(review.id, &document).expect("Second import failed");

            assert_eq!(summary.created(), 0);
            assert_eq!(summary.tags_reused, 5);
            assert_eq!(summary.studies_reused, 2);
            assert_eq!(db.export_review(review.id).expect("Export failed"), before);
        }

        it "drops unknown tag and author names" {
            db.import_review(review.id, &sample_document()).expect("Import failed");

            let studies = db.list_studies(review.id).expect("Query failed");
            let s2 = studies.iter().find(|s| s.title == "S2").expect("S2 missing");
            let unsupervised = db.list_tags(review.id).expect("Query failed")
                .into_iter()
                .find(|t| t.name == "Unsupervised")
                .expect("Unsupervised missing");

            assert_eq!(s2.tags, vec![unsupervised.id]);
            assert!(s2.authors.is_empty());
        }

        it "creates only the leaf added to an existing tree" {
            db.import_review(review.id, &sample_document()).expect("First import failed");
            let mut document = sample_document();
            document.tag_tree[0].children[0].children.push(TagTemplate {
                name: "Random Forest".to_string(),
                description: None,
                children: vec![],
            });

            let summary = db.import_review(review.id, &document).expect("Second import failed");

            assert_eq!(summary.tags_created, 1);
            assert_eq!(tag_count(&db, review.id), 6);
            let forest = db.get_tag_forest(review.id).expect("Query failed");
            let supervised = &forest[0].children[0];
            assert_eq!(supervised.tag.name, "Supervised");
            assert_eq!(supervised.children.len(), 2);
        }

        it "keeps same-named tags under different parents apart" {
            let document = ReviewDocument::from_json(
                r#"{"tag_tree": [
                    {"name": "ML", "children": [{"name": "Other"}]},
                    {"name": "Stats", "children": [{"name": "Other"}]}
                ]}"#,
            ).expect("Document should parse");

            let summary = db.import_review(review.id, &document).expect("Import failed");

            assert_eq!(summary.tags_created, 4);
            let forest = db.get_tag_forest(review.id).expect("Query failed");
            assert_eq!(forest[0].children[0].tag.name, "Other");
            assert_eq!(forest[1].children[0].tag.name, "Other");
        }

        it "re-import of own export keeps tag associations" {
            let document = ReviewDocument::from_json(
                r#"{"tag_tree": [
                    {"name": "ML", "children": [{"name": "Other"}]},
                    {"name": "Stats", "children": [{"name": "Other"}]}
                ]}"#,
            ).expect("Document should parse");
            db.import_review(review.id, &document).expect("Import failed");
            let forest = db.get_tag_forest(review.id).expect("Query failed");
            let stats_other = forest[1].children[0].tag.id;
            let study = db.create_study(review.id, CreateStudyInput {
                title: "S".to_string(),
                tags: vec![stats_other],
                ..Default::default()
            }).expect("Failed to create study");

            let exported = db.export_review(review.id).expect("Export failed");
            let summary = db.import_review(review.id, &exported).expect("Re-import failed");

            assert_eq!(summary.created(), 0);
            let study = db.get_study(review.id, study.id).expect("Query failed");
            assert_eq!(study.tags, vec![stats_other]);
        }

        it "resolves names a study does not hold to the lowest id" {
            let document = ReviewDocument::from_json(
                r#"{"tag_tree": [
                    {"name": "ML", "children": [{"name": "Other"}]},
                    {"name": "Stats", "children": [{"name": "Other"}]}
                ],
                "studies": [{"title": "S", "tags": ["Other"]}]}"#,
            ).expect("Document should parse");

            db.import_review(review.id, &document).expect("Import failed");

            let ml_other = db.get_tag_forest(review.id).expect("Query failed")[0].children[0].tag.id;
            let studies = db.list_studies(review.id).expect("Query failed");
            assert_eq!(studies[0].tags, vec![ml_other]);
        }

        it "does not overwrite fields of existing studies" {
            db.import_review(review.id, &sample_document()).expect("First import failed");
            let mut document = sample_document();
            document.studies[0].abstract_text = Some("Rewritten".to_string());
            document.studies[0].tags = vec!["Stats".to_string()];

            db.import_review(review.id, &document).expect("Second import failed");

            let studies = db.list_studies(review.id).expect("Query failed");
            let s1 = studies.iter().find(|s| s.title == "S1").expect("S1 missing");
            let stats = db.list_tags(review.id).expect("Query failed")
                .into_iter()
                .find(|t| t.name == "Stats")
                .expect("Stats missing");
            assert_eq!(s1.abstract_text, Some("First study".to_string()));
            assert_eq!(s1.tags, vec![stats.id]);
        }

        it "writes nothing when the document holds an invalid flag" {
            let mut document = sample_document();
            document.studies[1].flags = vec!["Bogus".to_string()];

            let result = db.import_review(review.id, &document);

            assert!(matches!(result, Err(Error::InvalidArgument(_))));
            assert_eq!(tag_count(&db, review.id), 0);
            assert!(db.list_authors(review.id).expect("Query failed").is_empty());
            assert!(db.list_studies(review.id).expect("Query failed").is_empty());
        }

        it "rejects a missing review" {
            let result = db.import_review(999, &sample_document());
            assert!(matches!(result, Err(Error::NotFound(_))));
        }
    }

    describe "export_review" {
        it "exports an empty review as empty lists" {
            let document = db.export_review(review.id).expect("Export failed");
            assert_eq!(document, ReviewDocument::default());
        }

        it "exports names instead of ids" {
            db.import_review(review.id, &sample_document()).expect("Import failed");

            let document = db.export_review(review.id).expect("Export failed");

            let s1 = document.studies.iter().find(|s| s.title == "S1").expect("S1 missing");
            assert_eq!(s1.authors, vec!["A. Smith".to_string()]);
            assert_eq!(s1.flags, vec!["Reviewed".to_string()]);
            assert_eq!(document.tag_tree[0].description, Some("Machine learning".to_string()));
        }

        it "round-trips into a fresh review" {
            db.import_review(review.id, &sample_document()).expect("Import failed");
            let exported = db.export_review(review.id).expect("Export failed");
            let copy = create_test_review(&db, "Copy");

            db.import_review(copy.id, &exported).expect("Import into copy failed");

            let copied = db.export_review(copy.id).expect("Export failed");
            assert_eq!(copied, exported);
            assert_eq!(
                render_templates(&copied.tag_tree),
                render_templates(&exported.tag_tree)
            );
        }
    }
}
