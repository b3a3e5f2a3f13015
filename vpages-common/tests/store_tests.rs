//! SQLite store tests against an in-memory database

use chrono::{Duration, TimeZone, Utc};
use vpages_common::db::{init_database, init_memory_database, SqliteStore};
use vpages_common::repository::PageRepository;
use vpages_common::statistics::{parse_export, CountryStatistics};
use vpages_common::{Page, Reconciliation, ResourceType, Statement, StatementType, Verification};

fn page() -> Page {
    Page {
        title: "User:Example/MPs".into(),
        position_held_item: "Q15964890".into(),
        parliamentary_term_item: Some("Q21157957".into()),
        reference_url: "https://example.com/mps".into(),
        csv_source_url: Some("https://example.com/mps.csv".into()),
        executive_position: false,
        country_item: Some("Q16".into()),
        new_item_description_en: Some("Canadian politician".into()),
        new_item_label_language: Some("en".into()),
    }
}

fn statement(id: &str, person: &str) -> Statement {
    let mut s = Statement::new(id, person);
    s.parliamentary_term_item = Some("Q21157957".into());
    s.position_start = Some("2015-12-03".into());
    s
}

async fn store_with_page() -> SqliteStore {
    let store = SqliteStore::new(init_memory_database().await.unwrap());
    store.save_page(&page()).await.unwrap();
    store
}

#[tokio::test]
async fn test_page_round_trip() {
    let store = store_with_page().await;
    let loaded = store.find_page("User:Example/MPs").await.unwrap();
    assert_eq!(loaded, page());
}

#[tokio::test]
async fn test_position_page_titles() {
    let store = store_with_page().await;
    let mut senators = page();
    senators.title = "User:Example/Senators".into();
    senators.position_held_item = "Q18524027".into();
    store.save_page(&senators).await.unwrap();
    let mut by_party = page();
    by_party.title = "User:Example/MPs by party".into();
    store.save_page(&by_party).await.unwrap();

    let titles = store.position_page_titles().await.unwrap();
    assert_eq!(titles.len(), 2);
    assert_eq!(
        titles["Q15964890"].iter().collect::<Vec<_>>(),
        vec!["User:Example/MPs", "User:Example/MPs by party"]
    );
    assert_eq!(
        titles["Q18524027"].iter().collect::<Vec<_>>(),
        vec!["User:Example/Senators"]
    );
}

#[tokio::test]
async fn test_export_statistics_name_tracking_pages() {
    let store = store_with_page().await;
    let export = r#"[
        {"id": 1, "verification_status": "correct", "position_item": "Q15964890"},
        {"id": 2, "verification_status": "correct", "position_item": "Q15964890"},
        {"id": 3, "verification_status": "incorrect", "position_item": "Q15964890"},
        {"id": 4, "verification_status": "invalid"}
    ]"#;

    let stats = CountryStatistics::collect(
        parse_export(export.as_bytes()).unwrap(),
        &store.position_page_titles().await.unwrap(),
    );

    assert_eq!(stats.invalid[0].id, 4);
    assert_eq!(stats.invalid[0].verification_status.as_deref(), Some("invalid"));
    let position = stats.position("Q15964890").unwrap();
    assert_eq!((position.correct, position.incorrect, position.unchecked), (2, 1, 0));
    assert_eq!(position.pages, vec![page().title]);
}

#[tokio::test]
async fn test_missing_page_is_not_found() {
    let store = store_with_page().await;
    let err = store.find_page("Nope").await.unwrap_err();
    assert!(matches!(err, vpages_common::Error::NotFound(_)));
}

#[tokio::test]
async fn test_position_rewrite() {
    let store = store_with_page().await;
    store
        .update_position_held_item("User:Example/MPs", "Q1")
        .await
        .unwrap();
    let loaded = store.find_page("User:Example/MPs").await.unwrap();
    assert_eq!(loaded.position_held_item, "Q1");

    assert!(store.update_position_held_item("Nope", "Q1").await.is_err());
}

#[tokio::test]
async fn test_statements_load_with_history_in_order() {
    let store = store_with_page().await;
    let mut first = statement("t1", "Jane Doe");
    first.force_type = Some(StatementType::Done);
    store.save_statement("User:Example/MPs", &first).await.unwrap();
    store
        .save_statement("User:Example/MPs", &statement("t2", "John Roe"))
        .await
        .unwrap();

    let base = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();
    store
        .record_verification(
            "t2",
            &Verification {
                user: "alice".into(),
                status: false,
                created_at: base,
            },
        )
        .await
        .unwrap();
    store
        .record_verification(
            "t2",
            &Verification {
                user: "bob".into(),
                status: true,
                created_at: base + Duration::minutes(5),
            },
        )
        .await
        .unwrap();

    let statements = store
        .statements_for_page("User:Example/MPs", &[])
        .await
        .unwrap();

    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].transaction_id, "t1");
    assert_eq!(statements[0].force_type, Some(StatementType::Done));
    assert_eq!(statements[1].verifications.len(), 2);
    assert!(statements[1].is_verified());
}

#[tokio::test]
async fn test_statements_filtered_by_transaction_id() {
    let store = store_with_page().await;
    store
        .save_statements(
            "User:Example/MPs",
            &[statement("t1", "Jane Doe"), statement("t2", "John Roe")],
        )
        .await
        .unwrap();

    let only = store
        .statements_for_page("User:Example/MPs", &["t2".to_string()])
        .await
        .unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].person_name, "John Roe");
}

#[tokio::test]
async fn test_reconciliation_links_item() {
    let store = store_with_page().await;
    store
        .save_statement("User:Example/MPs", &statement("t1", "Jane Doe"))
        .await
        .unwrap();
    store
        .record_reconciliation(
            "t1",
            &Reconciliation {
                resource_type: ResourceType::District,
                item: "Q3".into(),
                user: "alice".into(),
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let (page_title, loaded) = store.find_statement("t1").await.unwrap();
    assert_eq!(page_title, "User:Example/MPs");
    assert_eq!(loaded.electoral_district_item.as_deref(), Some("Q3"));
    assert!(loaded.latest_reconciliation(ResourceType::District).is_some());
}

#[tokio::test]
async fn test_mark_actioned() {
    let store = store_with_page().await;
    store
        .save_statement("User:Example/MPs", &statement("t1", "Jane Doe"))
        .await
        .unwrap();
    let at = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();

    store.mark_actioned("t1", "Q1$ABC", at).await.unwrap();

    let (_, loaded) = store.find_statement("t1").await.unwrap();
    assert_eq!(loaded.statement_uuid.as_deref(), Some("Q1$ABC"));
    assert_eq!(loaded.actioned_at, Some(at));
    assert!(store.mark_actioned("missing", "x", at).await.is_err());
}

#[tokio::test]
async fn test_file_database_created_and_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("vpages.db");

    let pool = init_database(&path).await.unwrap();
    assert!(path.exists());
    drop(pool);

    let reopened = SqliteStore::open(&path).await;
    assert!(reopened.is_ok());
}
