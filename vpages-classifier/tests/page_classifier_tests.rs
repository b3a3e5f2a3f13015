//! Page classification against in-memory repository and record store

mod common;

use common::*;
use vpages_classifier::{ClassifierError, PageClassifier};
use vpages_common::repository::{MemoryRepository, PageRepository};
use vpages_common::{ResourceType, Statement, StatementType};

fn reconcile(statement: &mut Statement, executive: bool) {
    statement.record_reconciliation(ResourceType::Person, "Q1", "alice", at(1));
    statement.record_reconciliation(ResourceType::Party, "Q101", "alice", at(2));
    if !executive {
        statement.record_reconciliation(ResourceType::District, "Q201", "alice", at(3));
    }
}

async fn classify_one(
    repository: &MemoryRepository,
    records: &MemoryRecordStore,
) -> StatementType {
    let classified = PageClassifier::new(repository, records)
        .classify(PAGE, &[])
        .await
        .unwrap();
    classified.statements[0].statement_type
}

#[tokio::test]
async fn test_lifecycle_verifiable_to_done() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    let mut s = statement("t1");
    repository.insert_page(page(), vec![s.clone()]);

    assert_eq!(classify_one(&repository, &records).await, StatementType::Verifiable);

    s.record_verification("alice", true, at(0));
    repository.put_statement(PAGE, s.clone());
    assert_eq!(classify_one(&repository, &records).await, StatementType::Reconcilable);

    reconcile(&mut s, false);
    repository.put_statement(PAGE, s.clone());
    assert_eq!(classify_one(&repository, &records).await, StatementType::Actionable);

    records.add_claim(claim("Q1$NEW", "Q1", "Q101", "Q201"));
    s.actioned_at = Some(at(10));
    repository.put_statement(PAGE, s);
    assert_eq!(classify_one(&repository, &records).await, StatementType::Done);
}

#[tokio::test]
async fn test_contradicting_party_is_manually_actionable() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    records.add_claim(claim("Q1$OLD", "Q1", "Q102", "Q201"));

    let mut s = statement("t1");
    s.record_verification("alice", true, at(0));
    reconcile(&mut s, false);
    repository.insert_page(page(), vec![s]);

    let classified = PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap();
    let decorated = &classified.statements[0];
    assert_eq!(decorated.statement_type, StatementType::ManuallyActionable);
    assert!(decorated.qualifiers_contradicting());
    assert_eq!(decorated.target_claim(), None);
}

#[tokio::test]
async fn test_start_before_term_needs_manual_review() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    let mut s = statement("t1");
    s.position_start = Some("2015-06-01".into());
    reconcile(&mut s, false);
    repository.insert_page(page(), vec![s]);

    assert_eq!(
        classify_one(&repository, &records).await,
        StatementType::ManuallyActionable
    );
}

#[tokio::test]
async fn test_unreconciled_contradiction_stays_in_verification() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    records.add_claim(claim("Q1$OLD", "Q1", "Q102", "Q201"));
    let mut s = statement("t1");
    s.record_verification("alice", false, at(0));
    repository.insert_page(page(), vec![s]);

    assert_eq!(classify_one(&repository, &records).await, StatementType::Unverifiable);
}

#[tokio::test]
async fn test_forced_type_and_removed() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    records.add_claim(claim("Q1$A", "Q1", "Q101", "Q201"));

    let mut forced = statement("t1");
    forced.force_type = Some(StatementType::ManuallyActionable);
    forced.removed_from_source = true;

    let mut removed = statement("t2");
    removed.person_item = Some("Q2".into());
    removed.removed_from_source = true;

    repository.insert_page(page(), vec![forced, removed]);

    let classified = PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap();
    assert_eq!(
        classified.find("t1").unwrap().statement_type,
        StatementType::ManuallyActionable
    );
    assert_eq!(
        classified.find("t2").unwrap().statement_type,
        StatementType::Removed
    );
}

#[tokio::test]
async fn test_actioned_claim_later_changed_is_reverted() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    records.add_claim(claim("Q1$A", "Q1", "Q102", "Q201"));
    let mut s = statement("t1");
    s.record_verification("alice", true, at(0));
    reconcile(&mut s, false);
    s.actioned_at = Some(at(10));
    repository.insert_page(page(), vec![s]);

    assert_eq!(classify_one(&repository, &records).await, StatementType::Reverted);
}

#[tokio::test]
async fn test_executive_position_needs_no_district() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    let mut executive = page();
    executive.executive_position = true;
    let mut s = statement("t1");
    s.electoral_district_item = None;
    reconcile(&mut s, true);
    repository.insert_page(executive, vec![s]);

    assert_eq!(classify_one(&repository, &records).await, StatementType::Actionable);

    records.add_claim(claim("Q1$A", "Q1", "Q101", "Q999"));
    assert_eq!(classify_one(&repository, &records).await, StatementType::Done);
}

#[tokio::test]
async fn test_merged_party_item_resolves_before_comparison() {
    let repository = MemoryRepository::new();
    let mut records = MemoryRecordStore::with_term();
    records.redirects.insert("Q101".into(), "Q105".into());
    records.add_claim(claim("Q1$A", "Q1", "Q105", "Q201"));
    repository.insert_page(page(), vec![statement("t1")]);

    assert_eq!(classify_one(&repository, &records).await, StatementType::Done);
}

#[tokio::test]
async fn test_merged_position_rewrites_page_once() {
    let repository = MemoryRepository::new();
    let mut records = MemoryRecordStore::with_term();
    let mut old_page = page();
    old_page.position_held_item = "Q999".into();
    records.redirects.insert("Q999".into(), POSITION.into());
    repository.insert_page(old_page, vec![statement("t1")]);

    let classified = PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap();

    assert_eq!(classified.page.position_held_item, POSITION);
    assert_eq!(repository.position_updates(), 1);
    let stored = repository.find_page(PAGE).await.unwrap();
    assert_eq!(stored.position_held_item, POSITION);

    PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap();
    assert_eq!(repository.position_updates(), 1);
}

#[tokio::test]
async fn test_person_merge_alias_ambiguity() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    records.add_claim(claim("Q1$A", "Q1", "Q101", "Q201"));
    let mut alias = claim("Q9$B", "Q9", "Q101", "Q201");
    alias.merged_then_deleted = vec!["Q1".into()];
    records.add_claim(alias);

    let mut s = statement("t1");
    reconcile(&mut s, false);
    repository.insert_page(page(), vec![s]);

    assert_eq!(
        classify_one(&repository, &records).await,
        StatementType::ManuallyActionable
    );
}

#[tokio::test]
async fn test_claim_on_merge_target_is_targeted_there() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    let mut alias = claim("Q9$B", "Q9", "Q101", "Q201");
    alias.district = None;
    alias.merged_then_deleted = vec!["Q1".into()];
    records.add_claim(alias);

    let mut s = statement("t1");
    s.record_verification("alice", true, at(0));
    reconcile(&mut s, false);
    repository.insert_page(page(), vec![s]);

    let classified = PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap();
    let decorated = &classified.statements[0];
    assert_eq!(decorated.statement_type, StatementType::Actionable);
    assert_eq!(decorated.statement.person_item.as_deref(), Some("Q1"));

    let target = decorated.target_claim().unwrap();
    assert_eq!(target.claim_id, "Q9$B");
    assert_eq!(target.person, "Q9");
}

#[tokio::test]
async fn test_missing_item_data_is_fatal() {
    let repository = MemoryRepository::new();
    let mut records = MemoryRecordStore::with_term();
    records.missing.push("Q201".into());
    repository.insert_page(page(), vec![statement("t1")]);

    let err = PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifierError::MissingItemData(ref id) if id == "Q201"));
}

#[tokio::test]
async fn test_unknown_term_is_fatal() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::default();
    repository.insert_page(page(), vec![statement("t1")]);

    let err = PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifierError::UnknownTerm(_)));
}

#[tokio::test]
async fn test_missing_page_is_repository_error() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();

    let err = PageClassifier::new(&repository, &records)
        .classify("Nope", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifierError::Repository(_)));
}

#[tokio::test]
async fn test_single_transaction_narrows_person_lookup() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    let mut other = statement("t2");
    other.person_item = Some("Q2".into());
    repository.insert_page(page(), vec![statement("t1"), other]);

    let classifier = PageClassifier::new(&repository, &records);
    let one = classifier.classify(PAGE, &["t2".to_string()]).await.unwrap();
    assert_eq!(one.statements.len(), 1);

    classifier
        .classify(PAGE, &["t1".to_string(), "t2".to_string()])
        .await
        .unwrap();

    let filters = records.person_filters.lock().unwrap().clone();
    assert_eq!(filters, vec![Some("Q2".to_string()), None]);
}

#[tokio::test]
async fn test_grouping() {
    let repository = MemoryRepository::new();
    let records = MemoryRecordStore::with_term();
    let mut yes = statement("t2");
    yes.person_item = Some("Q2".into());
    yes.record_verification("alice", true, at(0));
    repository.insert_page(page(), vec![statement("t1"), yes]);

    let classified = PageClassifier::new(&repository, &records)
        .classify(PAGE, &[])
        .await
        .unwrap();

    assert_eq!(classified.group(StatementType::Verifiable).len(), 1);
    assert_eq!(classified.group(StatementType::Reconcilable).len(), 1);
    assert!(classified.group(StatementType::Done).is_empty());

    let grouped = classified.grouped();
    assert_eq!(grouped.len(), 2);
    assert!(!grouped.contains_key(&StatementType::Done));
}
