//! Shared fixtures for classifier integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use vpages_classifier::error::Result;
use vpages_classifier::{ExistingClaimRecord, ItemRecord, RecordStore, TermRecord};
use vpages_common::{Page, Statement};

pub const PAGE: &str = "User:Example/Canadian MPs";
pub const POSITION: &str = "Q15964890";
pub const TERM: &str = "Q21157957";

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// Record store with fixed contents
#[derive(Default)]
pub struct MemoryRecordStore {
    pub claims: Mutex<Vec<ExistingClaimRecord>>,
    pub redirects: HashMap<String, String>,
    pub missing: Vec<String>,
    pub terms: HashMap<String, TermRecord>,
    /// Person filter passed to each position_held call
    pub person_filters: Mutex<Vec<Option<String>>>,
}

impl MemoryRecordStore {
    pub fn with_term() -> Self {
        let mut store = Self::default();
        store.terms.insert(
            TERM.to_string(),
            TermRecord {
                term: TERM.to_string(),
                start: Some(d(2015, 12, 3)),
                end: None,
                previous_term_end: Some(d(2015, 8, 2)),
                next_term_start: None,
            },
        );
        store
    }

    pub fn add_claim(&self, claim: ExistingClaimRecord) {
        self.claims.lock().unwrap().push(claim);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn position_held(
        &self,
        position: &str,
        person: Option<&str>,
    ) -> Result<Vec<ExistingClaimRecord>> {
        assert_eq!(position, POSITION);
        self.person_filters
            .lock()
            .unwrap()
            .push(person.map(str::to_string));
        Ok(self
            .claims
            .lock()
            .unwrap()
            .iter()
            .filter(|c| person.map_or(true, |p| c.held_by(p)))
            .cloned()
            .collect())
    }

    async fn items(&self, items: &[String]) -> Result<HashMap<String, ItemRecord>> {
        Ok(items
            .iter()
            .filter(|i| !self.missing.contains(i))
            .map(|i| {
                let resolved = self.redirects.get(i).cloned().unwrap_or_else(|| i.clone());
                (
                    i.clone(),
                    ItemRecord {
                        requested: i.clone(),
                        item: resolved,
                    },
                )
            })
            .collect())
    }

    async fn term(&self, term: &str) -> Result<Option<TermRecord>> {
        Ok(self.terms.get(term).cloned())
    }
}

pub fn page() -> Page {
    Page {
        title: PAGE.into(),
        position_held_item: POSITION.into(),
        parliamentary_term_item: Some(TERM.into()),
        reference_url: "https://www.ourcommons.ca/members/en".into(),
        csv_source_url: None,
        executive_position: false,
        country_item: Some("Q16".into()),
        new_item_description_en: Some("Canadian politician".into()),
        new_item_label_language: Some("en".into()),
    }
}

/// Statement for person Q1 in party P1, district D1
pub fn statement(transaction_id: &str) -> Statement {
    let mut s = Statement::new(transaction_id, "Jane Doe");
    s.person_item = Some("Q1".into());
    s.parliamentary_group_name = Some("Liberal".into());
    s.parliamentary_group_item = Some("Q101".into());
    s.electoral_district_name = Some("Ottawa Centre".into());
    s.electoral_district_item = Some("Q201".into());
    s.parliamentary_term_item = Some(TERM.into());
    s.position_start = Some("2015-12-03".into());
    s
}

pub fn claim(claim_id: &str, person: &str, group: &str, district: &str) -> ExistingClaimRecord {
    ExistingClaimRecord {
        claim_id: claim_id.into(),
        person: person.into(),
        position_start: Some(d(2015, 12, 3)),
        position_end: None,
        term: Some(TERM.into()),
        term_start: Some(d(2015, 12, 3)),
        term_end: None,
        group: Some(group.into()),
        district: Some(district.into()),
        merged_then_deleted: Vec::new(),
    }
}
