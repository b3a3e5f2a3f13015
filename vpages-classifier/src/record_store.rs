//! Read-only view of the remote knowledge base used during classification
//!
//! [`RecordStore`] is the seam between the classifier and the query service. The SPARQL
//! implementation lives in [`crate::sparql`]; tests substitute an in-memory store.

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// One existing "position held" claim on a person item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingClaimRecord {
    /// Claim identifier (`Q1$UUID`)
    pub claim_id: String,
    /// Item holding the claim
    pub person: String,
    pub position_start: Option<NaiveDate>,
    pub position_end: Option<NaiveDate>,
    pub term: Option<String>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub group: Option<String>,
    pub district: Option<String>,
    /// Items merged into `person` and since deleted, oldest first
    pub merged_then_deleted: Vec<String>,
}

impl ExistingClaimRecord {
    /// True when `item` is the claim's person or one of its merged aliases
    pub fn held_by(&self, item: &str) -> bool {
        self.person == item || self.merged_then_deleted.iter().any(|m| m == item)
    }
}

/// Resolution of an item identifier through redirects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    /// Identifier as stored locally
    pub requested: String,
    /// Identifier the knowledge base resolves it to today
    pub item: String,
}

impl ItemRecord {
    pub fn merged(&self) -> bool {
        self.requested != self.item
    }
}

/// Parliamentary term window with its neighbours' boundaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermRecord {
    pub term: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// End of the previous term (`eopt`)
    pub previous_term_end: Option<NaiveDate>,
    /// Start of the next term (`sont`)
    pub next_term_start: Option<NaiveDate>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All live claims of `position`, optionally narrowed to one person
    async fn position_held(
        &self,
        position: &str,
        person: Option<&str>,
    ) -> Result<Vec<ExistingClaimRecord>>;

    /// Redirect resolution keyed by requested identifier; unknown items are omitted
    async fn items(&self, items: &[String]) -> Result<HashMap<String, ItemRecord>>;

    /// Term window, `None` when the term item does not exist
    async fn term(&self, term: &str) -> Result<Option<TermRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_by_direct_and_alias() {
        let record = ExistingClaimRecord {
            claim_id: "Q1$A".into(),
            person: "Q1".into(),
            position_start: None,
            position_end: None,
            term: None,
            term_start: None,
            term_end: None,
            group: None,
            district: None,
            merged_then_deleted: vec!["Q7".into()],
        };
        assert!(record.held_by("Q1"));
        assert!(record.held_by("Q7"));
        assert!(!record.held_by("Q2"));
    }

    #[test]
    fn test_item_merged() {
        let same = ItemRecord {
            requested: "Q1".into(),
            item: "Q1".into(),
        };
        let moved = ItemRecord {
            requested: "Q1".into(),
            item: "Q9".into(),
        };
        assert!(!same.merged());
        assert!(moved.merged());
    }
}
