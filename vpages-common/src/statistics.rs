//! Verification statistics over exported suggestions
//!
//! A suggestions export is a JSON array of rows, each naming the position it suggests and how
//! volunteers judged it. Rows without a position are invalid and kept aside; the rest are counted
//! per position along with the verification pages that track that position.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use tracing::debug;

/// One exported suggestion row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_item: Option<String>,
    /// Remaining export columns, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Suggestion {
    fn position(&self) -> Option<&str> {
        self.position_item
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Suggestion counts for one position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PositionStatistics {
    pub position: String,
    pub correct: usize,
    pub incorrect: usize,
    /// Any status other than correct or incorrect, including none
    pub unchecked: usize,
    /// Titles of pages verifying this position
    pub pages: Vec<String>,
}

impl PositionStatistics {
    fn count(&mut self, suggestion: &Suggestion) {
        match suggestion.verification_status.as_deref() {
            Some("correct") => self.correct += 1,
            Some("incorrect") => self.incorrect += 1,
            _ => self.unchecked += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.correct + self.incorrect + self.unchecked
    }
}

/// Statistics for one country's export
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountryStatistics {
    /// Ordered by position item
    pub positions: Vec<PositionStatistics>,
    /// Rows with no position item
    pub invalid: Vec<Suggestion>,
}

impl CountryStatistics {
    /// Group suggestions by position
    ///
    /// `pages_by_position` maps a position item to the titles of pages tracking it.
    pub fn collect(
        suggestions: Vec<Suggestion>,
        pages_by_position: &BTreeMap<String, BTreeSet<String>>,
    ) -> Self {
        let mut positions: BTreeMap<String, PositionStatistics> = BTreeMap::new();
        let mut invalid = Vec::new();

        for suggestion in suggestions {
            let Some(position) = suggestion.position() else {
                invalid.push(suggestion);
                continue;
            };
            positions
                .entry(position.to_string())
                .or_insert_with(|| PositionStatistics {
                    position: position.to_string(),
                    pages: pages_by_position
                        .get(position)
                        .map(|titles| titles.iter().cloned().collect())
                        .unwrap_or_default(),
                    ..Default::default()
                })
                .count(&suggestion);
        }

        debug!(
            positions = positions.len(),
            invalid = invalid.len(),
            "Collected suggestion statistics"
        );
        Self {
            positions: positions.into_values().collect(),
            invalid,
        }
    }

    pub fn position(&self, item: &str) -> Option<&PositionStatistics> {
        self.positions.iter().find(|p| p.position == item)
    }
}

/// Parse a suggestions export
pub fn parse_export<R: Read>(reader: R) -> Result<Vec<Suggestion>> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"[
        {"id": 1, "verification_status": "correct", "position_item": "Q15964890"},
        {"id": 2, "verification_status": "correct", "position_item": "Q15964890"},
        {"id": 3, "verification_status": "incorrect", "position_item": "Q15964890"},
        {"id": 4, "verification_status": "invalid"}
    ]"#;

    fn pages() -> BTreeMap<String, BTreeSet<String>> {
        let mut pages = BTreeMap::new();
        pages.insert(
            "Q15964890".to_string(),
            BTreeSet::from(["User:Example/MPs".to_string()]),
        );
        pages
    }

    #[test]
    fn test_counts_per_position_and_invalid_rows() {
        let suggestions = parse_export(EXPORT.as_bytes()).unwrap();
        let stats = CountryStatistics::collect(suggestions, &pages());

        assert_eq!(stats.invalid.len(), 1);
        assert_eq!(stats.invalid[0].id, 4);
        assert_eq!(stats.invalid[0].verification_status.as_deref(), Some("invalid"));

        assert_eq!(stats.positions.len(), 1);
        let position = &stats.positions[0];
        assert_eq!(position.position, "Q15964890");
        assert_eq!(position.correct, 2);
        assert_eq!(position.incorrect, 1);
        assert_eq!(position.unchecked, 0);
        assert_eq!(position.pages, vec!["User:Example/MPs"]);
    }

    #[test]
    fn test_other_statuses_are_unchecked() {
        let suggestions = parse_export(
            r#"[
                {"id": 1, "position_item": "Q2"},
                {"id": 2, "verification_status": "unverifiable", "position_item": "Q2"},
                {"id": 3, "verification_status": "correct", "position_item": "Q1"},
                {"id": 4, "verification_status": "correct", "position_item": " "}
            ]"#
            .as_bytes(),
        )
        .unwrap();
        let stats = CountryStatistics::collect(suggestions, &BTreeMap::new());

        assert_eq!(
            stats.positions.iter().map(|p| p.position.as_str()).collect::<Vec<_>>(),
            vec!["Q1", "Q2"]
        );
        let untracked = stats.position("Q2").unwrap();
        assert_eq!(untracked.unchecked, 2);
        assert_eq!(untracked.total(), 2);
        assert!(untracked.pages.is_empty());
        assert_eq!(stats.invalid.len(), 1);
    }

    #[test]
    fn test_extra_columns_pass_through() {
        let suggestions =
            parse_export(r#"[{"id": 7, "person_name": "Jane Doe"}]"#.as_bytes()).unwrap();
        assert_eq!(suggestions[0].extra["person_name"], "Jane Doe");

        let row = serde_json::to_value(&suggestions[0]).unwrap();
        assert_eq!(row, serde_json::json!({"id": 7, "person_name": "Jane Doe"}));
    }

    #[test]
    fn test_malformed_export_rejected() {
        assert!(parse_export(r#"{"id": 1}"#.as_bytes()).is_err());
    }
}
