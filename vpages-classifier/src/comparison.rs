//! Membership interval comparison
//!
//! Compares one suggested membership against the existing position-held claims of the
//! suggested person. Candidates are the claims held by the person directly or through a
//! merged-then-deleted alias. A candidate covers the suggestion when it names the same term,
//! or names no term and its position interval overlaps the term window.

use crate::record_store::{ExistingClaimRecord, TermRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use vpages_common::dates::Interval;

/// Term the suggestion belongs to, with neighbouring boundaries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermWindow {
    pub id: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// End of previous term
    pub eopt: Option<NaiveDate>,
    /// Start of next term
    pub sont: Option<NaiveDate>,
}

impl From<&TermRecord> for TermWindow {
    fn from(record: &TermRecord) -> Self {
        Self {
            id: Some(record.term.clone()),
            start: record.start,
            end: record.end,
            eopt: record.previous_term_end,
            sont: record.next_term_start,
        }
    }
}

/// Membership implied by a statement, with items already resolved through redirects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuggestedMembership {
    pub person: Option<String>,
    pub term: TermWindow,
    pub party: Option<String>,
    /// `None` for executive positions, which carry no district
    pub district: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Outcome of comparing one field of a candidate claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMatch {
    Same,
    /// Claim lacks a value the suggestion has
    Missing,
    Different,
}

impl FieldMatch {
    fn of(existing: Option<&str>, wanted: Option<&str>) -> Self {
        match (existing, wanted) {
            (_, None) => FieldMatch::Same,
            (None, Some(_)) => FieldMatch::Missing,
            (Some(e), Some(w)) if e == w => FieldMatch::Same,
            (Some(_), Some(_)) => FieldMatch::Different,
        }
    }
}

/// A covering claim and how its qualifiers line up with the suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateComparison {
    pub claim_id: String,
    pub person: String,
    pub term: FieldMatch,
    pub party: FieldMatch,
    pub district: FieldMatch,
}

impl CandidateComparison {
    fn fields(&self) -> [FieldMatch; 3] {
        [self.term, self.party, self.district]
    }

    pub fn is_exact(&self) -> bool {
        self.fields().iter().all(|f| *f == FieldMatch::Same)
    }

    pub fn is_contradicting(&self) -> bool {
        self.fields().contains(&FieldMatch::Different)
    }

    /// Only gaps, no differing value: the claim can be completed in place
    pub fn is_partial(&self) -> bool {
        !self.is_exact() && !self.is_contradicting()
    }
}

/// Headline signal of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonSignal {
    /// No claim covers the term
    New,
    Matches,
    Partial,
    Contradicting,
    /// Covering claims on more than one person item
    Ambiguous,
}

/// Result of comparing a suggestion with existing claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipComparison {
    pub candidates: Vec<CandidateComparison>,
    pub started_before_term: bool,
    pub ambiguous: bool,
}

impl MembershipComparison {
    pub fn compare(existing: &[ExistingClaimRecord], suggested: &SuggestedMembership) -> Self {
        let term_window = Interval::new(suggested.term.start, suggested.term.end);

        let candidates: Vec<CandidateComparison> = match suggested.person.as_deref() {
            Some(person) => existing
                .iter()
                .filter(|claim| claim.held_by(person))
                .filter(|claim| covers(claim, suggested, &term_window))
                .map(|claim| CandidateComparison {
                    claim_id: claim.claim_id.clone(),
                    person: claim.person.clone(),
                    term: FieldMatch::of(claim.term.as_deref(), suggested.term.id.as_deref()),
                    party: FieldMatch::of(claim.group.as_deref(), suggested.party.as_deref()),
                    district: FieldMatch::of(
                        claim.district.as_deref(),
                        suggested.district.as_deref(),
                    ),
                })
                .collect(),
            None => Vec::new(),
        };

        let people: BTreeSet<&str> = candidates.iter().map(|c| c.person.as_str()).collect();

        Self {
            ambiguous: people.len() > 1,
            started_before_term: started_outside_term(suggested.start, &suggested.term),
            candidates,
        }
    }

    pub fn signal(&self) -> ComparisonSignal {
        if self.ambiguous {
            ComparisonSignal::Ambiguous
        } else if self.candidates.is_empty() {
            ComparisonSignal::New
        } else if self.candidates.iter().any(CandidateComparison::is_exact) {
            ComparisonSignal::Matches
        } else if self.candidates.iter().any(CandidateComparison::is_contradicting) {
            ComparisonSignal::Contradicting
        } else {
            ComparisonSignal::Partial
        }
    }

    pub fn is_new(&self) -> bool {
        self.signal() == ComparisonSignal::New
    }

    pub fn matches(&self) -> bool {
        self.signal() == ComparisonSignal::Matches
    }

    pub fn contradicting(&self) -> bool {
        self.signal() == ComparisonSignal::Contradicting
    }

    /// Existing claim a write should complete, if any
    ///
    /// The candidate's `person` is the item the claim lives on, which differs from the
    /// suggested person when the claim was found through a merged alias.
    pub fn target_claim(&self) -> Option<&CandidateComparison> {
        if self.ambiguous {
            return None;
        }
        self.candidates
            .iter()
            .find(|c| c.is_exact())
            .or_else(|| self.candidates.iter().find(|c| c.is_partial()))
    }
}

fn covers(
    claim: &ExistingClaimRecord,
    suggested: &SuggestedMembership,
    term_window: &Interval,
) -> bool {
    match (claim.term.as_deref(), suggested.term.id.as_deref()) {
        (Some(existing), Some(wanted)) => existing == wanted,
        (Some(_), None) => true,
        (None, _) => Interval::new(claim.position_start, claim.position_end).overlaps(term_window),
    }
}

/// Start date outside the window the term allows
fn started_outside_term(start: Option<NaiveDate>, term: &TermWindow) -> bool {
    let Some(start) = start else {
        return false;
    };
    term.start.is_some_and(|s| start < s)
        || term.sont.is_some_and(|s| start >= s)
        || term.eopt.is_some_and(|e| start <= e)
        || term.end.is_some_and(|e| start > e)
}
