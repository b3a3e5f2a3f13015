//! Statement classification rule table
//!
//! Each statement is reduced to a [`Facts`] value, then [`RULES`] is evaluated in order and the
//! first rule that fires decides the [`StatementType`].

use crate::comparison::{CandidateComparison, ComparisonSignal, MembershipComparison};
use serde::Serialize;
use vpages_common::{Statement, StatementType};

/// Everything the rules look at, computed once per statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Facts {
    pub forced_type: Option<StatementType>,
    pub removed: bool,
    pub matches: bool,
    pub actioned: bool,
    pub reconciled: bool,
    /// Started outside the term, contradicting qualifiers, or ambiguous person
    pub needs_review: bool,
    /// Latest verification status
    pub verified: Option<bool>,
}

impl Facts {
    pub fn gather(
        statement: &Statement,
        comparison: &MembershipComparison,
        executive_position: bool,
    ) -> Self {
        let signal = comparison.signal();
        Self {
            forced_type: statement.force_type,
            removed: statement.removed_from_source,
            matches: signal == ComparisonSignal::Matches,
            actioned: statement.actioned_at.is_some(),
            reconciled: statement.is_reconciled(executive_position),
            needs_review: comparison.started_before_term
                || matches!(
                    signal,
                    ComparisonSignal::Contradicting | ComparisonSignal::Ambiguous
                ),
            verified: statement.latest_verification().map(|v| v.status),
        }
    }
}

/// Named rule; returns the type when it fires
pub struct Rule {
    pub name: &'static str,
    pub fire: fn(&Facts) -> Option<StatementType>,
}

pub const RULES: [Rule; 9] = [
    Rule {
        name: "forced",
        fire: |f| f.forced_type,
    },
    Rule {
        name: "removed",
        fire: |f| f.removed.then_some(StatementType::Removed),
    },
    Rule {
        name: "done",
        fire: |f| f.matches.then_some(StatementType::Done),
    },
    Rule {
        name: "reverted",
        fire: |f| f.actioned.then_some(StatementType::Reverted),
    },
    Rule {
        name: "manually_actionable",
        fire: |f| (f.reconciled && f.needs_review).then_some(StatementType::ManuallyActionable),
    },
    Rule {
        name: "actionable",
        fire: |f| f.reconciled.then_some(StatementType::Actionable),
    },
    Rule {
        name: "reconcilable",
        fire: |f| (f.verified == Some(true)).then_some(StatementType::Reconcilable),
    },
    Rule {
        name: "unverifiable",
        fire: |f| (f.verified == Some(false)).then_some(StatementType::Unverifiable),
    },
    Rule {
        name: "verifiable",
        fire: |_| Some(StatementType::Verifiable),
    },
];

/// First firing rule's type
pub fn classify(facts: &Facts) -> StatementType {
    RULES
        .iter()
        .find_map(|rule| (rule.fire)(facts))
        .unwrap_or(StatementType::Verifiable)
}

/// Name of the rule that decided, for logging
pub fn deciding_rule(facts: &Facts) -> &'static str {
    RULES
        .iter()
        .find(|rule| (rule.fire)(facts).is_some())
        .map(|rule| rule.name)
        .unwrap_or("verifiable")
}

/// A statement with its type and the comparison that produced it
#[derive(Debug, Clone, Serialize)]
pub struct DecoratedStatement {
    #[serde(flatten)]
    pub statement: Statement,
    #[serde(rename = "type")]
    pub statement_type: StatementType,
    pub comparison: MembershipComparison,
}

impl DecoratedStatement {
    pub fn new(
        statement: Statement,
        comparison: MembershipComparison,
        executive_position: bool,
    ) -> Self {
        let facts = Facts::gather(&statement, &comparison, executive_position);
        let statement_type = classify(&facts);
        tracing::debug!(
            transaction_id = %statement.transaction_id,
            statement_type = %statement_type,
            rule = deciding_rule(&facts),
            "Classified statement"
        );
        Self {
            statement,
            statement_type,
            comparison,
        }
    }

    pub fn started_before_term(&self) -> bool {
        self.comparison.started_before_term
    }

    pub fn qualifiers_contradicting(&self) -> bool {
        self.comparison.contradicting()
    }

    pub fn target_claim(&self) -> Option<&CandidateComparison> {
        self.comparison.target_claim()
    }
}
