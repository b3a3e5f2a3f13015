//! Statement, page and history records
//!
//! A [`Statement`] is one (person, position, term) row from the source CSV together with the
//! append-only verification and reconciliation history volunteers have recorded against it.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Workflow state of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    Verifiable,
    Unverifiable,
    Reconcilable,
    Actionable,
    ManuallyActionable,
    Done,
    Reverted,
    Removed,
}

impl StatementType {
    pub const ALL: [StatementType; 8] = [
        StatementType::Verifiable,
        StatementType::Unverifiable,
        StatementType::Reconcilable,
        StatementType::Actionable,
        StatementType::ManuallyActionable,
        StatementType::Done,
        StatementType::Reverted,
        StatementType::Removed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatementType::Verifiable => "verifiable",
            StatementType::Unverifiable => "unverifiable",
            StatementType::Reconcilable => "reconcilable",
            StatementType::Actionable => "actionable",
            StatementType::ManuallyActionable => "manually_actionable",
            StatementType::Done => "done",
            StatementType::Reverted => "reverted",
            StatementType::Removed => "removed",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StatementType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown statement type: {}", s)))
    }
}

/// Linkable statement field that can be reconciled to a remote item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Person,
    Party,
    District,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Person => "person",
            ResourceType::Party => "party",
            ResourceType::District => "district",
        }
    }

    /// Fields that must be reconciled before a statement can be written
    pub fn required(executive_position: bool) -> &'static [ResourceType] {
        if executive_position {
            &[ResourceType::Person, ResourceType::Party]
        } else {
            &[ResourceType::Person, ResourceType::Party, ResourceType::District]
        }
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "person" => Ok(ResourceType::Person),
            "party" => Ok(ResourceType::Party),
            "district" => Ok(ResourceType::District),
            other => Err(Error::InvalidInput(format!("Unknown resource type: {}", other))),
        }
    }
}

/// A volunteer's yes/no judgment on a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub user: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
}

/// A volunteer's mapping from a statement field to a remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub resource_type: ResourceType,
    pub item: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

/// One (person, position, term) row pending verification and write-back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub transaction_id: String,
    pub person_name: String,
    #[serde(default)]
    pub person_item: Option<String>,
    #[serde(default)]
    pub parliamentary_group_name: Option<String>,
    #[serde(default)]
    pub parliamentary_group_item: Option<String>,
    #[serde(default)]
    pub electoral_district_name: Option<String>,
    #[serde(default)]
    pub electoral_district_item: Option<String>,
    #[serde(default)]
    pub parliamentary_term_item: Option<String>,
    #[serde(default)]
    pub position_start: Option<String>,
    #[serde(default)]
    pub position_end: Option<String>,
    /// Remote claim identifier, known once the claim exists
    #[serde(default)]
    pub statement_uuid: Option<String>,
    /// Manual override of the computed workflow state
    #[serde(default)]
    pub force_type: Option<StatementType>,
    #[serde(default)]
    pub removed_from_source: bool,
    /// Set when the claim was last written to the knowledge base
    #[serde(default)]
    pub actioned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verifications: Vec<Verification>,
    #[serde(default)]
    pub reconciliations: Vec<Reconciliation>,
}

impl Statement {
    pub fn new(transaction_id: impl Into<String>, person_name: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            person_name: person_name.into(),
            person_item: None,
            parliamentary_group_name: None,
            parliamentary_group_item: None,
            electoral_district_name: None,
            electoral_district_item: None,
            parliamentary_term_item: None,
            position_start: None,
            position_end: None,
            statement_uuid: None,
            force_type: None,
            removed_from_source: false,
            actioned_at: None,
            verifications: Vec::new(),
            reconciliations: Vec::new(),
        }
    }

    /// Most recent verification; ties go to the one recorded last
    pub fn latest_verification(&self) -> Option<&Verification> {
        self.verifications.iter().max_by_key(|v| v.created_at)
    }

    pub fn is_verified(&self) -> bool {
        self.latest_verification().is_some_and(|v| v.status)
    }

    pub fn is_unverifiable(&self) -> bool {
        self.latest_verification().is_some_and(|v| !v.status)
    }

    pub fn latest_reconciliation(&self, resource_type: ResourceType) -> Option<&Reconciliation> {
        self.reconciliations
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .max_by_key(|r| r.created_at)
    }

    /// Every field required for the position type has at least one reconciliation
    pub fn is_reconciled(&self, executive_position: bool) -> bool {
        ResourceType::required(executive_position)
            .iter()
            .all(|rt| self.latest_reconciliation(*rt).is_some())
    }

    /// Item currently linked to a field
    pub fn item(&self, resource_type: ResourceType) -> Option<&str> {
        match resource_type {
            ResourceType::Person => self.person_item.as_deref(),
            ResourceType::Party => self.parliamentary_group_item.as_deref(),
            ResourceType::District => self.electoral_district_item.as_deref(),
        }
    }

    fn item_mut(&mut self, resource_type: ResourceType) -> &mut Option<String> {
        match resource_type {
            ResourceType::Person => &mut self.person_item,
            ResourceType::Party => &mut self.parliamentary_group_item,
            ResourceType::District => &mut self.electoral_district_item,
        }
    }

    /// Append a verification
    pub fn record_verification(&mut self, user: impl Into<String>, status: bool, at: DateTime<Utc>) {
        self.verifications.push(Verification {
            user: user.into(),
            status,
            created_at: at,
        });
    }

    /// Append a reconciliation and link the field to its item
    pub fn record_reconciliation(
        &mut self,
        resource_type: ResourceType,
        item: impl Into<String>,
        user: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        let item = item.into();
        *self.item_mut(resource_type) = Some(item.clone());
        self.reconciliations.push(Reconciliation {
            resource_type,
            item,
            user: user.into(),
            created_at: at,
        });
    }
}

/// A verification page: one position and term, fed by one CSV source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub position_held_item: String,
    #[serde(default)]
    pub parliamentary_term_item: Option<String>,
    pub reference_url: String,
    #[serde(default)]
    pub csv_source_url: Option<String>,
    #[serde(default)]
    pub executive_position: bool,
    #[serde(default)]
    pub country_item: Option<String>,
    #[serde(default)]
    pub new_item_description_en: Option<String>,
    #[serde(default)]
    pub new_item_label_language: Option<String>,
}

/// Reject statement sets holding two live rows for the same person in the same term
pub fn check_unique_memberships<'a>(statements: impl IntoIterator<Item = &'a Statement>) -> Result<()> {
    let mut seen = HashSet::new();
    for statement in statements {
        if statement.removed_from_source {
            continue;
        }
        let (Some(term), Some(person)) = (
            statement.parliamentary_term_item.as_deref(),
            statement.person_item.as_deref(),
        ) else {
            continue;
        };
        if !seen.insert((term, person)) {
            return Err(Error::InvalidInput(format!(
                "Duplicate statement for {} in term {} ({})",
                person, term, statement.transaction_id
            )));
        }
    }
    Ok(())
}
