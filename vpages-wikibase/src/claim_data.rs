//! Builds [`ClaimData`] for a statement on a page

use crate::datavalue::DataValue;
use crate::error::{Result, WikibaseError};
use crate::reconcile::ClaimData;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use vpages_common::dates::parse_optional_date;
use vpages_common::{Page, Property, PropertyTable, Statement};

/// Edit summary naming the page the edit came from
pub fn summary(page_title: &str) -> String {
    format!("Edited with Verification Pages ({})", page_title)
}

/// Reference URL property for a source URL: Wikipedia pages are imports
pub fn reference_property_for(url: &str) -> Property {
    let is_wikipedia = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.ends_with(".wikipedia.org")))
        .unwrap_or(false);
    if is_wikipedia {
        Property::WikimediaImportUrl
    } else {
        Property::ReferenceUrl
    }
}

/// A claim already on the knowledge base that a write should complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingClaim {
    /// Item the claim lives on; a merge target when found through an alias
    pub entity: String,
    pub claim_id: String,
}

impl ExistingClaim {
    pub fn new(entity: impl Into<String>, claim_id: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            claim_id: claim_id.into(),
        }
    }
}

/// Position-held claim for a reconciled statement
///
/// Writes go to `existing`'s entity when given, otherwise to the statement's person.
/// `retrieved` dates the reference.
pub fn claim_data_for(
    statement: &Statement,
    page: &Page,
    properties: &PropertyTable,
    existing: Option<ExistingClaim>,
    retrieved: NaiveDate,
) -> Result<ClaimData> {
    let (entity, claim_id) = match existing {
        Some(existing) => (existing.entity, Some(existing.claim_id)),
        None => {
            let person = statement.person_item.clone().ok_or_else(|| {
                WikibaseError::Config(format!(
                    "Statement {} has no person item",
                    statement.transaction_id
                ))
            })?;
            (person, statement.statement_uuid.clone())
        }
    };

    let mut qualifiers = BTreeMap::new();
    let term = page
        .parliamentary_term_item
        .as_deref()
        .or(statement.parliamentary_term_item.as_deref());
    if let Some(term) = term {
        qualifiers.insert(
            properties.property_id(Property::ParliamentaryTerm)?.to_string(),
            DataValue::item(term)?,
        );
    }
    if let Some(group) = statement.parliamentary_group_item.as_deref() {
        qualifiers.insert(
            properties.property_id(Property::ParliamentaryGroup)?.to_string(),
            DataValue::item(group)?,
        );
    }
    if !page.executive_position {
        if let Some(district) = statement.electoral_district_item.as_deref() {
            qualifiers.insert(
                properties.property_id(Property::ElectoralDistrict)?.to_string(),
                DataValue::item(district)?,
            );
        }
    }
    if let Some(start) = parse_optional_date(statement.position_start.as_deref()) {
        qualifiers.insert(
            properties.property_id(Property::StartTime)?.to_string(),
            DataValue::Time(start),
        );
    }
    if let Some(end) = parse_optional_date(statement.position_end.as_deref()) {
        qualifiers.insert(
            properties.property_id(Property::EndTime)?.to_string(),
            DataValue::Time(end),
        );
    }

    let mut references = BTreeMap::new();
    if !page.reference_url.trim().is_empty() {
        let url_property = reference_property_for(&page.reference_url);
        references.insert(
            properties.property_id(url_property)?.to_string(),
            DataValue::String(page.reference_url.clone()),
        );
        references.insert(
            properties.property_id(Property::ReferenceRetrieved)?.to_string(),
            DataValue::Time(retrieved),
        );
    }

    Ok(ClaimData {
        entity,
        claim_id,
        property: properties.property_id(Property::PositionHeld)?.to_string(),
        value: DataValue::item(&page.position_held_item)?,
        qualifiers,
        references,
        summary: summary(&page.title),
    })
}
