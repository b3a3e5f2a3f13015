//! Claim reconciliation pipeline
//!
//! `update_or_create_claim` runs one statement's write sequence:
//!
//! 1. ensure the claim exists (create it when there is no claim id)
//! 2. read the claim and plan qualifiers: missing ones are written, equal ones skipped,
//!    differing or malformed ones abort before any qualifier write
//! 3. write the planned qualifiers one at a time
//! 4. write the reference, replacing an existing one for the same URL
//!
//! Each write consumes the [`Revision`] returned by the previous one.

use crate::api::{KnowledgeBase, Revision};
use crate::claims::{Claim, Snak};
use crate::datavalue::DataValue;
use crate::error::{Result, WikibaseError};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use vpages_common::{Property, PropertyTable};

/// Everything needed to write one claim
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimData {
    /// Item the claim is on
    pub entity: String,
    /// Existing claim to update; `None` creates one
    pub claim_id: Option<String>,
    pub property: String,
    pub value: DataValue,
    pub qualifiers: BTreeMap<String, DataValue>,
    pub references: BTreeMap<String, DataValue>,
    pub summary: String,
}

/// Claim id and the entity revision after the last write
#[derive(Debug, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub claim_id: String,
    pub revision: Revision,
    pub qualifiers_written: usize,
    pub reference_written: bool,
}

/// One claim's result in a batch
///
/// Carries only the revision id; the [`Revision`] itself moves on to the entity's next write.
#[derive(Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    pub claim_id: String,
    pub revision_id: u64,
    pub qualifiers_written: usize,
    pub reference_written: bool,
}

/// Stage output: a claim that exists, and the revision to base the next write on
struct EnsuredClaim {
    claim_id: String,
    revision: Revision,
}

/// Reference write to perform
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePlan {
    pub snaks: Value,
    /// Hash of an existing reference for the same URL, replaced instead of duplicated
    pub replaces: Option<String>,
}

pub struct ClaimReconciler<'a, K: KnowledgeBase + ?Sized> {
    kb: &'a K,
    /// Reference URL property ids in preference order
    reference_properties: Vec<String>,
}

impl<'a, K: KnowledgeBase + ?Sized> ClaimReconciler<'a, K> {
    pub fn new(kb: &'a K, properties: &PropertyTable) -> Result<Self> {
        let reference_properties = [Property::WikimediaImportUrl, Property::ReferenceUrl]
            .into_iter()
            .map(|p| properties.property_id(p).map(str::to_string))
            .collect::<vpages_common::Result<Vec<_>>>()?;
        Ok(Self {
            kb,
            reference_properties,
        })
    }

    /// Create the claim if needed, then fill in qualifiers and the reference
    pub async fn update_or_create_claim(
        &self,
        base: Revision,
        data: &ClaimData,
    ) -> Result<ClaimOutcome> {
        let ensured = self.ensure_claim(base, data).await?;
        let claim = self.fetch_claim(data, &ensured.claim_id).await?;

        let new_qualifiers = plan_qualifiers(&claim, &data.qualifiers)?;
        let qualifiers_written = new_qualifiers.len();
        let ensured = self.write_qualifiers(ensured, new_qualifiers, &data.summary).await?;

        let reference = plan_reference(&claim, &data.references, &self.reference_properties)?;
        let reference_written = reference.is_some();
        let ensured = match reference {
            Some(plan) => self.write_reference(ensured, plan, &data.summary).await?,
            None => ensured,
        };

        info!(
            entity = %data.entity,
            claim = %ensured.claim_id,
            revision = %ensured.revision,
            qualifiers_written,
            reference_written,
            "Claim reconciled"
        );

        Ok(ClaimOutcome {
            claim_id: ensured.claim_id,
            revision: ensured.revision,
            qualifiers_written,
            reference_written,
        })
    }

    async fn ensure_claim(&self, base: Revision, data: &ClaimData) -> Result<EnsuredClaim> {
        if let Some(claim_id) = &data.claim_id {
            return Ok(EnsuredClaim {
                claim_id: claim_id.clone(),
                revision: base,
            });
        }

        debug!(entity = %data.entity, property = %data.property, "Creating a claim");
        let (claim_id, revision) = self
            .kb
            .create_claim(&data.entity, &data.property, &data.value, base, &data.summary)
            .await
            .map_err(|e| WikibaseError::ClaimCreationFailed {
                entity: data.entity.clone(),
                reason: e.to_string(),
            })?;
        Ok(EnsuredClaim { claim_id, revision })
    }

    async fn fetch_claim(&self, data: &ClaimData, claim_id: &str) -> Result<Claim> {
        let mut claims = self.kb.get_claims(&data.entity, claim_id).await?;
        claims
            .remove(&data.property)
            .and_then(|list| list.into_iter().find(|c| c.id == claim_id))
            .ok_or_else(|| WikibaseError::ClaimNotFound(claim_id.to_string()))
    }

    async fn write_qualifiers(
        &self,
        ensured: EnsuredClaim,
        qualifiers: Vec<(&String, &DataValue)>,
        summary: &str,
    ) -> Result<EnsuredClaim> {
        let EnsuredClaim {
            claim_id,
            mut revision,
        } = ensured;

        for (property, value) in qualifiers {
            debug!(claim = %claim_id, property = %property, base = %revision, "Setting qualifier");
            revision = self
                .kb
                .set_qualifier(&claim_id, property, value, revision, summary)
                .await?;
        }

        Ok(EnsuredClaim { claim_id, revision })
    }

    async fn write_reference(
        &self,
        ensured: EnsuredClaim,
        plan: ReferencePlan,
        summary: &str,
    ) -> Result<EnsuredClaim> {
        debug!(
            claim = %ensured.claim_id,
            replaces = ?plan.replaces,
            "Setting references"
        );
        let revision = self
            .kb
            .set_reference(
                &ensured.claim_id,
                &plan.snaks,
                plan.replaces.as_deref(),
                ensured.revision,
                summary,
            )
            .await?;
        Ok(EnsuredClaim {
            claim_id: ensured.claim_id,
            revision,
        })
    }

    /// Reconcile many claims: sequential per entity, concurrent across entities
    ///
    /// Each entity's chain starts from its latest revision. After a failed claim the chain
    /// continues from a freshly read revision. Results come back in input order.
    pub async fn update_many(&self, claims: &[ClaimData]) -> Vec<Result<BatchOutcome>> {
        let mut by_entity: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, data) in claims.iter().enumerate() {
            by_entity.entry(data.entity.as_str()).or_default().push(i);
        }

        let chains = by_entity.into_iter().map(|(entity, indexes)| async move {
            let mut results = Vec::with_capacity(indexes.len());
            let mut revision = None;
            for i in indexes {
                let base = match revision.take() {
                    Some(r) => r,
                    None => match self.kb.latest_revision(entity).await {
                        Ok(r) => r,
                        Err(e) => {
                            results.push((i, Err(e)));
                            continue;
                        }
                    },
                };
                match self.update_or_create_claim(base, &claims[i]).await {
                    Ok(ClaimOutcome {
                        claim_id,
                        revision: next,
                        qualifiers_written,
                        reference_written,
                    }) => {
                        results.push((
                            i,
                            Ok(BatchOutcome {
                                claim_id,
                                revision_id: next.id(),
                                qualifiers_written,
                                reference_written,
                            }),
                        ));
                        revision = Some(next);
                    }
                    Err(e) => {
                        warn!(entity = %entity, error = %e, "Claim update failed");
                        results.push((i, Err(e)));
                    }
                }
            }
            results
        });

        let mut indexed: Vec<(usize, Result<BatchOutcome>)> =
            join_all(chains).await.into_iter().flatten().collect();
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, r)| r).collect()
    }
}

/// Qualifiers that must be written, in property order
///
/// Fails without writing anything if any existing qualifier is malformed or differs.
pub fn plan_qualifiers<'w>(
    claim: &Claim,
    wanted: &'w BTreeMap<String, DataValue>,
) -> Result<Vec<(&'w String, &'w DataValue)>> {
    let mut new = Vec::new();
    for (property, value) in wanted {
        let existing = match claim.qualifiers.get(property) {
            None => {
                new.push((property, value));
                continue;
            }
            Some(list) if list.is_empty() => {
                new.push((property, value));
                continue;
            }
            Some(list) if list.len() > 1 => {
                return Err(WikibaseError::MultipleQualifiers {
                    claim: claim.id.clone(),
                    property: property.clone(),
                });
            }
            Some(list) => &list[0],
        };
        check_existing(claim, property, existing, value)?;
    }
    Ok(new)
}

fn check_existing(claim: &Claim, property: &str, existing: &Snak, wanted: &DataValue) -> Result<()> {
    if existing.snaktype != "value" {
        return Err(WikibaseError::UnexpectedSnakType {
            claim: claim.id.clone(),
            property: property.to_string(),
            snaktype: existing.snaktype.clone(),
        });
    }
    let datavalue = existing.datavalue.as_ref().ok_or_else(|| {
        WikibaseError::Parse(format!("{} qualifier on {} has no datavalue", property, claim.id))
    })?;
    if datavalue.kind != wanted.value_type() {
        return Err(WikibaseError::UnexpectedDatavalueType {
            claim: claim.id.clone(),
            property: property.to_string(),
            found: datavalue.kind.clone(),
            expected: wanted.value_type().to_string(),
        });
    }

    // Objects compare as sorted maps, so key order in the response does not matter
    let wanted_value = wanted.to_value();
    if datavalue.value != wanted_value {
        return Err(WikibaseError::QualifierConflict {
            claim: claim.id.clone(),
            property: property.to_string(),
            existing: datavalue.value.to_string(),
            wanted: wanted_value.to_string(),
        });
    }
    Ok(())
}

/// Reference write for the wanted snaks, or `None` when there is nothing to write
pub fn plan_reference(
    claim: &Claim,
    wanted: &BTreeMap<String, DataValue>,
    reference_properties: &[String],
) -> Result<Option<ReferencePlan>> {
    if wanted.is_empty() {
        return Ok(None);
    }

    let url_property = reference_properties
        .iter()
        .find(|p| wanted.contains_key(p.as_str()))
        .ok_or_else(|| WikibaseError::MissingReferenceProperty(wanted.keys().cloned().collect()))?;

    let replaces = wanted
        .get(url_property)
        .and_then(DataValue::as_str)
        .and_then(|url| {
            claim
                .references
                .iter()
                .find(|r| r.points_at(url_property, url))
        })
        .map(|r| r.hash.clone());

    let mut snaks = Map::new();
    for (property, value) in wanted {
        if value.as_str().is_some_and(str::is_empty) {
            continue;
        }
        snaks.insert(property.clone(), Value::Array(vec![value.to_snak(property)]));
    }

    Ok(Some(ReferencePlan {
        snaks: Value::Object(snaks),
        replaces,
    }))
}
