//! In-memory knowledge base that enforces revision chaining

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use vpages_wikibase::claims::{Claim, ClaimMap, Reference, Snak};
use vpages_wikibase::{DataValue, KnowledgeBase, Revision, Result, WikibaseError};

pub const START_REVISION: u64 = 100;

/// One write as the fake received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub action: &'static str,
    pub claim: String,
    pub property: Option<String>,
    pub base: u64,
    pub returned: u64,
    pub reference_hash: Option<String>,
}

#[derive(Default)]
struct FakeState {
    claims: Vec<(String, Claim)>,
    revisions: HashMap<String, u64>,
    writes: Vec<WriteCall>,
    fail_create: bool,
    next_id: u32,
}

impl FakeState {
    fn revision(&self, entity: &str) -> u64 {
        self.revisions.get(entity).copied().unwrap_or(START_REVISION)
    }

    /// Enforce the base revision and advance
    fn advance(&mut self, entity: &str, base: &Revision) -> Result<u64> {
        let current = self.revision(entity);
        if base.id() != current {
            return Err(WikibaseError::Api {
                code: "editconflict".into(),
                info: format!("base {} is not latest {}", base.id(), current),
            });
        }
        self.revisions.insert(entity.to_string(), current + 1);
        Ok(current + 1)
    }

    fn claim_mut(&mut self, claim_id: &str) -> Result<(String, &mut Claim)> {
        self.claims
            .iter_mut()
            .find(|(_, c)| c.id == claim_id)
            .map(|(entity, c)| (entity.clone(), c))
            .ok_or_else(|| WikibaseError::Api {
                code: "invalid-guid".into(),
                info: claim_id.to_string(),
            })
    }
}

#[derive(Default)]
pub struct FakeKnowledgeBase {
    state: Mutex<FakeState>,
}

pub fn snak(property: &str, value: &DataValue) -> Snak {
    let mut snak: Snak = serde_json::from_value(value.to_snak(property)).unwrap();
    snak.datatype = Some(
        match value {
            DataValue::Item(_) => "wikibase-item",
            DataValue::Time(_) => "time",
            DataValue::String(_) => "url",
        }
        .to_string(),
    );
    snak
}

impl FakeKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing claim
    pub fn insert_claim(&self, entity: &str, claim: Claim) {
        self.state.lock().unwrap().claims.push((entity.to_string(), claim));
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    /// Bump an entity's revision as if someone else edited it
    pub fn external_edit(&self, entity: &str) {
        let mut state = self.state.lock().unwrap();
        let next = state.revision(entity) + 1;
        state.revisions.insert(entity.to_string(), next);
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn claim(&self, claim_id: &str) -> Option<Claim> {
        self.state
            .lock()
            .unwrap()
            .claims
            .iter()
            .find(|(_, c)| c.id == claim_id)
            .map(|(_, c)| c.clone())
    }

    pub fn revision(&self, entity: &str) -> u64 {
        self.state.lock().unwrap().revision(entity)
    }
}

#[async_trait]
impl KnowledgeBase for FakeKnowledgeBase {
    async fn get_claims(&self, entity: &str, claim_id: &str) -> Result<ClaimMap> {
        let state = self.state.lock().unwrap();
        let mut map = ClaimMap::new();
        for (e, claim) in &state.claims {
            if e == entity && claim.id == claim_id {
                map.entry(claim.mainsnak.property.clone())
                    .or_default()
                    .push(claim.clone());
            }
        }
        Ok(map)
    }

    async fn create_claim(
        &self,
        entity: &str,
        property: &str,
        value: &DataValue,
        base: Revision,
        _summary: &str,
    ) -> Result<(String, Revision)> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(WikibaseError::Api {
                code: "failed-save".into(),
                info: "The save has failed".into(),
            });
        }
        let returned = state.advance(entity, &base)?;
        state.next_id += 1;
        let claim_id = format!("{}$NEW-{}", entity, state.next_id);
        state.claims.push((
            entity.to_string(),
            Claim {
                id: claim_id.clone(),
                mainsnak: snak(property, value),
                qualifiers: HashMap::new(),
                references: Vec::new(),
            },
        ));
        state.writes.push(WriteCall {
            action: "wbcreateclaim",
            claim: claim_id.clone(),
            property: Some(property.to_string()),
            base: base.id(),
            returned,
            reference_hash: None,
        });
        Ok((claim_id, Revision::new(returned)))
    }

    async fn set_qualifier(
        &self,
        claim_id: &str,
        property: &str,
        value: &DataValue,
        base: Revision,
        _summary: &str,
    ) -> Result<Revision> {
        let mut state = self.state.lock().unwrap();
        let (entity, _) = state.claim_mut(claim_id)?;
        let returned = state.advance(&entity, &base)?;
        let (_, claim) = state.claim_mut(claim_id)?;
        claim
            .qualifiers
            .entry(property.to_string())
            .or_default()
            .push(snak(property, value));
        state.writes.push(WriteCall {
            action: "wbsetqualifier",
            claim: claim_id.to_string(),
            property: Some(property.to_string()),
            base: base.id(),
            returned,
            reference_hash: None,
        });
        Ok(Revision::new(returned))
    }

    async fn set_reference(
        &self,
        claim_id: &str,
        snaks: &Value,
        reference_hash: Option<&str>,
        base: Revision,
        _summary: &str,
    ) -> Result<Revision> {
        let mut state = self.state.lock().unwrap();
        let (entity, _) = state.claim_mut(claim_id)?;
        let returned = state.advance(&entity, &base)?;
        state.next_id += 1;
        let new_hash = format!("hash-{}", state.next_id);

        let mut parsed: HashMap<String, Vec<Snak>> =
            serde_json::from_value(snaks.clone()).map_err(|e| WikibaseError::Parse(e.to_string()))?;
        for list in parsed.values_mut() {
            for s in list.iter_mut() {
                if s.datavalue.as_ref().is_some_and(|d| d.kind == "string") {
                    s.datatype = Some("url".into());
                }
            }
        }
        let reference = Reference {
            hash: new_hash,
            snaks: parsed,
        };

        let (_, claim) = state.claim_mut(claim_id)?;
        match reference_hash.and_then(|h| claim.references.iter().position(|r| r.hash == h)) {
            Some(i) => claim.references[i] = reference,
            None => claim.references.push(reference),
        }
        state.writes.push(WriteCall {
            action: "wbsetreference",
            claim: claim_id.to_string(),
            property: None,
            base: base.id(),
            returned,
            reference_hash: reference_hash.map(str::to_string),
        });
        Ok(Revision::new(returned))
    }

    async fn latest_revision(&self, title: &str) -> Result<Revision> {
        Ok(Revision::new(self.state.lock().unwrap().revision(title)))
    }
}
