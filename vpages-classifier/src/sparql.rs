//! Wikidata Query Service client
//!
//! Implements [`RecordStore`] with three SELECT queries: live position-held claims,
//! redirect resolution for items, and term windows.
//!
//! Binding values decode the same way for every query:
//! - item URIs become their trailing identifier (`http://www.wikidata.org/entity/Q1` → `Q1`)
//! - `xsd:dateTime` literals keep only the date part
//! - unbound variables are `None`

use crate::error::{ClassifierError, Result};
use crate::record_store::{ExistingClaimRecord, ItemRecord, RecordStore, TermRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use vpages_common::config::TomlConfig;
use vpages_common::dates::parse_date;
use vpages_common::{Property, PropertyTable};

const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// Term boundary properties only exist on the query service's own wiki
const INCEPTION: &str = "P571";
const DISSOLVED: &str = "P576";
const FOLLOWS: &str = "P155";
const FOLLOWED_BY: &str = "P156";

/// One term of a SPARQL JSON result binding
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
}

/// One solution row
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SparqlBinding(pub HashMap<String, SparqlTerm>);

impl SparqlBinding {
    /// Decoded value of a variable
    pub fn value(&self, var: &str) -> Option<String> {
        let term = self.0.get(var)?;
        if term.kind == "uri" {
            return term.value.rsplit('/').next().map(str::to_string);
        }
        match term.datatype.as_deref() {
            Some(XSD_DATETIME) => term.value.split('T').next().map(str::to_string),
            _ => Some(term.value.clone()),
        }
    }

    pub fn item(&self, var: &str) -> Option<String> {
        self.value(var).filter(|v| !v.is_empty())
    }

    pub fn date(&self, var: &str) -> Option<NaiveDate> {
        self.value(var).as_deref().and_then(parse_date)
    }

    /// Claim id from a statement node URI (`.../statement/Q1-ABC` → `Q1$ABC`)
    pub fn claim_id(&self, var: &str) -> Option<String> {
        self.value(var).map(|v| v.replacen('-', "$", 1))
    }

    /// Space-separated URI list produced by GROUP_CONCAT
    pub fn item_list(&self, var: &str) -> Vec<String> {
        self.value(var)
            .map(|v| {
                v.split_whitespace()
                    .filter_map(|uri| uri.rsplit('/').next())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<SparqlBinding>,
}

/// Query service backed record store
pub struct SparqlRecordStore {
    http_client: reqwest::Client,
    endpoint: String,
    properties: PropertyTable,
}

impl SparqlRecordStore {
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
        properties: PropertyTable,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            properties,
        })
    }

    pub fn from_config(config: &TomlConfig) -> Result<Self> {
        let properties = config
            .property_table()
            .map_err(|e| ClassifierError::Config(e.to_string()))?;
        Self::new(
            config.sparql_url.clone(),
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
            properties,
        )
    }

    /// Run a SELECT query and return its bindings
    pub async fn select(&self, query: &str) -> Result<Vec<SparqlBinding>> {
        tracing::debug!(endpoint = %self.endpoint, "Running SPARQL query");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Accept", "application/sparql-results+json")
            .form(&[("query", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Query {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SparqlResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        tracing::debug!(rows = parsed.results.bindings.len(), "SPARQL query complete");
        Ok(parsed.results.bindings)
    }

    fn pid(&self, property: Property) -> Result<&str> {
        self.properties
            .property_id(property)
            .map_err(|e| ClassifierError::Config(e.to_string()))
    }

    fn position_held_query(&self, position: &str, person: Option<&str>) -> Result<String> {
        let position_held = self.pid(Property::PositionHeld)?;
        let start_time = self.pid(Property::StartTime)?;
        let end_time = self.pid(Property::EndTime)?;
        let term = self.pid(Property::ParliamentaryTerm)?;
        let group = self.pid(Property::ParliamentaryGroup)?;
        let district = self.pid(Property::ElectoralDistrict)?;

        let person_filter = match person {
            Some(p) => format!("VALUES ?item {{ {} }}", entity_ref(p)?),
            None => String::new(),
        };

        Ok(format!(
            r#"SELECT ?statement ?item ?start ?end ?term ?term_start ?term_end ?group ?district
       (GROUP_CONCAT(DISTINCT ?merged; separator=" ") AS ?merged_then_deleted)
WHERE {{
  {person_filter}
  ?item p:{position_held} ?statement .
  ?statement ps:{position_held} {position} .
  FILTER NOT EXISTS {{ ?statement wikibase:rank wikibase:DeprecatedRank }}
  OPTIONAL {{ ?statement pq:{start_time} ?start }}
  OPTIONAL {{ ?statement pq:{end_time} ?end }}
  OPTIONAL {{
    ?statement pq:{term} ?term .
    OPTIONAL {{ ?term wdt:{INCEPTION}|wdt:{start_time} ?term_start }}
    OPTIONAL {{ ?term wdt:{DISSOLVED}|wdt:{end_time} ?term_end }}
  }}
  OPTIONAL {{ ?statement pq:{group} ?group }}
  OPTIONAL {{ ?statement pq:{district} ?district }}
  OPTIONAL {{ ?merged owl:sameAs ?item }}
}}
GROUP BY ?statement ?item ?start ?end ?term ?term_start ?term_end ?group ?district
ORDER BY ?item ?start"#,
            position = entity_ref(position)?,
        ))
    }

    fn items_query(items: &[String]) -> Result<String> {
        let values = items
            .iter()
            .map(|i| entity_ref(i))
            .collect::<Result<Vec<_>>>()?
            .join(" ");

        Ok(format!(
            r#"SELECT ?requested ?item
WHERE {{
  VALUES ?requested {{ {values} }}
  OPTIONAL {{ ?requested owl:sameAs ?redirect }}
  BIND(COALESCE(?redirect, ?requested) AS ?item)
  ?item schema:version ?version .
}}"#
        ))
    }

    fn term_query(&self, term: &str) -> Result<String> {
        let start_time = self.pid(Property::StartTime)?;
        let end_time = self.pid(Property::EndTime)?;

        Ok(format!(
            r#"SELECT ?term ?start ?end ?previous_term_end ?next_term_start
WHERE {{
  VALUES ?term {{ {term} }}
  ?term schema:version ?version .
  OPTIONAL {{ ?term wdt:{INCEPTION}|wdt:{start_time} ?start }}
  OPTIONAL {{ ?term wdt:{DISSOLVED}|wdt:{end_time} ?end }}
  OPTIONAL {{
    ?term wdt:{FOLLOWS} ?previous_term .
    ?previous_term wdt:{DISSOLVED}|wdt:{end_time} ?previous_term_end
  }}
  OPTIONAL {{
    ?term wdt:{FOLLOWED_BY} ?next_term .
    ?next_term wdt:{INCEPTION}|wdt:{start_time} ?next_term_start
  }}
}}
LIMIT 1"#,
            term = entity_ref(term)?,
        ))
    }
}

/// `wd:` prefixed reference, rejecting anything that is not an item or property id
fn entity_ref(id: &str) -> Result<String> {
    let mut chars = id.chars();
    let valid = matches!(chars.next(), Some('Q') | Some('P'))
        && id.len() > 1
        && chars.all(|c| c.is_ascii_digit());
    if !valid {
        return Err(ClassifierError::InvalidIdentifier(id.to_string()));
    }
    Ok(format!("wd:{}", id))
}

#[async_trait]
impl RecordStore for SparqlRecordStore {
    async fn position_held(
        &self,
        position: &str,
        person: Option<&str>,
    ) -> Result<Vec<ExistingClaimRecord>> {
        let query = self.position_held_query(position, person)?;
        let bindings = self.select(&query).await?;

        let records: Vec<ExistingClaimRecord> = bindings
            .iter()
            .filter_map(|b| {
                Some(ExistingClaimRecord {
                    claim_id: b.claim_id("statement")?,
                    person: b.item("item")?,
                    position_start: b.date("start"),
                    position_end: b.date("end"),
                    term: b.item("term"),
                    term_start: b.date("term_start"),
                    term_end: b.date("term_end"),
                    group: b.item("group"),
                    district: b.item("district"),
                    merged_then_deleted: b.item_list("merged_then_deleted"),
                })
            })
            .collect();

        tracing::info!(
            position = %position,
            person = ?person,
            claims = records.len(),
            "Loaded existing position-held claims"
        );
        Ok(records)
    }

    async fn items(&self, items: &[String]) -> Result<HashMap<String, ItemRecord>> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }
        let bindings = self.select(&Self::items_query(items)?).await?;

        Ok(bindings
            .iter()
            .filter_map(|b| {
                let requested = b.item("requested")?;
                let item = b.item("item")?;
                Some((requested.clone(), ItemRecord { requested, item }))
            })
            .collect())
    }

    async fn term(&self, term: &str) -> Result<Option<TermRecord>> {
        let bindings = self.select(&self.term_query(term)?).await?;

        Ok(bindings.first().map(|b| TermRecord {
            term: b.item("term").unwrap_or_else(|| term.to_string()),
            start: b.date("start"),
            end: b.date("end"),
            previous_term_end: b.date("previous_term_end"),
            next_term_start: b.date("next_term_start"),
        }))
    }
}
