//! Claim structures as returned by `wbgetclaims`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiDataValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Snak {
    pub snaktype: String,
    pub property: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default)]
    pub datavalue: Option<ApiDataValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Reference {
    pub hash: String,
    #[serde(default)]
    pub snaks: HashMap<String, Vec<Snak>>,
}

impl Reference {
    /// True when a `url` snak for `property` holds exactly `url`
    pub fn points_at(&self, property: &str, url: &str) -> bool {
        self.snaks.get(property).is_some_and(|snaks| {
            snaks.iter().any(|s| {
                s.datatype.as_deref() == Some("url")
                    && s.datavalue
                        .as_ref()
                        .and_then(|d| d.value.as_str())
                        .is_some_and(|v| v == url)
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Claim {
    pub id: String,
    pub mainsnak: Snak,
    #[serde(default)]
    pub qualifiers: HashMap<String, Vec<Snak>>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// Claims keyed by main-snak property
pub type ClaimMap = HashMap<String, Vec<Claim>>;

#[derive(Debug, Deserialize)]
pub(crate) struct GetClaimsResponse {
    #[serde(default)]
    pub claims: ClaimMap,
}
