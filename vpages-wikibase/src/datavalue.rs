//! Typed datavalues in the exact shapes the API expects
//!
//! ```json
//! {"entity-type": "item", "numeric-id": 42, "id": "Q42"}
//! {"time": "+2015-12-03T00:00:00Z", "timezone": 0, "before": 0, "after": 0,
//!  "precision": 11, "calendarmodel": "http://www.wikidata.org/entity/Q1985727"}
//! "https://example.com/"
//! ```

use crate::error::{Result, WikibaseError};
use chrono::NaiveDate;
use serde_json::{json, Value};

pub const GREGORIAN_CALENDAR: &str = "http://www.wikidata.org/entity/Q1985727";
pub const DAY_PRECISION: u8 = 11;

/// Value to write as a claim, qualifier or reference snak
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Item(String),
    Time(NaiveDate),
    String(String),
}

impl DataValue {
    /// Item value, validating the identifier
    pub fn item(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        numeric_id(&id)?;
        Ok(DataValue::Item(id))
    }

    /// Datavalue `type` field
    pub fn value_type(&self) -> &'static str {
        match self {
            DataValue::Item(_) => "wikibase-entityid",
            DataValue::Time(_) => "time",
            DataValue::String(_) => "string",
        }
    }

    /// Datavalue `value` field
    pub fn to_value(&self) -> Value {
        match self {
            DataValue::Item(id) => json!({
                "entity-type": "item",
                "numeric-id": numeric_id(id).unwrap_or_default(),
                "id": id,
            }),
            DataValue::Time(date) => json!({
                "after": 0,
                "before": 0,
                "calendarmodel": GREGORIAN_CALENDAR,
                "precision": DAY_PRECISION,
                "time": format!("+{}T00:00:00Z", date.format("%Y-%m-%d")),
                "timezone": 0,
            }),
            DataValue::String(s) => Value::String(s.clone()),
        }
    }

    /// Full `{type, value}` datavalue object
    pub fn to_datavalue(&self) -> Value {
        json!({ "type": self.value_type(), "value": self.to_value() })
    }

    /// Value as the JSON string sent in the `value` request parameter
    pub fn to_param(&self) -> String {
        self.to_value().to_string()
    }

    /// Snak object for reference or entity data
    pub fn to_snak(&self, property: &str) -> Value {
        json!({
            "snaktype": "value",
            "property": property,
            "datavalue": self.to_datavalue(),
        })
    }

    /// Plain string content, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

fn numeric_id(id: &str) -> Result<u64> {
    id.strip_prefix('Q')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| WikibaseError::Config(format!("Invalid item identifier {}", id)))
}
