//! New item creation for people and other entities missing from the knowledge base

use crate::api::{Revision, WikibaseClient};
use crate::datavalue::DataValue;
use crate::error::Result;
use serde_json::{json, Map, Value};
use vpages_common::{KnownItem, Property, PropertyTable};

/// Text in one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedText {
    pub language: String,
    pub value: String,
}

impl LocalizedText {
    pub fn new(language: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            value: value.into(),
        }
    }
}

/// Item created by `wbeditentity`
#[derive(Debug, PartialEq, Eq)]
pub struct CreatedItem {
    pub item: String,
    pub revision: Revision,
}

fn localized(text: &LocalizedText) -> Value {
    let mut map = Map::new();
    map.insert(
        text.language.clone(),
        json!({ "language": text.language, "value": text.value }),
    );
    Value::Object(map)
}

fn item_statement(property: &str, item: &str) -> Result<Value> {
    Ok(json!({
        "mainsnak": DataValue::item(item)?.to_snak(property),
        "type": "statement",
        "rank": "normal",
    }))
}

/// Entity data for a politician: occupation politician, instance of human
pub fn person_data(
    properties: &PropertyTable,
    label: &LocalizedText,
    description: &LocalizedText,
) -> Result<Value> {
    Ok(json!({
        "labels": localized(label),
        "descriptions": localized(description),
        "claims": [
            item_statement(
                properties.property_id(Property::Occupation)?,
                properties.item_id(KnownItem::Politician)?,
            )?,
            item_statement(
                properties.property_id(Property::InstanceOf)?,
                properties.item_id(KnownItem::Human)?,
            )?,
        ],
    }))
}

/// Entity data for a party, district or other item with a country
pub fn item_data(
    properties: &PropertyTable,
    label: &LocalizedText,
    description: &LocalizedText,
    country_item: &str,
    instance_of_item: &str,
) -> Result<Value> {
    Ok(json!({
        "labels": localized(label),
        "descriptions": localized(description),
        "claims": [
            item_statement(properties.property_id(Property::Country)?, country_item)?,
            item_statement(properties.property_id(Property::InstanceOf)?, instance_of_item)?,
        ],
    }))
}

impl WikibaseClient {
    pub async fn create_person(
        &self,
        properties: &PropertyTable,
        label: &LocalizedText,
        description: &LocalizedText,
        summary: &str,
    ) -> Result<CreatedItem> {
        let data = person_data(properties, label, description)?;
        let (item, revision) = self.create_entity(&data, summary).await?;
        Ok(CreatedItem { item, revision })
    }

    pub async fn create_item(
        &self,
        properties: &PropertyTable,
        label: &LocalizedText,
        description: &LocalizedText,
        country_item: &str,
        instance_of_item: &str,
        summary: &str,
    ) -> Result<CreatedItem> {
        let data = item_data(properties, label, description, country_item, instance_of_item)?;
        let (item, revision) = self.create_entity(&data, summary).await?;
        Ok(CreatedItem { item, revision })
    }
}
