//! CSV row normalization and statement refresh
//!
//! Source CSVs name the same column many ways (`party`, `faction`, `group_id`,
//! `wikidata_party`, ...). [`COLUMN_SYNONYMS`] maps every accepted header to one field of the
//! fixed-shape [`SourceRow`]; the first non-blank synonym in table order wins.

use crate::model::{check_unique_memberships, Page, ResourceType, Statement};
use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use tracing::{debug, info};

/// Field of a normalized source row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceField {
    TransactionId,
    PersonName,
    PersonItem,
    GroupName,
    GroupItem,
    DistrictName,
    DistrictItem,
    PositionStart,
    PositionEnd,
}

/// Accepted headers per field, in priority order
pub const COLUMN_SYNONYMS: &[(SourceField, &[&str])] = &[
    (SourceField::TransactionId, &["transaction_id"]),
    (SourceField::PersonName, &["person_name", "name"]),
    (SourceField::PersonItem, &["person_item", "id", "wikidata"]),
    (
        SourceField::GroupName,
        &["parliamentary_group_name", "alliance", "coalition", "faction", "party", "group"],
    ),
    (
        SourceField::GroupItem,
        &[
            "parliamentary_group_item",
            "alliance_id",
            "alliance_wikidata",
            "wikidata_alliance",
            "coalition_id",
            "coalition_wikidata",
            "wikidata_coalition",
            "faction_id",
            "faction_wikidata",
            "wikidata_faction",
            "party_id",
            "party_wikidata",
            "wikidata_party",
            "group_id",
            "group_wikidata",
            "wikidata_group",
        ],
    ),
    (
        SourceField::DistrictName,
        &["electoral_district_name", "area", "constituency", "district"],
    ),
    (
        SourceField::DistrictItem,
        &[
            "electoral_district_item",
            "area_id",
            "area_wikidata",
            "wikidata_area",
            "constituency_id",
            "constituency_wikidata",
            "wikidata_constituency",
            "district_id",
            "district_wikidata",
            "wikidata_district",
        ],
    ),
    (SourceField::PositionStart, &["position_start", "start_date"]),
    (SourceField::PositionEnd, &["position_end", "end_date", "start_end"]),
];

/// Fixed-shape record produced from one CSV row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRow {
    pub transaction_id: Option<String>,
    pub person_name: Option<String>,
    pub person_item: Option<String>,
    pub parliamentary_group_name: Option<String>,
    pub parliamentary_group_item: Option<String>,
    pub electoral_district_name: Option<String>,
    pub electoral_district_item: Option<String>,
    pub position_start: Option<String>,
    pub position_end: Option<String>,
    /// All non-blank cells keyed by normalized header, for transaction id generation
    pub raw: BTreeMap<String, String>,
}

impl SourceRow {
    fn field_mut(&mut self, field: SourceField) -> &mut Option<String> {
        match field {
            SourceField::TransactionId => &mut self.transaction_id,
            SourceField::PersonName => &mut self.person_name,
            SourceField::PersonItem => &mut self.person_item,
            SourceField::GroupName => &mut self.parliamentary_group_name,
            SourceField::GroupItem => &mut self.parliamentary_group_item,
            SourceField::DistrictName => &mut self.electoral_district_name,
            SourceField::DistrictItem => &mut self.electoral_district_item,
            SourceField::PositionStart => &mut self.position_start,
            SourceField::PositionEnd => &mut self.position_end,
        }
    }

    fn item(&self, resource_type: ResourceType) -> Option<&str> {
        match resource_type {
            ResourceType::Person => self.person_item.as_deref(),
            ResourceType::Party => self.parliamentary_group_item.as_deref(),
            ResourceType::District => self.electoral_district_item.as_deref(),
        }
    }
}

/// Lower-case a header and collapse non-alphanumerics to single underscores
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    for ch in header.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Build a [`SourceRow`] from header/value cells
pub fn normalize_row<'a>(cells: impl IntoIterator<Item = (&'a str, &'a str)>) -> SourceRow {
    let raw: BTreeMap<String, String> = cells
        .into_iter()
        .map(|(h, v)| (normalize_header(h), v.trim().to_string()))
        .filter(|(_, v)| !v.is_empty())
        .collect();

    let mut row = SourceRow::default();
    for (field, synonyms) in COLUMN_SYNONYMS {
        let value = synonyms.iter().find_map(|s| raw.get(*s)).cloned();
        *row.field_mut(*field) = value;
    }
    row.raw = raw;
    row
}

/// Parse a CSV document with a header line into normalized rows
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<SourceRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(normalize_row(headers.iter().zip(record.iter())));
    }

    debug!(rows = rows.len(), "Parsed source CSV");
    Ok(rows)
}

/// Stable identifier for a row that does not carry one
pub fn generate_transaction_id(page_title: &str, row: &SourceRow) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page_title.as_bytes());
    for (key, value) in &row.raw {
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
    }
    format!("sha256:{:x}", hasher.finalize())
}

/// Counts reported by [`refresh_statements`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub statements: Vec<Statement>,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Merge a fresh CSV pull into the page's statements
///
/// Rows are matched to existing statements by transaction id. Item fields never take a blank
/// CSV value, and a field with a manual reconciliation keeps the reconciled item. Statements
/// missing from the pull are kept and flagged `removed_from_source`.
pub fn refresh_statements(
    page: &Page,
    existing: Vec<Statement>,
    rows: Vec<SourceRow>,
) -> Result<RefreshOutcome> {
    let mut by_id: HashMap<String, Statement> = existing
        .into_iter()
        .map(|s| (s.transaction_id.clone(), s))
        .collect();
    let mut outcome = RefreshOutcome::default();

    for row in rows {
        let transaction_id = row
            .transaction_id
            .clone()
            .unwrap_or_else(|| generate_transaction_id(&page.title, &row));

        let mut statement = match by_id.remove(&transaction_id) {
            Some(s) => {
                outcome.updated += 1;
                s
            }
            None => {
                outcome.created += 1;
                Statement::new(transaction_id, "")
            }
        };

        for resource_type in [ResourceType::Person, ResourceType::Party, ResourceType::District] {
            let value = statement
                .latest_reconciliation(resource_type)
                .map(|r| r.item.clone())
                .or_else(|| row.item(resource_type).map(str::to_string));
            if let Some(value) = value {
                match resource_type {
                    ResourceType::Person => statement.person_item = Some(value),
                    ResourceType::Party => statement.parliamentary_group_item = Some(value),
                    ResourceType::District => statement.electoral_district_item = Some(value),
                }
            }
        }

        statement.person_name = row.person_name.clone().unwrap_or_default();
        statement.parliamentary_group_name = row.parliamentary_group_name.clone();
        statement.electoral_district_name = row.electoral_district_name.clone();
        statement.parliamentary_term_item = page.parliamentary_term_item.clone();
        statement.position_start = row.position_start.clone();
        statement.position_end = row.position_end.clone();
        statement.removed_from_source = false;

        outcome.statements.push(statement);
    }

    let mut untouched: Vec<Statement> = by_id.into_values().collect();
    untouched.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
    for mut statement in untouched {
        statement.removed_from_source = true;
        outcome.removed += 1;
        outcome.statements.push(statement);
    }

    check_unique_memberships(&outcome.statements)?;

    info!(
        page = %page.title,
        created = outcome.created,
        updated = outcome.updated,
        removed = outcome.removed,
        "Refreshed statements from source"
    );
    Ok(outcome)
}
