//! Subcommand handlers

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use vpages_classifier::{PageClassifier, SparqlRecordStore};
use vpages_common::config::TomlConfig;
use vpages_common::db::SqliteStore;
use vpages_common::normalize::{parse_csv, refresh_statements};
use vpages_common::repository::PageRepository;
use vpages_common::statistics::{parse_export, CountryStatistics};
use vpages_common::{Page, Reconciliation, ResourceType, StatementType, Verification};
use vpages_wikibase::entity::LocalizedText;
use vpages_wikibase::{
    claim_data_for, ClaimReconciler, ClientConfig, DataValue, ExistingClaim, KnowledgeBase,
    WikibaseClient,
};

const CREATE_SUMMARY: &str = "Created with Verification Pages";

fn wikibase_client(config: &TomlConfig) -> Result<WikibaseClient> {
    Ok(WikibaseClient::new(ClientConfig::from_toml(config))?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn add_page(store: &SqliteStore, page: &Page) -> Result<()> {
    DataValue::item(&page.position_held_item)?;
    store.save_page(page).await?;
    info!(page = %page.title, position = %page.position_held_item, "Saved page");
    Ok(())
}

pub async fn load_csv(store: &SqliteStore, page_title: &str, file: &Path) -> Result<()> {
    let page = store.find_page(page_title).await?;
    let reader = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let rows = parse_csv(reader)?;

    let existing = store.statements_for_page(&page.title, &[]).await?;
    let outcome = refresh_statements(&page, existing, rows)?;
    store.save_statements(&page.title, &outcome.statements).await?;

    println!(
        "{}: {} created, {} updated, {} removed from source",
        page.title, outcome.created, outcome.updated, outcome.removed
    );
    Ok(())
}

pub async fn classify(
    config: &TomlConfig,
    store: &SqliteStore,
    page_title: &str,
    transaction_ids: &[String],
    statement_type: Option<StatementType>,
) -> Result<()> {
    let records = SparqlRecordStore::from_config(config)?;
    let classified = PageClassifier::new(store, &records)
        .classify(page_title, transaction_ids)
        .await?;

    for (kind, statements) in classified.grouped() {
        info!(statement_type = %kind, count = statements.len(), "Classified");
    }

    let statements: Vec<_> = match statement_type {
        Some(t) => classified.group(t),
        None => classified.statements.iter().collect(),
    };
    print_json(&statements)
}

pub async fn verify(store: &SqliteStore, transaction_id: &str, user: &str, status: bool) -> Result<()> {
    store
        .record_verification(
            transaction_id,
            &Verification {
                user: user.to_string(),
                status,
                created_at: Utc::now(),
            },
        )
        .await?;
    info!(transaction_id = %transaction_id, status, "Recorded verification");
    Ok(())
}

pub async fn reconcile(
    store: &SqliteStore,
    transaction_id: &str,
    resource_type: ResourceType,
    item: &str,
    user: &str,
) -> Result<()> {
    DataValue::item(item)?;
    store
        .record_reconciliation(
            transaction_id,
            &Reconciliation {
                resource_type,
                item: item.to_string(),
                user: user.to_string(),
                created_at: Utc::now(),
            },
        )
        .await?;
    info!(
        transaction_id = %transaction_id,
        resource_type = resource_type.as_str(),
        item = %item,
        "Recorded reconciliation"
    );
    Ok(())
}

/// Classify one statement and, if it is actionable, write its claim
pub async fn push(
    config: &TomlConfig,
    store: &SqliteStore,
    page_title: &str,
    transaction_id: &str,
) -> Result<()> {
    let records = SparqlRecordStore::from_config(config)?;
    let classified = PageClassifier::new(store, &records)
        .classify(page_title, &[transaction_id.to_string()])
        .await?;
    let Some(decorated) = classified.find(transaction_id) else {
        bail!("No statement {} on {}", transaction_id, page_title);
    };
    if decorated.statement_type != StatementType::Actionable {
        warn!(
            transaction_id = %transaction_id,
            statement_type = %decorated.statement_type,
            "Statement is not actionable"
        );
        bail!(
            "Statement {} is {}, only actionable statements are pushed",
            transaction_id,
            decorated.statement_type
        );
    }

    let properties = config.property_table()?;
    let existing = decorated
        .target_claim()
        .map(|target| ExistingClaim::new(&target.person, &target.claim_id));
    let data = claim_data_for(
        &decorated.statement,
        &classified.page,
        &properties,
        existing,
        Utc::now().date_naive(),
    )?;

    let client = wikibase_client(config)?;
    let base = client.latest_revision(&data.entity).await?;
    let outcome = ClaimReconciler::new(&client, &properties)?
        .update_or_create_claim(base, &data)
        .await?;

    store
        .mark_actioned(transaction_id, &outcome.claim_id, Utc::now())
        .await?;

    print_json(&serde_json::json!({
        "transaction_id": transaction_id,
        "claim_id": outcome.claim_id,
        "revision": outcome.revision.id(),
        "qualifiers_written": outcome.qualifiers_written,
        "reference_written": outcome.reference_written,
    }))
}

/// Per-country statistics from suggestion exports named `<country code>.json`
pub async fn statistics(store: &SqliteStore, exports: &[PathBuf]) -> Result<()> {
    let pages = store.position_page_titles().await?;
    let mut countries = BTreeMap::new();
    for path in exports {
        let code = country_code(path)?;
        let reader =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let suggestions = parse_export(reader)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let stats = CountryStatistics::collect(suggestions, &pages);
        info!(
            country = %code,
            positions = stats.positions.len(),
            invalid = stats.invalid.len(),
            "Collected statistics"
        );
        countries.insert(code, stats);
    }
    print_json(&countries)
}

fn country_code(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_lowercase)
        .with_context(|| format!("No country code in {}", path.display()))
}

pub async fn search(config: &TomlConfig, name: &str, wiki: &str, language: &str) -> Result<()> {
    let results = wikibase_client(config)?.search(name, wiki, language).await?;
    print_json(&results)
}

pub async fn latest_revision(config: &TomlConfig, title: &str) -> Result<()> {
    let revision = wikibase_client(config)?.latest_revision(title).await?;
    println!("{}", revision);
    Ok(())
}

pub async fn create_person(
    config: &TomlConfig,
    label: &str,
    description: &str,
    language: &str,
) -> Result<()> {
    let properties = config.property_table()?;
    let created = wikibase_client(config)?
        .create_person(
            &properties,
            &LocalizedText::new(language, label),
            &LocalizedText::new(language, description),
            CREATE_SUMMARY,
        )
        .await?;
    print_json(&serde_json::json!({
        "item": created.item,
        "revision": created.revision.id(),
        "url": format!("https://{}/wiki/{}", config.server, created.item),
    }))
}
