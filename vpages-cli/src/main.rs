//! vpages - verification pages command line
//!
//! Loads source CSVs into verification pages, classifies their statements against the
//! knowledge base, records volunteer verifications and reconciliations, and pushes actionable
//! statements back as position-held claims.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use vpages_common::config::{ConfigResolver, TomlConfig};
use vpages_common::db::SqliteStore;
use vpages_common::logging::init_tracing;
use vpages_common::{ResourceType, StatementType};

mod commands;

/// Command-line arguments for vpages
#[derive(Parser, Debug)]
#[command(name = "vpages")]
#[command(about = "Verify politician positions and write them to Wikidata")]
#[command(version)]
struct Args {
    /// Configuration file (overrides VPAGES_CONFIG and the default location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update a verification page
    AddPage {
        title: String,
        /// Position held item, e.g. Q15964890
        #[arg(long)]
        position: String,
        /// Parliamentary term item
        #[arg(long)]
        term: Option<String>,
        #[arg(long)]
        reference_url: String,
        #[arg(long)]
        csv_source_url: Option<String>,
        /// The position is executive; statements have no electoral district
        #[arg(long)]
        executive: bool,
        #[arg(long)]
        country: Option<String>,
    },

    /// Refresh a page's statements from a CSV file
    LoadCsv { page: String, file: PathBuf },

    /// Classify a page's statements and print them as JSON
    Classify {
        page: String,
        /// Restrict to these transaction ids
        #[arg(long = "transaction-id")]
        transaction_ids: Vec<String>,
        /// Only print statements of this type
        #[arg(long = "type")]
        statement_type: Option<StatementType>,
    },

    /// Record a verification
    Verify {
        transaction_id: String,
        #[arg(long)]
        user: String,
        /// false marks the statement unverifiable
        #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
        status: bool,
    },

    /// Link a statement field to an item
    Reconcile {
        transaction_id: String,
        #[arg(long)]
        resource_type: ResourceType,
        #[arg(long)]
        item: String,
        #[arg(long)]
        user: String,
    },

    /// Write an actionable statement to the knowledge base
    Push { page: String, transaction_id: String },

    /// Count verified suggestions per position from exports named `<country>.json`
    Statistics {
        #[arg(required = true)]
        exports: Vec<PathBuf>,
    },

    /// Search a person in the knowledge base and Wikipedia
    Search {
        name: String,
        #[arg(long, default_value = "en")]
        wiki: String,
        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Print the latest revision id of a page
    LatestRevision { title: String },

    /// Create a new person item
    CreatePerson {
        #[arg(long)]
        label: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "en")]
        language: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to load configuration")?;
    init_tracing(&config.logging);
    info!(server = %config.server, "Starting vpages");

    run(args.command, &config).await
}

async fn run(command: Command, config: &TomlConfig) -> Result<()> {
    match command {
        Command::AddPage {
            title,
            position,
            term,
            reference_url,
            csv_source_url,
            executive,
            country,
        } => {
            let page = vpages_common::Page {
                title,
                position_held_item: position,
                parliamentary_term_item: term,
                reference_url,
                csv_source_url,
                executive_position: executive,
                country_item: country,
                new_item_description_en: None,
                new_item_label_language: None,
            };
            commands::add_page(&open_store(config).await?, &page).await
        }
        Command::LoadCsv { page, file } => {
            commands::load_csv(&open_store(config).await?, &page, &file).await
        }
        Command::Classify {
            page,
            transaction_ids,
            statement_type,
        } => {
            let store = open_store(config).await?;
            commands::classify(config, &store, &page, &transaction_ids, statement_type).await
        }
        Command::Verify {
            transaction_id,
            user,
            status,
        } => commands::verify(&open_store(config).await?, &transaction_id, &user, status).await,
        Command::Reconcile {
            transaction_id,
            resource_type,
            item,
            user,
        } => {
            let store = open_store(config).await?;
            commands::reconcile(&store, &transaction_id, resource_type, &item, &user).await
        }
        Command::Push {
            page,
            transaction_id,
        } => commands::push(config, &open_store(config).await?, &page, &transaction_id).await,
        Command::Statistics { exports } => {
            commands::statistics(&open_store(config).await?, &exports).await
        }
        Command::Search {
            name,
            wiki,
            language,
        } => commands::search(config, &name, &wiki, &language).await,
        Command::LatestRevision { title } => commands::latest_revision(config, &title).await,
        Command::CreatePerson {
            label,
            description,
            language,
        } => commands::create_person(config, &label, &description, &language).await,
    }
}

async fn open_store(config: &TomlConfig) -> Result<SqliteStore> {
    let db_path = config.database_path();
    SqliteStore::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_args() {
        let args = Args::try_parse_from([
            "vpages",
            "classify",
            "User:Example/MPs",
            "--transaction-id",
            "t1",
            "--transaction-id",
            "t2",
            "--type",
            "manually_actionable",
        ])
        .unwrap();
        match args.command {
            Command::Classify {
                page,
                transaction_ids,
                statement_type,
            } => {
                assert_eq!(page, "User:Example/MPs");
                assert_eq!(transaction_ids, vec!["t1", "t2"]);
                assert_eq!(statement_type, Some(StatementType::ManuallyActionable));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verify_status_false() {
        let args =
            Args::try_parse_from(["vpages", "verify", "t1", "--user", "alice", "--status", "false"])
                .unwrap();
        assert!(matches!(args.command, Command::Verify { status: false, .. }));
    }

    #[test]
    fn test_reconcile_resource_type() {
        let args = Args::try_parse_from([
            "vpages",
            "--config",
            "/tmp/vpages.toml",
            "reconcile",
            "t1",
            "--resource-type",
            "party",
            "--item",
            "Q101",
            "--user",
            "alice",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/vpages.toml")));
        assert!(matches!(
            args.command,
            Command::Reconcile {
                resource_type: ResourceType::Party,
                ..
            }
        ));
    }

    #[test]
    fn test_statistics_needs_exports() {
        let args = Args::try_parse_from(["vpages", "statistics", "ca.json", "gb.json"]).unwrap();
        match args.command {
            Command::Statistics { exports } => {
                assert_eq!(exports, vec![PathBuf::from("ca.json"), PathBuf::from("gb.json")]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Args::try_parse_from(["vpages", "statistics"]).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(Args::try_parse_from(["vpages", "classify", "P", "--type", "pending"]).is_err());
    }
}
