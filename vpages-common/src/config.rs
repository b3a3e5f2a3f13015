//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `VPAGES_CONFIG` environment variable
//! 3. `~/.config/vpages/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing file at the default location is not an error: a warning is logged and the
//! compiled defaults are used. A file named explicitly (argument or environment) must exist.
//!
//! The property/item identifier tables are resolved from the active server here and handed to
//! the rest of the workspace as a [`PropertyTable`] value.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VPAGES_CONFIG";
/// Environment variable overriding the configured server
pub const SERVER_ENV_VAR: &str = "VPAGES_SERVER";
/// Environment variable overriding the configured database path
pub const DATABASE_ENV_VAR: &str = "VPAGES_DATABASE";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Wikibase server host name, selects the property table
    #[serde(default = "default_server")]
    pub server: String,

    /// Action API endpoint. Defaults to `https://{server}/w/api.php`
    #[serde(default)]
    pub api_url: Option<String>,

    /// SPARQL endpoint of the query service
    #[serde(default = "default_sparql_url")]
    pub sparql_url: String,

    /// Document index (Wikipedia) API endpoint; `{lang}` is replaced with the wiki language
    #[serde(default = "default_document_index_url")]
    pub document_index_url: String,

    /// SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Send requests through a local API proxy that handles authentication
    #[serde(default)]
    pub use_api_proxy: bool,

    /// User agent sent with every outbound request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Property identifier overrides, keyed by property label (e.g. "reference URL")
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Item identifier overrides, keyed by item label (e.g. "politician")
    #[serde(default)]
    pub items: BTreeMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_server() -> String {
    "www.wikidata.org".to_string()
}

fn default_sparql_url() -> String {
    "https://query.wikidata.org/sparql".to_string()
}

fn default_document_index_url() -> String {
    "https://{lang}.wikipedia.org/w/api.php".to_string()
}

fn default_user_agent() -> String {
    format!("vpages/{} (verification pages)", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            api_url: None,
            sparql_url: default_sparql_url(),
            document_index_url: default_document_index_url(),
            database_path: None,
            use_api_proxy: false,
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            logging: LoggingConfig::default(),
            properties: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Action API endpoint for the active server
    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/w/api.php", self.server))
    }

    /// Database file, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("vpages").join("vpages.db"))
                .unwrap_or_else(|| PathBuf::from("./vpages_data/vpages.db"))
        })
    }

    /// Property/item table for the active server with TOML overrides applied
    pub fn property_table(&self) -> Result<PropertyTable> {
        PropertyTable::for_server(&self.server)?.with_overrides(&self.properties, &self.items)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(server) = std::env::var(SERVER_ENV_VAR) {
            if !server.trim().is_empty() {
                info!("Server overridden by {}: {}", SERVER_ENV_VAR, server);
                self.server = server;
            }
        }
        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            if !path.trim().is_empty() {
                self.database_path = Some(PathBuf::from(path));
            }
        }
    }
}

/// Resolves and loads the bootstrap configuration
pub struct ConfigResolver {
    cli_arg: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self { cli_arg }
    }

    /// Resolve the config file and load it, then apply environment overrides
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match self.explicit_path() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                TomlConfig::load(&path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    info!("Loading configuration from {}", path.display());
                    TomlConfig::load(&path)?
                }
                _ => {
                    warn!("No configuration file found, using compiled defaults");
                    TomlConfig::default()
                }
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn explicit_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_arg {
            return Some(path.clone());
        }
        std::env::var(CONFIG_ENV_VAR)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }
}

/// `~/.config/vpages/config.toml` on the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vpages").join("config.toml"))
}

// ============================================================================
// Property and item identifier tables
// ============================================================================

/// Logical properties used when reading and writing claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    ReferenceUrl,
    WikimediaImportUrl,
    ReferenceRetrieved,
    Occupation,
    ParliamentaryGroup,
    ElectoralDistrict,
    PositionHeld,
    ParliamentaryTerm,
    Title,
    LanguageOfWork,
    Country,
    InstanceOf,
    StartTime,
    EndTime,
}

impl Property {
    pub const ALL: [Property; 14] = [
        Property::ReferenceUrl,
        Property::WikimediaImportUrl,
        Property::ReferenceRetrieved,
        Property::Occupation,
        Property::ParliamentaryGroup,
        Property::ElectoralDistrict,
        Property::PositionHeld,
        Property::ParliamentaryTerm,
        Property::Title,
        Property::LanguageOfWork,
        Property::Country,
        Property::InstanceOf,
        Property::StartTime,
        Property::EndTime,
    ];

    /// Human-readable label, also the key used in TOML overrides
    pub fn label(self) -> &'static str {
        match self {
            Property::ReferenceUrl => "reference URL",
            Property::WikimediaImportUrl => "Wikimedia import URL",
            Property::ReferenceRetrieved => "reference retrieved",
            Property::Occupation => "occupation",
            Property::ParliamentaryGroup => "parliamentary group",
            Property::ElectoralDistrict => "electoral district",
            Property::PositionHeld => "position held",
            Property::ParliamentaryTerm => "parliamentary term",
            Property::Title => "title",
            Property::LanguageOfWork => "language of work or name",
            Property::Country => "country",
            Property::InstanceOf => "instance of",
            Property::StartTime => "start time",
            Property::EndTime => "end time",
        }
    }

    pub fn from_label(label: &str) -> Option<Property> {
        Property::ALL.into_iter().find(|p| p.label() == label)
    }
}

/// Well-known items referenced when creating new entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownItem {
    Politician,
    Canada,
    Human,
}

impl KnownItem {
    pub const ALL: [KnownItem; 3] = [KnownItem::Politician, KnownItem::Canada, KnownItem::Human];

    pub fn label(self) -> &'static str {
        match self {
            KnownItem::Politician => "politician",
            KnownItem::Canada => "Canada",
            KnownItem::Human => "human",
        }
    }

    pub fn from_label(label: &str) -> Option<KnownItem> {
        KnownItem::ALL.into_iter().find(|i| i.label() == label)
    }
}

const WIKIDATA_PROPERTIES: [(Property, &str); 14] = [
    (Property::ReferenceUrl, "P854"),
    (Property::WikimediaImportUrl, "P4656"),
    (Property::ReferenceRetrieved, "P813"),
    (Property::Occupation, "P106"),
    (Property::ParliamentaryGroup, "P4100"),
    (Property::ElectoralDistrict, "P768"),
    (Property::PositionHeld, "P39"),
    (Property::ParliamentaryTerm, "P2937"),
    (Property::Title, "P1476"),
    (Property::LanguageOfWork, "P407"),
    (Property::Country, "P17"),
    (Property::InstanceOf, "P31"),
    (Property::StartTime, "P580"),
    (Property::EndTime, "P582"),
];

const TEST_WIKIDATA_PROPERTIES: [(Property, &str); 14] = [
    (Property::ReferenceUrl, "P43659"),
    (Property::WikimediaImportUrl, "P77057"),
    (Property::ReferenceRetrieved, "P388"),
    (Property::Occupation, "P70554"),
    (Property::ParliamentaryGroup, "P70557"),
    (Property::ElectoralDistrict, "P70558"),
    (Property::PositionHeld, "P39"),
    (Property::ParliamentaryTerm, "P70901"),
    (Property::Title, "P77107"),
    (Property::LanguageOfWork, "P77090"),
    (Property::Country, "P17"),
    (Property::InstanceOf, "P82"),
    (Property::StartTime, "P355"),
    (Property::EndTime, "P356"),
];

const WIKIDATA_ITEMS: [(KnownItem, &str); 3] = [
    (KnownItem::Politician, "Q82955"),
    (KnownItem::Canada, "Q16"),
    (KnownItem::Human, "Q5"),
];

const TEST_WIKIDATA_ITEMS: [(KnownItem, &str); 3] = [
    (KnownItem::Politician, "Q514"),
    (KnownItem::Canada, "Q620"),
    (KnownItem::Human, "Q497"),
];

/// Mapping from logical property/item names to identifiers on one server
#[derive(Debug, Clone)]
pub struct PropertyTable {
    server: String,
    properties: HashMap<Property, String>,
    items: HashMap<KnownItem, String>,
}

impl PropertyTable {
    /// Built-in table for a known server
    ///
    /// `localhost` is a development proxy in front of test.wikidata.org and shares its table.
    pub fn for_server(server: &str) -> Result<Self> {
        let (properties, items) = match server {
            "www.wikidata.org" => (&WIKIDATA_PROPERTIES, &WIKIDATA_ITEMS),
            "test.wikidata.org" | "localhost" => (&TEST_WIKIDATA_PROPERTIES, &TEST_WIKIDATA_ITEMS),
            other => return Err(Error::Config(format!("Unknown server name {}", other))),
        };

        Ok(Self {
            server: server.to_string(),
            properties: properties
                .iter()
                .map(|(p, id)| (*p, id.to_string()))
                .collect(),
            items: items.iter().map(|(i, id)| (*i, id.to_string())).collect(),
        })
    }

    /// Replace identifiers by label; unknown labels are configuration errors
    pub fn with_overrides(
        mut self,
        properties: &BTreeMap<String, String>,
        items: &BTreeMap<String, String>,
    ) -> Result<Self> {
        for (label, id) in properties {
            let property = Property::from_label(label)
                .ok_or_else(|| Error::Config(format!("Unknown property label {}", label)))?;
            self.properties.insert(property, id.clone());
        }
        for (label, id) in items {
            let item = KnownItem::from_label(label)
                .ok_or_else(|| Error::Config(format!("Unknown item label {}", label)))?;
            self.items.insert(item, id.clone());
        }
        Ok(self)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Identifier of a property on this server
    pub fn property_id(&self, property: Property) -> Result<&str> {
        self.properties.get(&property).map(String::as_str).ok_or_else(|| {
            Error::Config(format!(
                "Unknown property {} for server {}",
                property.label(),
                self.server
            ))
        })
    }

    pub fn item_id(&self, item: KnownItem) -> Result<&str> {
        self.items.get(&item).map(String::as_str).ok_or_else(|| {
            Error::Config(format!(
                "Unknown item {} for server {}",
                item.label(),
                self.server
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wikidata_table() {
        let table = PropertyTable::for_server("www.wikidata.org").unwrap();
        assert_eq!(table.property_id(Property::PositionHeld).unwrap(), "P39");
        assert_eq!(table.property_id(Property::ParliamentaryTerm).unwrap(), "P2937");
        assert_eq!(table.item_id(KnownItem::Human).unwrap(), "Q5");
    }

    #[test]
    fn test_localhost_uses_test_wikidata_ids() {
        let local = PropertyTable::for_server("localhost").unwrap();
        let test = PropertyTable::for_server("test.wikidata.org").unwrap();
        for property in Property::ALL {
            assert_eq!(
                local.property_id(property).unwrap(),
                test.property_id(property).unwrap()
            );
        }
    }

    #[test]
    fn test_unknown_server_is_config_error() {
        let err = PropertyTable::for_server("example.org").unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("example.org")));
    }

    #[test]
    fn test_overrides_by_label() {
        let mut props = BTreeMap::new();
        props.insert("reference URL".to_string(), "P1".to_string());
        let table = PropertyTable::for_server("www.wikidata.org")
            .unwrap()
            .with_overrides(&props, &BTreeMap::new())
            .unwrap();
        assert_eq!(table.property_id(Property::ReferenceUrl).unwrap(), "P1");
    }

    #[test]
    fn test_unknown_override_label_rejected() {
        let mut props = BTreeMap::new();
        props.insert("favourite colour".to_string(), "P1".to_string());
        let result = PropertyTable::for_server("www.wikidata.org")
            .unwrap()
            .with_overrides(&props, &BTreeMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_default_api_url_follows_server() {
        let config = TomlConfig {
            server: "test.wikidata.org".to_string(),
            ..TomlConfig::default()
        };
        assert_eq!(config.api_url(), "https://test.wikidata.org/w/api.php");
    }
}
