//! Classification errors
//!
//! Every variant is fatal for the page being classified: a statement is never given a type
//! computed from partial data.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Network communication with the record store failed
    #[error("Network error: {0}")]
    Network(String),

    /// Record store answered with a non-success status
    #[error("Query failed with status {status}: {body}")]
    Query { status: u16, body: String },

    /// Record store response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// An item referenced by the page or a statement was not returned by the record store
    #[error("No item data for {0}")]
    MissingItemData(String),

    /// Identifier that is not a well-formed item id
    #[error("Invalid item identifier: {0}")]
    InvalidIdentifier(String),

    /// The page's parliamentary term is unknown to the record store
    #[error("Unknown parliamentary term {0}")]
    UnknownTerm(String),

    /// Property table or endpoint configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Page repository failure
    #[error(transparent)]
    Repository(#[from] vpages_common::Error),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
