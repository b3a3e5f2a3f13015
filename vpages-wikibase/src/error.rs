//! Knowledge-base client and reconciliation errors
//!
//! Conflict variants carry the claim, property and both values so an operator can resolve the
//! clash by hand. Nothing here is retried automatically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WikibaseError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Error payload returned by the API (often with HTTP 200)
    #[error("Error from the API [{code}] {info}")]
    Api { code: String, info: String },

    /// Response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Creating the bare claim failed; nothing else was written
    #[error("Creating the new claim on {entity} failed: {reason}")]
    ClaimCreationFailed { entity: String, reason: String },

    /// The claim to update is not on the entity
    #[error("Claim {0} not found")]
    ClaimNotFound(String),

    /// Existing qualifier holds a different value
    #[error("The existing {property} qualifier on {claim} was {existing} but should be {wanted}")]
    QualifierConflict {
        claim: String,
        property: String,
        existing: String,
        wanted: String,
    },

    #[error("Multiple existing {property} qualifiers found on {claim}")]
    MultipleQualifiers { claim: String, property: String },

    #[error("Unexpected snaktype {snaktype} found on the {property} qualifier of {claim}")]
    UnexpectedSnakType {
        claim: String,
        property: String,
        snaktype: String,
    },

    #[error("Unexpected datavalue type {found} found on the {property} qualifier of {claim} (expected {expected})")]
    UnexpectedDatavalueType {
        claim: String,
        property: String,
        found: String,
        expected: String,
    },

    /// None of the known reference URL properties is in the wanted references
    #[error("Couldn't find a reference property in {0:?}")]
    MissingReferenceProperty(Vec<String>),

    /// Latest-revision lookup found no page with the title
    #[error("No revision found for {0}")]
    RevisionNotFound(String),

    /// Property table or invalid input
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<vpages_common::Error> for WikibaseError {
    fn from(e: vpages_common::Error) -> Self {
        WikibaseError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WikibaseError>;
