//! # vpages Wikibase
//!
//! Writes verified statements back to the knowledge base.
//!
//! - [`api`]: Action API client and the [`KnowledgeBase`] primitives
//! - [`reconcile`]: claim create/update pipeline with revision chaining
//! - [`claim_data`]: claim data for a statement on a page
//! - [`search`]: concurrent person search with sitelink enrichment
//! - [`entity`]: new item creation

pub mod api;
pub mod claim_data;
pub mod claims;
pub mod datavalue;
pub mod entity;
pub mod error;
pub mod reconcile;
pub mod search;

pub use api::{ClientConfig, KnowledgeBase, Revision, WikibaseClient};
pub use claim_data::{claim_data_for, ExistingClaim};
pub use datavalue::DataValue;
pub use error::{Result, WikibaseError};
pub use reconcile::{BatchOutcome, ClaimData, ClaimOutcome, ClaimReconciler};
pub use search::SearchResults;
