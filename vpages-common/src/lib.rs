//! # vpages Common Library
//!
//! Shared code for the verification pages workspace:
//! - Statement, page and history records
//! - Configuration loading and the per-server property table
//! - Tracing setup
//! - CSV normalization
//! - SQLite persistence
//! - Suggestion export statistics

pub mod config;
pub mod dates;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod repository;
pub mod statistics;

pub use config::{KnownItem, Property, PropertyTable};
pub use error::{Error, Result};
pub use model::{Page, Reconciliation, ResourceType, Statement, StatementType, Verification};
