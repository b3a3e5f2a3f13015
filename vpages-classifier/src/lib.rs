//! # vpages Classifier
//!
//! Assigns each statement on a verification page one of eight workflow states by comparing it
//! with the claims already present in the knowledge base.
//!
//! - [`record_store`]: read-only record store trait and records
//! - [`sparql`]: query service implementation of the record store
//! - [`comparison`]: membership interval comparator
//! - [`classifier`]: ordered rule table
//! - [`page_classifier`]: page-level orchestration

pub mod classifier;
pub mod comparison;
pub mod error;
pub mod page_classifier;
pub mod record_store;
pub mod sparql;

pub use classifier::DecoratedStatement;
pub use comparison::{CandidateComparison, MembershipComparison, SuggestedMembership};
pub use error::{ClassifierError, Result};
pub use page_classifier::{ClassifiedPage, PageClassifier};
pub use record_store::{ExistingClaimRecord, ItemRecord, RecordStore, TermRecord};
pub use sparql::SparqlRecordStore;
