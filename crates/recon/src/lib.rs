//! `stockrecon-recon`: stock count reconciliation engine.
//!
//! Pure engine crate: receives parsed rows and a catalog through collaborator
//! traits, returns classification buckets, canonical updates and execution
//! results. No CLI or file I/O dependencies.

pub mod aggregate;
pub mod catalog;
pub mod classify;
pub mod collab;
pub mod config;
pub mod error;
pub mod execute;
pub mod manual;
pub mod mapping;
pub mod merge;
pub mod model;
pub mod session;
pub mod summary;

pub use classify::CatalogClassifier;
pub use collab::{Classifier, ItemOutcome, ProductCandidate, ProductSearch, StockLedger, UpdateBatch, Vocabulary};
pub use config::JobConfig;
pub use error::ReconError;
pub use execute::{execute, ExecuteOptions};
pub use manual::{ManualMatchRegistry, MatchData, SearchDebouncer, SearchPolicy};
pub use mapping::MappingStore;
pub use merge::{merge, MergePolicy, StockSemantics};
pub use model::{CanonicalUpdate, ExecutionResult, ManualMatch, ParseResult, Stage};
pub use session::{RecalcOutcome, RecalcTicket, ReconciliationSession};
