//! Boundaries to the collaborators the pipeline depends on.
//!
//! The engine only talks to classification, vocabulary, search and stock
//! application through these traits. `Catalog` implements all of them for
//! local runs; tests plug in fakes.

use serde::{Deserialize, Serialize};
use stockrecon_core::{CanonicalFinish, ProductId, SourceFile, SpecVocabulary};

use crate::error::ReconError;
use crate::mapping::MappingStore;
use crate::model::{CanonicalUpdate, ParseResult};

/// Partitions uploaded rows into classification buckets.
pub trait Classifier {
    /// Full parse of a fresh upload.
    fn parse(&self, file: &SourceFile, mappings: &MappingStore) -> Result<ParseResult, ReconError>;

    /// Re-parse with updated mappings. Same shape as `parse`.
    fn preview(&self, file: &SourceFile, mappings: &MappingStore) -> Result<ParseResult, ReconError> {
        self.parse(file, mappings)
    }
}

/// Canonical values offered when building a mapping.
pub trait Vocabulary {
    fn list_finishes(&self) -> Result<Vec<CanonicalFinish>, ReconError>;
    fn list_specs(&self) -> Result<SpecVocabulary, ReconError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCandidate {
    pub product_id: ProductId,
    pub product_name: String,
    pub model: String,
    pub finish: String,
    pub in_house_stock: i64,
    #[serde(default)]
    pub version: Option<u64>,
}

/// Product lookup for manual matching.
pub trait ProductSearch {
    fn search_products(&self, query: &str, limit: usize) -> Result<Vec<ProductCandidate>, ReconError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateBatch {
    pub batch_id: String,
    pub updates: Vec<CanonicalUpdate>,
}

/// Per-item result reported by a ledger, one per submitted update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Applied { product_id: ProductId },
    Rejected { product_id: ProductId, error: String },
}

impl ItemOutcome {
    pub fn product_id(&self) -> ProductId {
        match self {
            Self::Applied { product_id } | Self::Rejected { product_id, .. } => *product_id,
        }
    }
}

/// Applies stock updates, each item independently of the others.
///
/// A successful non-dry-run item must also be recorded as a stock movement
/// referencing `batch.batch_id`. `Err` means the batch as a whole was not
/// processed.
pub trait StockLedger {
    fn apply_batch(&mut self, batch: &UpdateBatch, dry_run: bool) -> Result<Vec<ItemOutcome>, ReconError>;
}
