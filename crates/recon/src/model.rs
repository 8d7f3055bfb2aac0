use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockrecon_core::{Attribute, Dimension, EntryId, ProductId, StockRow};

// ---------------------------------------------------------------------------
// Session stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Review,
    Preview,
    Complete,
}

impl Default for Stage {
    fn default() -> Self {
        Self::Upload
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Review => write!(f, "review"),
            Self::Preview => write!(f, "preview"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification buckets
// ---------------------------------------------------------------------------

/// A row resolved to exactly one canonical product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedEntry {
    pub entry_id: EntryId,
    pub row: StockRow,
    pub product_id: ProductId,
    pub product_name: String,
    pub in_house_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// Filed under the bucket of this attribute.
    Missing { attribute: Attribute },
    /// Every attribute resolved but no product carries that combination.
    NoProduct,
    /// Every attribute resolved and several products carry that combination.
    Ambiguous { candidates: Vec<ProductId> },
}

/// A row the classifier could not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedEntry {
    pub entry_id: EntryId,
    pub row: StockRow,
    pub reason: UnmatchedReason,
    /// Every attribute that failed to resolve, in filing priority order.
    pub missing: Vec<Attribute>,
}

/// Rows filed under one dimension bucket that share the same raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingValue {
    pub excel_value: String,
    pub count: usize,
    pub entries: Vec<UnmatchedEntry>,
}

/// Collaborator-computed change for a matched product whose counted
/// quantity differs from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularUpdate {
    pub product_id: ProductId,
    pub product_name: String,
    pub old_stock: i64,
    pub excel_qty: i64,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub entry_ids: Vec<EntryId>,
}

/// Immutable snapshot returned by a classifier for a `(file, mappings)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseResult {
    pub total_rows: usize,
    pub matched: Vec<MatchedEntry>,
    pub not_matched: Vec<UnmatchedEntry>,
    pub missing_models: Vec<UnmatchedEntry>,
    pub missing_inches: Vec<UnmatchedEntry>,
    pub missing_finishes: Vec<MissingValue>,
    pub missing_widths: Vec<MissingValue>,
    pub missing_pcds: Vec<MissingValue>,
    pub missing_holes: Vec<MissingValue>,
    pub updates: Vec<RegularUpdate>,
    pub no_change: Vec<MatchedEntry>,
}

impl ParseResult {
    pub fn missing(&self, dim: Dimension) -> &[MissingValue] {
        match dim {
            Dimension::Finish => &self.missing_finishes,
            Dimension::Width => &self.missing_widths,
            Dimension::Pcd => &self.missing_pcds,
            Dimension::Holes => &self.missing_holes,
        }
    }

    pub fn missing_mut(&mut self, dim: Dimension) -> &mut Vec<MissingValue> {
        match dim {
            Dimension::Finish => &mut self.missing_finishes,
            Dimension::Width => &mut self.missing_widths,
            Dimension::Pcd => &mut self.missing_pcds,
            Dimension::Holes => &mut self.missing_holes,
        }
    }

    /// Occurrence count of `excel_value` in a dimension bucket (0 if absent).
    pub fn missing_count(&self, dim: Dimension, excel_value: &str) -> usize {
        self.missing(dim)
            .iter()
            .find(|m| m.excel_value == excel_value)
            .map(|m| m.count)
            .unwrap_or(0)
    }

    /// Rows filed under any dimension bucket.
    pub fn dimension_row_count(&self) -> usize {
        Dimension::ALL
            .iter()
            .flat_map(|d| self.missing(*d))
            .map(|m| m.count)
            .sum()
    }

    /// Sum of rows across all top-level buckets.
    pub fn bucket_row_total(&self) -> usize {
        self.matched.len()
            + self.not_matched.len()
            + self.missing_models.len()
            + self.missing_inches.len()
            + self.dimension_row_count()
    }

    /// Every row is filed under exactly one top-level bucket.
    pub fn is_partition_complete(&self) -> bool {
        if self.bucket_row_total() != self.total_rows {
            return false;
        }
        let mut seen = std::collections::HashSet::new();
        self.matched
            .iter()
            .map(|m| &m.entry_id)
            .chain(self.unresolved().map(|u| &u.entry_id))
            .all(|id| seen.insert(id))
    }

    /// Every row that did not resolve to a product, across all buckets.
    pub fn unresolved(&self) -> impl Iterator<Item = &UnmatchedEntry> {
        self.not_matched
            .iter()
            .chain(self.missing_models.iter())
            .chain(self.missing_inches.iter())
            .chain(
                Dimension::ALL
                    .into_iter()
                    .flat_map(move |d| self.missing(d).iter())
                    .flat_map(|m| m.entries.iter()),
            )
    }

    pub fn unresolved_entry(&self, entry_id: &str) -> Option<&UnmatchedEntry> {
        self.unresolved().find(|u| u.entry_id == entry_id)
    }

    pub fn is_matched(&self, entry_id: &str) -> bool {
        self.matched.iter().any(|m| m.entry_id == entry_id)
    }
}

// ---------------------------------------------------------------------------
// Manual matches + canonical updates
// ---------------------------------------------------------------------------

/// User-selected fallback product for an unresolved row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMatch {
    pub entry_id: EntryId,
    pub product_id: ProductId,
    pub product_name: String,
    pub in_house_stock: i64,
    pub excel_qty: i64,
    #[serde(default)]
    pub version: Option<u64>,
}

/// Final deduplicated stock-change instruction for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalUpdate {
    pub product_id: ProductId,
    pub product_name: String,
    pub old_stock: i64,
    pub new_stock: i64,
    pub difference: i64,
    pub is_manual_match: bool,
    /// Product version seen at preview time; the ledger rejects the item if it moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_ids: Vec<EntryId>,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub product_id: ProductId,
    pub product_name: String,
    pub error: String,
}

/// Outcome of one executed batch. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub batch_id: String,
    pub dry_run: bool,
    pub success_count: usize,
    pub error_count: usize,
    pub total_processed: usize,
    pub errors: Vec<ItemError>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn is_partial(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_for(&self, product_id: ProductId) -> Option<&ItemError> {
        self.errors.iter().find(|e| e.product_id == product_id)
    }
}
