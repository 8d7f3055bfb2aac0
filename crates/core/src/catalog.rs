use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProductId;

/// A stockable catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub model: String,
    pub finish: String,
    pub width: String,
    pub pcd: String,
    pub holes: String,
    pub inch: String,
    pub in_house_stock: i64,
    /// Bumped on every stock mutation; used as the concurrency token.
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalFinish {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecVocabulary {
    pub widths: Vec<String>,
    pub pcds: Vec<String>,
    pub holes: Vec<String>,
    pub inches: Vec<String>,
}

/// Audit record written for every applied stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product_id: ProductId,
    pub quantity_change: i64,
    /// Reconciliation batch that produced this movement.
    pub batch_ref: String,
    pub recorded_at: DateTime<Utc>,
}

/// Persisted catalog: products plus the vocabulary used for mappings.
///
/// `finishes` and `specs` may be left empty in the file; the effective
/// vocabulary always includes the values that appear on products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub finishes: Vec<CanonicalFinish>,
    pub specs: SpecVocabulary,
    pub products: Vec<Product>,
    pub movements: Vec<StockMovement>,
}

impl Catalog {
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn product_mut(&mut self, id: ProductId) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    /// Explicit finishes plus any finish name used by a product, by name.
    ///
    /// A product finish that names a declared finish id refers to that
    /// finish and adds nothing.
    pub fn effective_finishes(&self) -> Vec<CanonicalFinish> {
        let mut out = self.finishes.clone();
        let ids: BTreeSet<&str> = self.finishes.iter().map(|f| f.id.trim()).collect();
        let mut known: BTreeSet<String> = out.iter().map(|f| f.name.to_lowercase()).collect();
        for p in &self.products {
            let finish = p.finish.trim();
            if finish.is_empty() || ids.contains(finish) {
                continue;
            }
            if known.insert(finish.to_lowercase()) {
                out.push(CanonicalFinish {
                    id: p.finish.clone(),
                    name: p.finish.clone(),
                });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Explicit spec lists merged with the values products use, deduplicated and sorted.
    pub fn effective_specs(&self) -> SpecVocabulary {
        fn merge<'a>(explicit: &'a [String], used: impl Iterator<Item = &'a str>) -> Vec<String> {
            let set: BTreeSet<String> = explicit
                .iter()
                .map(|s| s.as_str())
                .chain(used)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            set.into_iter().collect()
        }

        SpecVocabulary {
            widths: merge(&self.specs.widths, self.products.iter().map(|p| p.width.as_str())),
            pcds: merge(&self.specs.pcds, self.products.iter().map(|p| p.pcd.as_str())),
            holes: merge(&self.specs.holes, self.products.iter().map(|p| p.holes.as_str())),
            inches: merge(&self.specs.inches, self.products.iter().map(|p| p.inch.as_str())),
        }
    }

    pub fn models(&self) -> BTreeSet<&str> {
        self.products.iter().map(|p| p.model.as_str()).collect()
    }
}
