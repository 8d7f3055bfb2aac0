//! `Catalog` as a local collaborator: classification, vocabulary, product
//! search and stock application against a catalog held in memory.

use chrono::Utc;
use stockrecon_core::{CanonicalFinish, Catalog, Product, SourceFile, SpecVocabulary, StockMovement};

use crate::classify::CatalogClassifier;
use crate::collab::{Classifier, ItemOutcome, ProductCandidate, ProductSearch, StockLedger, UpdateBatch, Vocabulary};
use crate::error::ReconError;
use crate::mapping::MappingStore;
use crate::model::{CanonicalUpdate, ParseResult};

impl Classifier for Catalog {
    fn parse(&self, file: &SourceFile, mappings: &MappingStore) -> Result<ParseResult, ReconError> {
        CatalogClassifier::new(self).parse(file, mappings)
    }
}

impl Vocabulary for Catalog {
    fn list_finishes(&self) -> Result<Vec<CanonicalFinish>, ReconError> {
        Ok(self.effective_finishes())
    }

    fn list_specs(&self) -> Result<SpecVocabulary, ReconError> {
        Ok(self.effective_specs())
    }
}

impl From<&Product> for ProductCandidate {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id,
            product_name: p.name.clone(),
            model: p.model.clone(),
            finish: p.finish.clone(),
            in_house_stock: p.in_house_stock,
            version: Some(p.version),
        }
    }
}

impl ProductSearch for Catalog {
    /// Every whitespace-separated term must appear (case-insensitive) in the
    /// product's name, model or finish. Results are ordered by name.
    fn search_products(&self, query: &str, limit: usize) -> Result<Vec<ProductCandidate>, ReconError> {
        let terms: Vec<String> = query.split_whitespace().map(|t| t.to_lowercase()).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| {
                let haystack = format!("{} {} {}", p.name, p.model, p.finish).to_lowercase();
                terms.iter().all(|t| haystack.contains(t.as_str()))
            })
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(hits.into_iter().take(limit).map(ProductCandidate::from).collect())
    }
}

/// Returns the stock delta the update would record.
fn check(product: Option<&Product>, update: &CanonicalUpdate) -> Result<i64, String> {
    let product = product.ok_or_else(|| "not found".to_string())?;
    match update.expected_version {
        Some(expected) if expected != product.version => Err(format!(
            "version conflict: expected v{expected}, found v{}",
            product.version
        )),
        _ => update
            .new_stock
            .checked_sub(product.in_house_stock)
            .ok_or_else(|| format!("stock change out of range: {} to {}", product.in_house_stock, update.new_stock)),
    }
}

impl StockLedger for Catalog {
    fn apply_batch(&mut self, batch: &UpdateBatch, dry_run: bool) -> Result<Vec<ItemOutcome>, ReconError> {
        let now = Utc::now();
        let mut outcomes = Vec::with_capacity(batch.updates.len());

        for update in &batch.updates {
            let delta = match check(self.product(update.product_id), update) {
                Ok(delta) => delta,
                Err(error) => {
                    outcomes.push(ItemOutcome::Rejected {
                        product_id: update.product_id,
                        error,
                    });
                    continue;
                }
            };

            if !dry_run {
                let mut movement = None;
                if let Some(product) = self.product_mut(update.product_id) {
                    product.in_house_stock = update.new_stock;
                    product.version += 1;
                    movement = Some(StockMovement {
                        product_id: product.id,
                        quantity_change: delta,
                        batch_ref: batch.batch_id.clone(),
                        recorded_at: now,
                    });
                }
                self.movements.extend(movement);
            }
            outcomes.push(ItemOutcome::Applied {
                product_id: update.product_id,
            });
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockrecon_core::ProductId;

    fn product(id: ProductId, name: &str, finish: &str, stock: i64) -> Product {
        Product {
            id,
            name: name.into(),
            model: "RS-7".into(),
            finish: finish.into(),
            width: "8.5".into(),
            pcd: "5x112".into(),
            holes: "5".into(),
            inch: "18".into(),
            in_house_stock: stock,
            version: 1,
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            products: vec![
                product(42, "RS-7 Chrome", "Chrome Glossy", 10),
                product(7, "RS-7 Matte", "Matte Black", 4),
            ],
            ..Catalog::default()
        }
    }

    fn update(product_id: ProductId, new_stock: i64, expected_version: Option<u64>) -> CanonicalUpdate {
        CanonicalUpdate {
            product_id,
            product_name: String::new(),
            old_stock: 0,
            new_stock,
            difference: 0,
            is_manual_match: false,
            expected_version,
            entry_ids: Vec::new(),
        }
    }

    fn batch(updates: Vec<CanonicalUpdate>) -> UpdateBatch {
        UpdateBatch {
            batch_id: "recon-test".into(),
            updates,
        }
    }

    #[test]
    fn search_matches_all_terms() {
        let cat = catalog();
        let hits = cat.search_products("rs-7 CHROME", 20).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].product_id, 42);
        assert_eq!(hits[0].version, Some(1));

        let hits = cat.search_products("rs-7", 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].product_name, "RS-7 Chrome");
    }

    #[test]
    fn apply_sets_stock_and_records_movement() {
        let mut cat = catalog();
        let out = cat.apply_batch(&batch(vec![update(42, 15, Some(1))]), false).unwrap();
        assert_eq!(out, vec![ItemOutcome::Applied { product_id: 42 }]);
        let p = cat.product(42).unwrap();
        assert_eq!((p.in_house_stock, p.version), (15, 2));
        assert_eq!(cat.movements.len(), 1);
        assert_eq!(cat.movements[0].quantity_change, 5);
        assert_eq!(cat.movements[0].batch_ref, "recon-test");
    }

    #[test]
    fn unknown_product_rejected_others_applied() {
        let mut cat = catalog();
        let out = cat
            .apply_batch(&batch(vec![update(42, 15, None), update(99, 1, None), update(7, 6, None)]), false)
            .unwrap();
        assert_eq!(
            out[1],
            ItemOutcome::Rejected { product_id: 99, error: "not found".into() }
        );
        assert_eq!(cat.product(7).unwrap().in_house_stock, 6);
        assert_eq!(cat.movements.len(), 2);
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let mut cat = catalog();
        cat.product_mut(42).unwrap().version = 3;
        let out = cat.apply_batch(&batch(vec![update(42, 15, Some(1))]), false).unwrap();
        assert_eq!(
            out,
            vec![ItemOutcome::Rejected {
                product_id: 42,
                error: "version conflict: expected v1, found v3".into()
            }]
        );
        assert_eq!(cat.product(42).unwrap().in_house_stock, 10);
    }

    #[test]
    fn out_of_range_delta_fails_alone() {
        let mut cat = catalog();
        cat.product_mut(7).unwrap().in_house_stock = -2;
        let out = cat
            .apply_batch(&batch(vec![update(7, i64::MAX, None), update(42, 15, None)]), false)
            .unwrap();
        assert!(matches!(&out[0], ItemOutcome::Rejected { error, .. } if error.contains("out of range")));
        assert_eq!(out[1], ItemOutcome::Applied { product_id: 42 });
        assert_eq!(cat.product(7).unwrap().in_house_stock, -2);
        assert_eq!(cat.movements.len(), 1);
    }

    #[test]
    fn dry_run_checks_without_mutating() {
        let mut cat = catalog();
        let before = cat.clone();
        let out = cat
            .apply_batch(&batch(vec![update(42, 15, Some(1)), update(99, 1, None)]), true)
            .unwrap();
        assert!(matches!(out[0], ItemOutcome::Applied { .. }));
        assert!(matches!(out[1], ItemOutcome::Rejected { .. }));
        assert_eq!(cat, before);
    }

    #[test]
    fn vocabulary_includes_product_values() {
        let cat = catalog();
        let finishes = cat.list_finishes().unwrap();
        assert_eq!(finishes.len(), 2);
        assert_eq!(cat.list_specs().unwrap().widths, vec!["8.5".to_string()]);
    }
}
