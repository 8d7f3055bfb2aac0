// Property-based tests for classification, merge and execution accounting.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeMap;

use proptest::prelude::*;
use stockrecon_core::{Catalog, CanonicalFinish, Product, ProductId, SourceFile, StockRow};
use stockrecon_recon::model::RegularUpdate;
use stockrecon_recon::{
    execute, merge, CanonicalUpdate, Classifier, ExecuteOptions, ItemOutcome, ManualMatch, MappingStore,
    MergePolicy, ReconError, StockLedger, UpdateBatch,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Fixtures + generators
// ---------------------------------------------------------------------------

fn product(id: ProductId, model: &str, finish: &str, width: &str, inch: &str) -> Product {
    Product {
        id,
        name: format!("{model} {inch}x{width} {finish}"),
        model: model.into(),
        finish: finish.into(),
        width: width.into(),
        pcd: "5x112".into(),
        holes: "5".into(),
        inch: inch.into(),
        in_house_stock: 5,
        version: 1,
    }
}

/// Small catalog with one deliberately ambiguous combination (ids 3 and 4).
fn catalog() -> Catalog {
    Catalog {
        finishes: vec![CanonicalFinish { id: "F-CG".into(), name: "Chrome Glossy".into() }],
        products: vec![
            product(1, "RS-7", "Chrome Glossy", "8.5", "18"),
            product(2, "RS-7", "Matte Black", "8.5", "18"),
            product(3, "GT-2", "Silver", "7", "17"),
            product(4, "GT-2", "Silver", "7", "17"),
            product(5, "GT-2", "Matte Black", "8.5", "17"),
        ],
        ..Catalog::default()
    }
}

/// Attribute values drawn from a mix of known, equivalent and unknown spellings.
fn arb_row() -> impl Strategy<Value = (String, String, String, String, String, String, i64)> {
    (
        prop::sample::select(vec!["RS-7", "GT-2", "rs-7", "XX-9", ""]),
        prop::sample::select(vec!["Chrome Glossy", "F-CG", "Matte Black", "Silver", "CHROME-X", ""]),
        prop::sample::select(vec!["8.5", "8.50", "7", "9", "x"]),
        prop::sample::select(vec!["5x112", "4x100"]),
        prop::sample::select(vec!["5", "4"]),
        prop::sample::select(vec!["18", "17", "R18", "19", ""]),
        0i64..50,
    )
        .prop_map(|(m, f, w, p, h, i, q)| {
            (m.to_string(), f.to_string(), w.to_string(), p.to_string(), h.to_string(), i.to_string(), q)
        })
}

fn arb_file() -> impl Strategy<Value = SourceFile> {
    proptest::collection::vec(arb_row(), 1..40).prop_map(|rows| {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, (model, finish, width, pcd, holes, inch, qty))| StockRow {
                entry_id: stockrecon_core::entry_id_for_row(i + 2),
                model,
                finish,
                width,
                pcd,
                holes,
                inch,
                qty,
            })
            .collect();
        SourceFile::new("generated.xlsx", rows)
    })
}

fn arb_mappings() -> impl Strategy<Value = MappingStore> {
    (prop::bool::ANY, prop::bool::ANY).prop_map(|(finish, width)| {
        let mut store = MappingStore::new();
        if finish {
            store.set_mapping(stockrecon_core::Dimension::Finish, "CHROME-X", "Chrome Glossy");
        }
        if width {
            store.set_mapping(stockrecon_core::Dimension::Width, "9", "8.5");
        }
        store
    })
}

/// Regular updates with unique product ids.
fn arb_regular() -> impl Strategy<Value = Vec<RegularUpdate>> {
    proptest::collection::btree_map(0i64..30, (0i64..100, 0i64..100), 0..10).prop_map(|m| {
        m.into_iter()
            .map(|(product_id, (old_stock, excel_qty))| RegularUpdate {
                product_id,
                product_name: format!("P{product_id}"),
                old_stock,
                excel_qty,
                version: Some(1),
                entry_ids: vec![format!("row-{}", product_id + 100)],
            })
            .collect()
    })
}

/// Manual matches with unique entry ids; products may repeat and may
/// overlap with regular updates.
fn arb_manual() -> impl Strategy<Value = Vec<ManualMatch>> {
    proptest::collection::btree_map(2usize..60, (0i64..30, 0i64..100, -5i64..20), 0..12).prop_map(|m| {
        m.into_iter()
            .map(|(row, (product_id, in_house_stock, excel_qty))| ManualMatch {
                entry_id: stockrecon_core::entry_id_for_row(row),
                product_id,
                product_name: format!("P{product_id}"),
                in_house_stock,
                excel_qty,
                version: None,
            })
            .collect()
    })
}

fn stock_map(updates: &[CanonicalUpdate]) -> BTreeMap<ProductId, (i64, i64)> {
    updates
        .iter()
        .map(|u| (u.product_id, (u.new_stock, u.difference)))
        .collect()
}

/// Rejects flagged positions and reports only the first `reported` outcomes.
struct ScriptedLedger {
    reject: Vec<bool>,
    reported: usize,
}

impl StockLedger for ScriptedLedger {
    fn apply_batch(&mut self, batch: &UpdateBatch, _dry_run: bool) -> Result<Vec<ItemOutcome>, ReconError> {
        Ok(batch
            .updates
            .iter()
            .enumerate()
            .take(self.reported)
            .map(|(i, u)| {
                if self.reject.get(i).copied().unwrap_or(false) {
                    ItemOutcome::Rejected { product_id: u.product_id, error: "rejected".into() }
                } else {
                    ItemOutcome::Applied { product_id: u.product_id }
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn every_row_lands_in_exactly_one_bucket(file in arb_file(), mappings in arb_mappings()) {
        let catalog = catalog();
        let result = catalog.parse(&file, &mappings).unwrap();
        prop_assert_eq!(result.total_rows, file.rows.len());
        prop_assert_eq!(result.bucket_row_total(), result.total_rows);
        prop_assert!(result.is_partition_complete());

        // Summed quantities of matched rows are preserved per product.
        let counted: i64 = result.matched.iter().map(|m| m.row.qty).sum();
        let in_updates: i64 = result.updates.iter().map(|u| u.excel_qty).sum();
        let unchanged: i64 = result.no_change.iter().map(|m| m.row.qty).sum();
        prop_assert_eq!(counted, in_updates + unchanged);
    }

    #[test]
    fn manual_order_does_not_change_merge(
        regular in arb_regular(),
        (manual, shuffled) in arb_manual().prop_flat_map(|m| (Just(m.clone()), Just(m).prop_shuffle())),
    ) {
        let policy = MergePolicy::default();
        let a = merge(&regular, manual.iter(), &policy).unwrap();
        let b = merge(&regular, shuffled.iter(), &policy).unwrap();
        prop_assert_eq!(stock_map(&a), stock_map(&b));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn merge_has_one_entry_per_product(regular in arb_regular(), manual in arb_manual()) {
        let out = merge(&regular, manual.iter(), &MergePolicy::default()).unwrap();
        let ids: Vec<ProductId> = out.iter().map(|u| u.product_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(ids, sorted);
    }

    #[test]
    fn merging_no_manual_matches_returns_regular_updates(regular in arb_regular()) {
        let out = merge(&regular, std::iter::empty(), &MergePolicy::default()).unwrap();
        prop_assert_eq!(out.len(), regular.len());
        for (u, r) in out.iter().zip(&regular) {
            prop_assert_eq!(u.product_id, r.product_id);
            prop_assert_eq!(u.old_stock, r.old_stock);
            prop_assert_eq!(u.new_stock, r.excel_qty);
            prop_assert_eq!(u.difference, r.excel_qty - r.old_stock);
            prop_assert!(!u.is_manual_match);
        }
    }

    #[test]
    fn execution_accounts_for_every_update(
        regular in arb_regular(),
        reject in proptest::collection::vec(prop::bool::ANY, 0..12),
        reported in 0usize..12,
    ) {
        let updates = merge(&regular, std::iter::empty(), &MergePolicy::default()).unwrap();
        let mut ledger = ScriptedLedger { reject, reported };
        let result = execute(&mut ledger, &updates, ExecuteOptions::default()).unwrap();
        prop_assert_eq!(result.success_count + result.error_count, result.total_processed);
        prop_assert_eq!(result.total_processed, updates.len());
        prop_assert_eq!(result.errors.len(), result.error_count);
    }
}
