//! Merge/diff: folds regular updates and manual matches into one canonical
//! update per product.
//!
//! How a quantity turns into a new stock level is an explicit per-change
//! parameter (`StockSemantics`). By default regular updates replace the stock
//! with the counted quantity and manual matches add to it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stockrecon_core::{EntryId, ProductId};

use crate::error::ReconError;
use crate::model::{CanonicalUpdate, ManualMatch, RegularUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSemantics {
    /// new = qty, difference = qty - base
    Replace,
    /// new = base + qty, difference = qty
    Additive,
}

impl StockSemantics {
    /// Returns `(new_stock, difference)`, or `None` on overflow.
    pub fn apply(self, base: i64, qty: i64) -> Option<(i64, i64)> {
        match self {
            Self::Replace => Some((qty, qty.checked_sub(base)?)),
            Self::Additive => Some((base.checked_add(qty)?, qty)),
        }
    }
}

impl std::fmt::Display for StockSemantics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Additive => write!(f, "additive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    pub regular: StockSemantics,
    pub manual: StockSemantics,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            regular: StockSemantics::Replace,
            manual: StockSemantics::Additive,
        }
    }
}

/// One pending stock change with its semantics made explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub product_name: String,
    pub base_stock: i64,
    pub quantity: i64,
    pub semantics: StockSemantics,
    pub is_manual_match: bool,
    pub version: Option<u64>,
    pub entry_ids: Vec<EntryId>,
}

impl StockChange {
    pub fn from_regular(update: &RegularUpdate, semantics: StockSemantics) -> Self {
        Self {
            product_id: update.product_id,
            product_name: update.product_name.clone(),
            base_stock: update.old_stock,
            quantity: update.excel_qty,
            semantics,
            is_manual_match: false,
            version: update.version,
            entry_ids: update.entry_ids.clone(),
        }
    }

    pub fn from_manual(m: &ManualMatch, semantics: StockSemantics) -> Self {
        Self {
            product_id: m.product_id,
            product_name: m.product_name.clone(),
            base_stock: m.in_house_stock,
            quantity: m.excel_qty,
            semantics,
            is_manual_match: true,
            version: m.version,
            entry_ids: vec![m.entry_id.clone()],
        }
    }

    pub fn new_stock(&self) -> Option<i64> {
        self.semantics.apply(self.base_stock, self.quantity).map(|(new, _)| new)
    }

    pub fn difference(&self) -> Option<i64> {
        self.semantics.apply(self.base_stock, self.quantity).map(|(_, diff)| diff)
    }

    fn overflow(&self) -> ReconError {
        ReconError::ParseFailure(format!(
            "stock change for product {} ({}) is out of range",
            self.product_id,
            self.entry_ids.join(", ")
        ))
    }

    fn into_canonical(self) -> Result<CanonicalUpdate, ReconError> {
        let (new_stock, difference) = self
            .semantics
            .apply(self.base_stock, self.quantity)
            .ok_or_else(|| self.overflow())?;
        Ok(CanonicalUpdate {
            product_id: self.product_id,
            product_name: self.product_name,
            old_stock: self.base_stock,
            new_stock,
            difference,
            is_manual_match: self.is_manual_match,
            expected_version: self.version,
            entry_ids: self.entry_ids,
        })
    }
}

/// Fold a change into the map: insert when the product is new, otherwise add
/// its difference to the existing entry (old stock and version are kept).
fn fold(map: &mut BTreeMap<ProductId, CanonicalUpdate>, change: StockChange) -> Result<(), ReconError> {
    match map.get_mut(&change.product_id) {
        Some(existing) => {
            let sums = change.difference().and_then(|diff| {
                Some((existing.new_stock.checked_add(diff)?, existing.difference.checked_add(diff)?, diff))
            });
            let Some((new_stock, difference, diff)) = sums else {
                return Err(change.overflow());
            };
            log::debug!(
                "merging {} into product {} ({:+})",
                change.entry_ids.join(","),
                change.product_id,
                diff
            );
            existing.new_stock = new_stock;
            existing.difference = difference;
            existing.entry_ids.extend(change.entry_ids);
        }
        None => {
            map.insert(change.product_id, change.into_canonical()?);
        }
    }
    Ok(())
}

/// Build the canonical update set, one entry per product, sorted by product id.
///
/// Manual matches are folded in entry id order, so the output does not depend
/// on the order they were registered in. Stock arithmetic that leaves the
/// `i64` range is a `ParseFailure`.
pub fn merge<'a>(
    regular: &[RegularUpdate],
    manual: impl IntoIterator<Item = &'a ManualMatch>,
    policy: &MergePolicy,
) -> Result<Vec<CanonicalUpdate>, ReconError> {
    let mut map: BTreeMap<ProductId, CanonicalUpdate> = BTreeMap::new();

    for update in regular {
        fold(&mut map, StockChange::from_regular(update, policy.regular))?;
    }

    let mut manual: Vec<&ManualMatch> = manual.into_iter().collect();
    manual.sort_by(|a, b| {
        (&a.entry_id, a.product_id, a.excel_qty, a.in_house_stock)
            .cmp(&(&b.entry_id, b.product_id, b.excel_qty, b.in_house_stock))
    });
    for m in manual {
        fold(&mut map, StockChange::from_manual(m, policy.manual))?;
    }

    Ok(map.into_values().collect())
}
