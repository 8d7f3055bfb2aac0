use std::collections::BTreeMap;

use stockrecon_core::{EntryId, ProductId};

use crate::error::ReconError;
use crate::model::{MatchedEntry, RegularUpdate};

/// Counted quantity for one product, summed over every row matched to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCount {
    pub product_id: ProductId,
    pub product_name: String,
    pub in_house_stock: i64,
    pub excel_qty: i64,
    pub entry_ids: Vec<EntryId>,
}

impl ProductCount {
    pub fn has_change(&self) -> bool {
        self.excel_qty != self.in_house_stock
    }

    pub fn into_update(self, version: Option<u64>) -> RegularUpdate {
        RegularUpdate {
            product_id: self.product_id,
            product_name: self.product_name,
            old_stock: self.in_house_stock,
            excel_qty: self.excel_qty,
            version,
            entry_ids: self.entry_ids,
        }
    }
}

/// Group matched rows by product, sum quantities, keep row ids in sheet order.
///
/// A per-product total outside the `i64` range is a `ParseFailure`.
pub fn aggregate_by_product(matched: &[MatchedEntry]) -> Result<Vec<ProductCount>, ReconError> {
    let mut groups: BTreeMap<ProductId, ProductCount> = BTreeMap::new();

    for m in matched {
        let entry = groups.entry(m.product_id).or_insert_with(|| ProductCount {
            product_id: m.product_id,
            product_name: m.product_name.clone(),
            in_house_stock: m.in_house_stock,
            excel_qty: 0,
            entry_ids: Vec::new(),
        });
        entry.excel_qty = entry.excel_qty.checked_add(m.row.qty).ok_or_else(|| {
            ReconError::ParseFailure(format!(
                "counted total for product {} overflows at {}",
                m.product_id, m.entry_id
            ))
        })?;
        entry.entry_ids.push(m.entry_id.clone());
    }

    Ok(groups.into_values().collect())
}
