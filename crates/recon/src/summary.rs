use std::collections::BTreeMap;

use serde::Serialize;
use stockrecon_core::Dimension;

use crate::model::{CanonicalUpdate, ParseResult, UnmatchedReason};

/// Row counts per classification bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub total_rows: usize,
    pub matched: usize,
    pub no_product: usize,
    pub ambiguous: usize,
    pub missing_models: usize,
    pub missing_inches: usize,
    /// Rows per dimension bucket, keyed by dimension name.
    pub missing_dimensions: BTreeMap<String, usize>,
    /// Distinct unresolved raw values per dimension.
    pub distinct_values: BTreeMap<String, usize>,
    pub updates: usize,
    pub no_change: usize,
}

impl ParseSummary {
    pub fn unresolved(&self) -> usize {
        self.total_rows.saturating_sub(self.matched)
    }
}

pub fn compute_summary(result: &ParseResult) -> ParseSummary {
    let mut summary = ParseSummary {
        total_rows: result.total_rows,
        matched: result.matched.len(),
        missing_models: result.missing_models.len(),
        missing_inches: result.missing_inches.len(),
        updates: result.updates.len(),
        no_change: result.no_change.len(),
        ..ParseSummary::default()
    };

    for entry in &result.not_matched {
        match entry.reason {
            UnmatchedReason::Ambiguous { .. } => summary.ambiguous += 1,
            _ => summary.no_product += 1,
        }
    }

    for dim in Dimension::ALL {
        let buckets = result.missing(dim);
        if buckets.is_empty() {
            continue;
        }
        let rows = buckets.iter().map(|m| m.count).sum();
        summary.missing_dimensions.insert(dim.to_string(), rows);
        summary.distinct_values.insert(dim.to_string(), buckets.len());
    }

    summary
}

/// Totals over a canonical update set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub products: usize,
    pub manual_only: usize,
    pub net_difference: i64,
    pub increases: usize,
    pub decreases: usize,
}

pub fn summarize_updates(updates: &[CanonicalUpdate]) -> UpdateSummary {
    UpdateSummary {
        products: updates.len(),
        manual_only: updates.iter().filter(|u| u.is_manual_match).count(),
        net_difference: updates.iter().fold(0i64, |acc, u| acc.saturating_add(u.difference)),
        increases: updates.iter().filter(|u| u.difference > 0).count(),
        decreases: updates.iter().filter(|u| u.difference < 0).count(),
    }
}
