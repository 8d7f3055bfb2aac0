use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use stockrecon_core::{EntryId, ProductId};

use crate::collab::{ProductCandidate, ProductSearch};
use crate::error::ReconError;
use crate::model::ManualMatch;

/// Product details captured when a user selects a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchData {
    pub product_name: String,
    pub in_house_stock: i64,
    pub excel_qty: i64,
    pub version: Option<u64>,
}

/// The user's fallback selections, one per unresolved entry.
///
/// Holds no catalog data beyond what was captured at selection time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualMatchRegistry {
    matches: BTreeMap<EntryId, ManualMatch>,
}

impl ManualMatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the match for `entry_id`.
    ///
    /// `product_id == None` is the removal signal, not a match to nothing.
    /// Returns the match that was replaced or removed.
    pub fn set_match(
        &mut self,
        entry_id: impl Into<EntryId>,
        product_id: Option<ProductId>,
        data: MatchData,
    ) -> Option<ManualMatch> {
        let entry_id = entry_id.into();
        let Some(product_id) = product_id else {
            return self.remove_match(&entry_id);
        };
        log::debug!("manual match {entry_id} -> product {product_id}");
        self.matches.insert(
            entry_id.clone(),
            ManualMatch {
                entry_id,
                product_id,
                product_name: data.product_name,
                in_house_stock: data.in_house_stock,
                excel_qty: data.excel_qty,
                version: data.version,
            },
        )
    }

    pub fn from_candidate(
        &mut self,
        entry_id: impl Into<EntryId>,
        candidate: &ProductCandidate,
        excel_qty: i64,
    ) -> Option<ManualMatch> {
        self.set_match(
            entry_id,
            Some(candidate.product_id),
            MatchData {
                product_name: candidate.product_name.clone(),
                in_house_stock: candidate.in_house_stock,
                excel_qty,
                version: candidate.version,
            },
        )
    }

    pub fn remove_match(&mut self, entry_id: &str) -> Option<ManualMatch> {
        let removed = self.matches.remove(entry_id);
        if removed.is_some() {
            log::debug!("manual match {entry_id} cleared");
        }
        removed
    }

    pub fn get(&self, entry_id: &str) -> Option<&ManualMatch> {
        self.matches.get(entry_id)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Matches in ascending entry id order.
    pub fn iter(&self) -> impl Iterator<Item = &ManualMatch> {
        self.matches.values()
    }

    pub fn clear(&mut self) {
        self.matches.clear();
    }

    /// Drop every match whose entry id fails `keep`. Returns the dropped matches.
    pub fn retain(&mut self, mut keep: impl FnMut(&ManualMatch) -> bool) -> Vec<ManualMatch> {
        let dropped: Vec<EntryId> = self
            .matches
            .values()
            .filter(|m| !keep(*m))
            .map(|m| m.entry_id.clone())
            .collect();
        dropped
            .iter()
            .filter_map(|id| self.matches.remove(id))
            .collect()
    }

    /// Search candidates for a manual match.
    ///
    /// Queries shorter than the policy minimum return nothing without
    /// reaching the collaborator. Failures leave the registry untouched.
    pub fn search(
        &self,
        search: &dyn ProductSearch,
        query: &str,
        policy: &SearchPolicy,
    ) -> Result<Vec<ProductCandidate>, ReconError> {
        let query = query.trim();
        if query.chars().count() < policy.min_query_len {
            return Ok(Vec::new());
        }
        search.search_products(query, policy.limit).map_err(|e| match e {
            ReconError::SearchFailure(_) => e,
            other => ReconError::SearchFailure(other.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Search policy + debounce
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPolicy {
    pub min_query_len: usize,
    pub limit: usize,
    /// Typing pause before a query is sent. Only interactive clients read
    /// this, through `SearchDebouncer::from_policy`; one-shot searches ignore it.
    pub debounce: Duration,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            limit: 20,
            debounce: Duration::from_millis(300),
        }
    }
}

/// Holds back search queries until typing pauses for the debounce interval.
///
/// Only the latest query is ever released; intermediate keystrokes are dropped.
/// This is the search-as-you-type hook for interactive front ends: feed it
/// keystrokes, poll it on a timer, and pass what it releases to
/// `ManualMatchRegistry::search`. The CLI searches once per invocation and
/// does not use it.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    debounce: Duration,
    pending: Option<(String, Instant)>,
}

impl SearchDebouncer {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce, pending: None }
    }

    pub fn from_policy(policy: &SearchPolicy) -> Self {
        Self::new(policy.debounce)
    }

    /// Record a keystroke; restarts the debounce interval.
    pub fn input(&mut self, query: impl Into<String>, now: Instant) {
        self.pending = Some((query.into(), now));
    }

    /// Release the pending query if the interval has elapsed since the last input.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let ready = matches!(
            &self.pending,
            Some((_, since)) if now.saturating_duration_since(*since) >= self.debounce
        );
        if ready {
            self.pending.take().map(|(q, _)| q)
        } else {
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
