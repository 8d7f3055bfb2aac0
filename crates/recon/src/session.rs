//! One upload-to-execution reconciliation workflow.
//!
//! Stages run `Upload -> Review -> Preview -> Complete`; `reset()` returns to
//! `Upload` from anywhere. Recalculation is split into `begin_recalculate` and
//! `finish_recalculate` so a caller can run the classifier elsewhere; every
//! request carries a generation and only the latest one is ever applied.

use stockrecon_core::{Dimension, EntryId, ProductId, SourceFile};

use crate::collab::{Classifier, ProductCandidate, ProductSearch, StockLedger};
use crate::error::ReconError;
use crate::execute::{execute, ExecuteOptions};
use crate::manual::{ManualMatchRegistry, MatchData, SearchPolicy};
use crate::mapping::MappingStore;
use crate::merge::{merge, MergePolicy};
use crate::model::{CanonicalUpdate, ExecutionResult, ManualMatch, ParseResult, Stage};

/// A pending recalculation request.
#[derive(Debug, Clone)]
pub struct RecalcTicket {
    generation: u64,
    mappings: MappingStore,
}

impl RecalcTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mappings as they were when the request was issued.
    pub fn mappings(&self) -> &MappingStore {
        &self.mappings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcOutcome {
    Applied,
    /// A newer request was issued (or the session was reset); response dropped.
    Stale,
}

#[derive(Debug, Default)]
pub struct ReconciliationSession {
    stage: Stage,
    file: Option<SourceFile>,
    mappings: MappingStore,
    manual: ManualMatchRegistry,
    parse_result: Option<ParseResult>,
    preview: Option<Vec<CanonicalUpdate>>,
    result: Option<ExecutionResult>,
    policy: MergePolicy,
    generation: u64,
}

impl ReconciliationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    fn require(&self, allowed: &[Stage], action: &'static str) -> Result<(), ReconError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(ReconError::WrongStage {
                stage: self.stage,
                action,
            })
        }
    }

    fn transition(&mut self, to: Stage) {
        log::info!("session: {} -> {}", self.stage, to);
        self.stage = to;
    }

    // -- accessors ----------------------------------------------------------

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    pub fn file(&self) -> Option<&SourceFile> {
        self.file.as_ref()
    }

    pub fn mappings(&self) -> &MappingStore {
        &self.mappings
    }

    pub fn manual_matches(&self) -> &ManualMatchRegistry {
        &self.manual
    }

    pub fn parse_result(&self) -> Option<&ParseResult> {
        self.parse_result.as_ref()
    }

    /// The update set frozen on entering Preview.
    pub fn preview_updates(&self) -> Option<&[CanonicalUpdate]> {
        self.preview.as_deref()
    }

    pub fn execution_result(&self) -> Option<&ExecutionResult> {
        self.result.as_ref()
    }

    // -- upload -------------------------------------------------------------

    /// Classify a fresh upload. On failure nothing is stored and the session
    /// stays in Upload.
    pub fn upload(&mut self, file: SourceFile, classifier: &dyn Classifier) -> Result<&ParseResult, ReconError> {
        self.require(&[Stage::Upload], "upload a file")?;
        let parsed = classifier.parse(&file, &self.mappings)?;
        log::info!("uploaded '{}' ({} rows)", file.name, parsed.total_rows);
        self.generation += 1;
        self.file = Some(file);
        self.transition(Stage::Review);
        Ok(self.parse_result.insert(parsed))
    }

    // -- mappings -----------------------------------------------------------

    /// Takes effect on the next recalculation; the current result is kept.
    pub fn set_mapping(
        &mut self,
        dim: Dimension,
        excel_value: impl Into<String>,
        db_value: impl Into<String>,
    ) -> Result<Option<String>, ReconError> {
        self.require(&[Stage::Upload, Stage::Review], "change mappings")?;
        Ok(self.mappings.set_mapping(dim, excel_value, db_value))
    }

    pub fn remove_mapping(&mut self, dim: Dimension, excel_value: &str) -> Result<Option<String>, ReconError> {
        self.require(&[Stage::Upload, Stage::Review], "change mappings")?;
        Ok(self.mappings.remove_mapping(dim, excel_value))
    }

    // -- recalculation ------------------------------------------------------

    /// Issue a recalculation request. Any request issued earlier becomes stale.
    pub fn begin_recalculate(&mut self) -> Result<RecalcTicket, ReconError> {
        self.require(&[Stage::Review], "recalculate")?;
        self.generation += 1;
        log::debug!("recalculation #{} requested", self.generation);
        Ok(RecalcTicket {
            generation: self.generation,
            mappings: self.mappings.clone(),
        })
    }

    /// Apply the classifier's response to `ticket`, unless a newer request
    /// exists. Stale responses are dropped, errors included.
    pub fn finish_recalculate(
        &mut self,
        ticket: RecalcTicket,
        response: Result<ParseResult, ReconError>,
    ) -> Result<RecalcOutcome, ReconError> {
        if ticket.generation != self.generation || self.stage != Stage::Review {
            log::warn!(
                "discarding recalculation #{} (latest is #{})",
                ticket.generation,
                self.generation
            );
            return Ok(RecalcOutcome::Stale);
        }

        let parsed = response?;
        let dropped = self.manual.retain(|m| parsed.unresolved_entry(&m.entry_id).is_some());
        for m in &dropped {
            log::warn!(
                "manual match {} -> product {} dropped: row is no longer unresolved",
                m.entry_id,
                m.product_id
            );
        }
        self.parse_result = Some(parsed);
        Ok(RecalcOutcome::Applied)
    }

    /// Re-run classification with the current mappings and apply the result.
    pub fn recalculate(&mut self, classifier: &dyn Classifier) -> Result<RecalcOutcome, ReconError> {
        let ticket = self.begin_recalculate()?;
        let file = self.file.as_ref().ok_or(ReconError::WrongStage {
            stage: self.stage,
            action: "recalculate",
        })?;
        let response = classifier.preview(file, ticket.mappings());
        self.finish_recalculate(ticket, response)
    }

    // -- manual matches -----------------------------------------------------

    fn unresolved_qty(&self, entry_id: &str) -> Result<i64, ReconError> {
        self.parse_result
            .as_ref()
            .and_then(|r| r.unresolved_entry(entry_id))
            .map(|u| u.row.qty)
            .ok_or_else(|| ReconError::UnknownEntry(entry_id.to_string()))
    }

    /// Register, replace or (with `product_id == None`) remove a manual match.
    pub fn set_manual_match(
        &mut self,
        entry_id: impl Into<EntryId>,
        product_id: Option<ProductId>,
        data: MatchData,
    ) -> Result<Option<ManualMatch>, ReconError> {
        self.require(&[Stage::Review], "change manual matches")?;
        let entry_id = entry_id.into();
        if product_id.is_some() {
            self.unresolved_qty(&entry_id)?;
        }
        Ok(self.manual.set_match(entry_id, product_id, data))
    }

    /// Match an unresolved row to a search candidate. `excel_qty` defaults to
    /// the row's counted quantity.
    pub fn match_candidate(
        &mut self,
        entry_id: impl Into<EntryId>,
        candidate: &ProductCandidate,
        excel_qty: Option<i64>,
    ) -> Result<Option<ManualMatch>, ReconError> {
        self.require(&[Stage::Review], "change manual matches")?;
        let entry_id = entry_id.into();
        let row_qty = self.unresolved_qty(&entry_id)?;
        Ok(self
            .manual
            .from_candidate(entry_id, candidate, excel_qty.unwrap_or(row_qty)))
    }

    pub fn remove_manual_match(&mut self, entry_id: &str) -> Result<Option<ManualMatch>, ReconError> {
        self.require(&[Stage::Review], "change manual matches")?;
        Ok(self.manual.remove_match(entry_id))
    }

    pub fn search(
        &self,
        search: &dyn ProductSearch,
        query: &str,
        policy: &SearchPolicy,
    ) -> Result<Vec<ProductCandidate>, ReconError> {
        self.require(&[Stage::Review], "search products")?;
        self.manual.search(search, query, policy)
    }

    // -- preview + execution ------------------------------------------------

    /// Regular updates and manual matches merged under the session policy.
    pub fn canonical_updates(&self) -> Result<Vec<CanonicalUpdate>, ReconError> {
        let regular = self.parse_result.as_ref().map(|r| r.updates.as_slice()).unwrap_or(&[]);
        merge(regular, self.manual.iter(), &self.policy)
    }

    pub fn enter_preview(&mut self) -> Result<&[CanonicalUpdate], ReconError> {
        self.require(&[Stage::Review], "enter preview")?;
        let regular = self.parse_result.as_ref().map(|r| r.updates.len()).unwrap_or(0);
        if regular + self.manual.len() == 0 {
            return Err(ReconError::NothingToApply);
        }
        let updates = self.canonical_updates()?;
        self.transition(Stage::Preview);
        Ok(self.preview.insert(updates))
    }

    /// Dry run of the frozen update set. Changes neither stage nor stored result.
    pub fn validate(&self, ledger: &mut dyn StockLedger) -> Result<ExecutionResult, ReconError> {
        self.require(&[Stage::Preview], "validate")?;
        execute(ledger, self.preview.as_deref().unwrap_or(&[]), ExecuteOptions { dry_run: true })
    }

    /// Apply the frozen update set. Any completed call moves the session to
    /// Complete, partial failures included; a transport failure keeps it in
    /// Preview so the call can be retried.
    pub fn execute(&mut self, ledger: &mut dyn StockLedger) -> Result<&ExecutionResult, ReconError> {
        self.require(&[Stage::Preview], "execute")?;
        let result = execute(ledger, self.preview.as_deref().unwrap_or(&[]), ExecuteOptions::default())?;
        self.transition(Stage::Complete);
        Ok(self.result.insert(result))
    }

    /// Discard everything and return to Upload. In-flight recalculations
    /// become stale.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        let policy = self.policy;
        if self.stage != Stage::Upload {
            log::info!("session: {} -> upload (reset)", self.stage);
        }
        *self = Self {
            generation,
            policy,
            ..Self::default()
        };
    }
}
