use std::collections::HashMap;

use chrono::Utc;
use stockrecon_core::ProductId;

use crate::collab::{ItemOutcome, StockLedger, UpdateBatch};
use crate::error::ReconError;
use crate::model::{CanonicalUpdate, ExecutionResult, ItemError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub dry_run: bool,
}

pub fn new_batch_id() -> String {
    format!("recon-{}", uuid::Uuid::new_v4())
}

/// Submit `updates` as one batch and tally what the ledger reports.
///
/// Items succeed or fail independently. Outcomes are paired with updates by
/// product id, in any order; an update without an outcome is counted as
/// failed, so
/// `success_count + error_count == updates.len()` always holds. Only a
/// transport failure of the whole call returns `Err`.
pub fn execute(
    ledger: &mut dyn StockLedger,
    updates: &[CanonicalUpdate],
    opts: ExecuteOptions,
) -> Result<ExecutionResult, ReconError> {
    let batch_id = new_batch_id();

    if updates.is_empty() {
        log::info!("{batch_id}: nothing to submit");
        return Ok(ExecutionResult {
            batch_id,
            dry_run: opts.dry_run,
            success_count: 0,
            error_count: 0,
            total_processed: 0,
            errors: Vec::new(),
            executed_at: Utc::now(),
        });
    }

    let batch = UpdateBatch {
        batch_id,
        updates: updates.to_vec(),
    };
    let outcomes = ledger.apply_batch(&batch, opts.dry_run).map_err(|e| match e {
        ReconError::ExecutionTransport(_) => e,
        other => ReconError::ExecutionTransport(other.to_string()),
    })?;

    let mut by_product: HashMap<ProductId, &ItemOutcome> = HashMap::with_capacity(outcomes.len());
    for outcome in &outcomes {
        if by_product.insert(outcome.product_id(), outcome).is_some() {
            log::warn!(
                "{}: ledger reported product {} twice; last outcome kept",
                batch.batch_id,
                outcome.product_id()
            );
        }
    }
    if let Some(extra) = outcomes
        .iter()
        .find(|o| !updates.iter().any(|u| u.product_id == o.product_id()))
    {
        log::warn!(
            "{}: ledger reported product {} which was not submitted; ignored",
            batch.batch_id,
            extra.product_id()
        );
    }

    let mut success_count = 0;
    let mut errors = Vec::new();
    for update in updates {
        let error = match by_product.get(&update.product_id) {
            Some(ItemOutcome::Applied { .. }) => None,
            Some(ItemOutcome::Rejected { error, .. }) => Some(error.clone()),
            None => Some("no outcome reported".to_string()),
        };
        match error {
            None => success_count += 1,
            Some(error) => {
                log::warn!("{}: product {} failed: {error}", batch.batch_id, update.product_id);
                errors.push(ItemError {
                    product_id: update.product_id,
                    product_name: update.product_name.clone(),
                    error,
                });
            }
        }
    }

    let result = ExecutionResult {
        batch_id: batch.batch_id,
        dry_run: opts.dry_run,
        success_count,
        error_count: errors.len(),
        total_processed: updates.len(),
        errors,
        executed_at: Utc::now(),
    };
    log::info!(
        "{}{}: {} applied, {} failed",
        result.batch_id,
        if result.dry_run { " (dry run)" } else { "" },
        result.success_count,
        result.error_count
    );
    Ok(result)
}
