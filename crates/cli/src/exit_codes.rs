//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 1    | General error (unreadable catalog, write failure)  |
//! | 2    | CLI usage error (bad args, unknown output format)  |
//! | 3    | Count sheet could not be parsed                    |
//! | 4    | Nothing to apply                                   |
//! | 5    | Partial execution (some updates rejected)          |
//! | 6    | Update batch not applied (transport failure)       |
//! | 7    | Invalid job config                                 |
//! | 8    | Product search failed                              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `recon_exit_code` or the relevant command

use stockrecon_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Reconciliation (3-8)
// =============================================================================

/// The count sheet is malformed or unreadable.
pub const EXIT_RECON_PARSE: u8 = 3;

/// No regular updates and no manual matches: preview refused.
pub const EXIT_RECON_NOTHING: u8 = 4;

/// Execution completed but at least one item was rejected.
pub const EXIT_RECON_PARTIAL: u8 = 5;

/// The batch as a whole was not processed. Safe to retry.
pub const EXIT_RECON_TRANSPORT: u8 = 6;

/// Job file failed to parse or validate, or references unknown rows/products.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 7;

/// Product search collaborator failed.
pub const EXIT_RECON_SEARCH: u8 = 8;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ParseFailure(_) => EXIT_RECON_PARSE,
        ReconError::NothingToApply => EXIT_RECON_NOTHING,
        ReconError::ExecutionTransport(_) => EXIT_RECON_TRANSPORT,
        ReconError::SearchFailure(_) => EXIT_RECON_SEARCH,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        // Only job-file manual matches can name an entry from the CLI.
        ReconError::UnknownEntry(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::WrongStage { .. } => EXIT_ERROR,
    }
}
