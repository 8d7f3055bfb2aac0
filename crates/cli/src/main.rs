// stockrecon CLI - stock count reconciliation against a product catalog

mod exit_codes;
mod recon;

use std::process::ExitCode;

use clap::Parser;
use stockrecon_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use recon::ReconCommands;

#[derive(Parser)]
#[command(name = "stockrecon")]
#[command(about = "Reconcile physical stock counts against a product catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: ReconCommands,

    /// Log engine detail (debug level) to stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match recon::cmd_recon(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Create error from an engine error with proper exit code.
    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::NothingToApply => {
                Some("add [mappings] or [[manual]] entries to the job file, or check the counted quantities".to_string())
            }
            ReconError::UnknownEntry(_) => {
                Some("manual matches may only target unresolved rows; `stockrecon parse <job>` lists them".to_string())
            }
            ReconError::ExecutionTransport(_) => {
                Some("no stock was changed; the run can be retried".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        Self::recon(err)
    }
}
