//! `stockrecon` job commands: validate, parse, preview, run, search, vocab.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;
use stockrecon_config::Settings;
use stockrecon_core::{CanonicalFinish, Catalog, Dimension, SpecVocabulary};
use stockrecon_io::export::{summary_json, write_summary_csv, write_summary_json};
use stockrecon_recon::config::ManualEntry;
use stockrecon_recon::summary::{compute_summary, summarize_updates};
use stockrecon_recon::{
    CanonicalUpdate, ExecutionResult, JobConfig, ManualMatchRegistry, ProductCandidate, ReconError,
    ReconciliationSession, Vocabulary,
};

use crate::exit_codes::{EXIT_RECON_INVALID_CONFIG, EXIT_RECON_PARTIAL};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Check a job file without reading the sheet or catalog
    #[command(after_help = "\
Examples:
  stockrecon validate march.recon.toml")]
    Validate {
        /// Path to the .recon.toml job file
        job: PathBuf,
    },

    /// Classify the count sheet against the catalog
    #[command(after_help = "\
Examples:
  stockrecon parse march.recon.toml
  stockrecon parse march.recon.toml --json | jq '.missing_finishes'")]
    Parse {
        job: PathBuf,

        /// Print the full classification result as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Show the stock updates a run would apply
    #[command(after_help = "\
Examples:
  stockrecon preview march.recon.toml
  stockrecon preview march.recon.toml --json")]
    Preview {
        job: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Apply the stock updates to the catalog
    #[command(after_help = "\
Exit code 5 means some updates were rejected; the others were applied and
the catalog was saved.

Examples:
  stockrecon run march.recon.toml --dry-run
  stockrecon run march.recon.toml --output applied.csv
  stockrecon run march.recon.toml --json > result.json")]
    Run {
        job: PathBuf,

        /// Check every update without changing stock
        #[arg(long)]
        dry_run: bool,

        /// Print execution result and updates as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write a per-product summary (.csv or .json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Search catalog products for a manual match
    #[command(after_help = "\
Examples:
  stockrecon search catalog.json 'rs-7 chrome'
  stockrecon search catalog.json gt-2 --limit 5 --json")]
    Search {
        catalog: PathBuf,

        query: String,

        /// Maximum number of candidates (defaults to the settings value)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// List the finishes and spec values mappings can target
    Vocab {
        catalog: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Validate { job } => cmd_validate(job),
        ReconCommands::Parse { job, json } => cmd_parse(job, json),
        ReconCommands::Preview { job, json } => cmd_preview(job, json),
        ReconCommands::Run { job, dry_run, json, output } => cmd_run(job, dry_run, json, output),
        ReconCommands::Search { catalog, query, limit, json } => cmd_search(catalog, query, limit, json),
        ReconCommands::Vocab { catalog, json } => cmd_vocab(catalog, json),
    }
}

// ============================================================================
// Job loading
// ============================================================================

struct Job {
    config: JobConfig,
    /// Directory the job file lives in; relative paths resolve against it.
    base_dir: PathBuf,
}

impl Job {
    fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read job file {}: {e}", path.display())))?;
        let config = JobConfig::from_toml(&text)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { config, base_dir })
    }

    fn sheet_path(&self) -> PathBuf {
        self.base_dir.join(&self.config.file)
    }

    fn catalog_path(&self, settings: &Settings) -> Result<PathBuf, CliError> {
        match (&self.config.catalog, &settings.default_catalog) {
            (Some(rel), _) => Ok(self.base_dir.join(rel)),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(CliError::new(EXIT_RECON_INVALID_CONFIG, "no catalog configured").with_hint(
                format!(
                    "set `catalog` in the job file or \"catalog.default\" in {}",
                    Settings::config_path_display()
                ),
            )),
        }
    }
}

fn load_catalog(path: &Path) -> Result<Catalog, CliError> {
    stockrecon_io::catalog::load(path).map_err(CliError::io)
}

/// Session in Review: mappings seeded from the job, sheet uploaded.
fn open_session(job: &Job, catalog: &Catalog) -> Result<ReconciliationSession, CliError> {
    let sheet_path = job.sheet_path();
    let sheet = stockrecon_io::sheet::load(&sheet_path, &job.config.columns)
        .map_err(|e| CliError::recon(ReconError::ParseFailure(e)))?;

    let mut session = ReconciliationSession::with_policy(job.config.merge);
    for dim in Dimension::ALL {
        for (excel, db) in job.config.mappings.iter(dim) {
            session.set_mapping(dim, excel, db)?;
        }
    }
    session.upload(sheet, catalog)?;
    Ok(session)
}

fn register_manual(
    session: &mut ReconciliationSession,
    catalog: &Catalog,
    manual: &[ManualEntry],
) -> Result<(), CliError> {
    for entry in manual {
        let product = catalog.product(entry.product_id).ok_or_else(|| {
            CliError::new(
                EXIT_RECON_INVALID_CONFIG,
                format!("manual match {}: product {} is not in the catalog", entry.entry_id, entry.product_id),
            )
        })?;
        session.match_candidate(entry.entry_id.clone(), &ProductCandidate::from(product), entry.excel_qty)?;
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}

fn signed(n: i64) -> String {
    if n > 0 {
        format!("+{n}")
    } else {
        n.to_string()
    }
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(job_path: PathBuf) -> Result<(), CliError> {
    let job = Job::load(&job_path)?;
    let c = &job.config;
    eprintln!(
        "valid: job '{}' reading {} with {} mapping(s), {} manual match(es)",
        c.name,
        c.file,
        c.mappings.len(),
        c.manual.len(),
    );
    Ok(())
}

// ============================================================================
// parse
// ============================================================================

fn cmd_parse(job_path: PathBuf, json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let job = Job::load(&job_path)?;
    let catalog = load_catalog(&job.catalog_path(&settings)?)?;
    let session = open_session(&job, &catalog)?;

    let Some(result) = session.parse_result() else {
        return Ok(());
    };

    if json {
        print_json(result)?;
    }

    let s = compute_summary(result);
    eprintln!(
        "{}: {} row(s), {} matched ({} to update, {} unchanged), {} unresolved",
        job.config.file,
        s.total_rows,
        s.matched,
        s.updates,
        s.no_change,
        s.unresolved(),
    );
    if s.missing_models > 0 {
        eprintln!("  unknown model:      {}", s.missing_models);
    }
    if s.missing_inches > 0 {
        eprintln!("  unknown inch:       {}", s.missing_inches);
    }
    for (dim, rows) in &s.missing_dimensions {
        let distinct = s.distinct_values.get(dim).copied().unwrap_or(0);
        eprintln!("  unknown {:<10} {} row(s), {} distinct value(s)", format!("{dim}:"), rows, distinct);
    }
    if s.no_product > 0 {
        eprintln!("  no product:         {}", s.no_product);
    }
    if s.ambiguous > 0 {
        eprintln!("  ambiguous:          {}", s.ambiguous);
    }
    Ok(())
}

// ============================================================================
// preview
// ============================================================================

fn print_updates(updates: &[CanonicalUpdate]) {
    for u in updates {
        println!(
            "{}\t{}\t{} -> {} ({}){}",
            u.product_id,
            u.product_name,
            u.old_stock,
            u.new_stock,
            signed(u.difference),
            if u.is_manual_match { "\tmanual" } else { "" },
        );
    }
}

fn cmd_preview(job_path: PathBuf, json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let job = Job::load(&job_path)?;
    let catalog = load_catalog(&job.catalog_path(&settings)?)?;
    let mut session = open_session(&job, &catalog)?;
    register_manual(&mut session, &catalog, &job.config.manual)?;

    let updates = session.enter_preview()?;
    if json {
        print_json(updates)?;
    } else {
        print_updates(updates);
    }

    let s = summarize_updates(updates);
    eprintln!(
        "{} product(s) to update ({} manual), net {}: {} up, {} down",
        s.products,
        s.manual_only,
        signed(s.net_difference),
        s.increases,
        s.decreases,
    );
    Ok(())
}

// ============================================================================
// run
// ============================================================================

fn resolve_output(path: PathBuf, settings: &Settings) -> PathBuf {
    match &settings.export_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Csv,
    Json,
}

fn output_format(path: &Path) -> Result<OutputFormat, CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(OutputFormat::Csv),
        "json" => Ok(OutputFormat::Json),
        _ => Err(CliError::usage(format!("unsupported output format: {}", path.display()))
            .with_hint("use a .csv or .json file name")),
    }
}

fn write_output(
    path: &Path,
    format: OutputFormat,
    updates: &[CanonicalUpdate],
    result: &ExecutionResult,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Csv => write_summary_csv(path, updates, result),
        OutputFormat::Json => write_summary_json(path, updates, result),
    }
    .map_err(CliError::io)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_run(job_path: PathBuf, dry_run: bool, json: bool, output: Option<PathBuf>) -> Result<(), CliError> {
    let settings = Settings::load();
    let job = Job::load(&job_path)?;
    let catalog_path = job.catalog_path(&settings)?;
    let mut catalog = load_catalog(&catalog_path)?;

    // Reject a bad output name before anything is applied.
    let output = match output {
        Some(p) => {
            let path = resolve_output(p, &settings);
            let format = output_format(&path)?;
            Some((path, format))
        }
        None => None,
    };

    let mut session = open_session(&job, &catalog)?;
    register_manual(&mut session, &catalog, &job.config.manual)?;
    session.enter_preview()?;

    let dry_run = dry_run || job.config.execute.dry_run;
    let result = if dry_run {
        session.validate(&mut catalog)?
    } else {
        let result = session.execute(&mut catalog)?.clone();
        if result.success_count > 0 {
            stockrecon_io::catalog::save(&catalog_path, &catalog).map_err(CliError::io)?;
        }
        result
    };
    let updates = session.preview_updates().unwrap_or(&[]);

    if let Some((path, format)) = &output {
        write_output(path, *format, updates, &result)?;
    }
    if json {
        let json = summary_json(updates, &result).map_err(CliError::io)?;
        println!("{json}");
    }

    eprintln!(
        "{}: {} of {} update(s) {}, {} failed (batch {})",
        if dry_run { "dry run" } else { "run" },
        result.success_count,
        result.total_processed,
        if dry_run { "would apply" } else { "applied" },
        result.error_count,
        result.batch_id,
    );
    for e in &result.errors {
        eprintln!("  product {} ({}): {}", e.product_id, e.product_name, e.error);
    }

    if result.is_partial() {
        return Err(CliError::new(
            EXIT_RECON_PARTIAL,
            format!("{} of {} update(s) rejected", result.error_count, result.total_processed),
        ));
    }
    Ok(())
}

// ============================================================================
// search
// ============================================================================

fn cmd_search(catalog_path: PathBuf, query: String, limit: Option<usize>, json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let catalog = load_catalog(&catalog_path)?;

    let mut policy = settings.search.policy();
    if let Some(limit) = limit {
        policy.limit = limit;
    }
    if query.trim().chars().count() < policy.min_query_len {
        log::warn!("query shorter than {} characters; nothing searched", policy.min_query_len);
    }

    let hits = ManualMatchRegistry::new().search(&catalog, &query, &policy)?;
    if json {
        print_json(&hits)?;
    } else {
        for c in &hits {
            println!("{}\t{}\t{}\t{}\tstock {}", c.product_id, c.product_name, c.model, c.finish, c.in_house_stock);
        }
    }
    eprintln!("{} candidate(s)", hits.len());
    Ok(())
}

// ============================================================================
// vocab
// ============================================================================

#[derive(Serialize)]
struct VocabOutput {
    finishes: Vec<CanonicalFinish>,
    specs: SpecVocabulary,
}

fn cmd_vocab(catalog_path: PathBuf, json: bool) -> Result<(), CliError> {
    let catalog = load_catalog(&catalog_path)?;
    let out = VocabOutput {
        finishes: catalog.list_finishes()?,
        specs: catalog.list_specs()?,
    };

    if json {
        return print_json(&out);
    }

    println!("finishes:");
    for f in &out.finishes {
        println!("  {}\t{}", f.id, f.name);
    }
    for (label, values) in [
        ("widths", &out.specs.widths),
        ("pcds", &out.specs.pcds),
        ("holes", &out.specs.holes),
        ("inches", &out.specs.inches),
    ] {
        println!("{label}: {}", values.join(", "));
    }
    Ok(())
}
