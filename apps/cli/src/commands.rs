//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use linkloom_core::{CancelToken, Pipeline, ProgressReporter};
use linkloom_fetch::Fetcher;
use linkloom_shared::{AppConfig, BookmarkRecord, EnrichOptions, init_config, load_config};
use linkloom_store::{BookmarkStore, JsonUrlLedger, JsonlErrorLog, JsonlRecordLog};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Linkloom — enrich browser bookmarks for semantic indexing.
#[derive(Parser)]
#[command(
    name = "linkloom",
    version,
    about = "Collect browser bookmarks and enrich them with summaries and page text.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Collect bookmarks, enrich them, and persist the results.
    Ingest {
        /// Browsers to read (comma-separated, or "all"). Defaults to config.
        #[arg(short, long)]
        browsers: Option<String>,

        /// Ingest a single bookmark file instead of detected browsers.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Source name to tag records from `--file` with.
        #[arg(long, default_value = "import", requires = "file")]
        source: String,

        /// Cap the number of records enriched this run (overrides config).
        #[arg(short, long)]
        limit: Option<i64>,

        /// Maximum concurrent fetches (overrides config).
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Skip page fetching entirely; store records as-is.
        #[arg(long)]
        no_content: bool,
    },

    /// Show counts from the store, ledger, and logs.
    Stats,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "linkloom=info",
        1 => "linkloom=debug",
        _ => "linkloom=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest {
            browsers,
            file,
            source,
            limit,
            concurrency,
            no_content,
        } => {
            cmd_ingest(
                browsers.as_deref(),
                file.as_deref(),
                &source,
                limit,
                concurrency,
                no_content,
            )
            .await
        }
        Command::Stats => cmd_stats().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

/// Browsers probed when `--browsers all` is given.
const ALL_BROWSERS: &[&str] = &["chrome", "edge", "brave", "opera", "firefox"];

async fn cmd_ingest(
    browsers: Option<&str>,
    file: Option<&std::path::Path>,
    file_source: &str,
    limit: Option<i64>,
    concurrency: Option<usize>,
    no_content: bool,
) -> Result<()> {
    let config = load_config()?;

    let candidates = collect_candidates(&config, browsers, file, file_source)?;
    if candidates.is_empty() {
        println!("No bookmarks found to ingest.");
        return Ok(());
    }

    info!(candidates = candidates.len(), "collected bookmark records");

    // Open sinks (caller-owned; the pipeline only borrows trait handles)
    let paths = config.sink_paths()?;
    let store = Arc::new(BookmarkStore::open(&paths.db).await?);
    let ledger = Arc::new(JsonUrlLedger::open(&paths.ledger)?);
    let record_log = Arc::new(JsonlRecordLog::new(&paths.record_log));
    let error_log = Arc::new(JsonlErrorLog::new(&paths.error_log));

    let fetcher = Arc::new(Fetcher::new().map_err(|e| eyre!("failed to build HTTP client: {e}"))?);

    // Ctrl-C cancels the batch: in-flight fetches finish, queued ones drop
    let cancel = CancelToken::new();
    let cancel_bg = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            cancel_bg.cancel();
        }
    });

    let reporter = Arc::new(CliProgress::new());

    // Config provides the baseline; CLI flags override per invocation.
    let mut opts = EnrichOptions::from(&config);
    if let Some(limit) = limit {
        opts.url_limit = limit;
    }
    if let Some(concurrency) = concurrency {
        opts.concurrency = concurrency;
    }
    if no_content {
        opts.include_content = false;
    }

    let pipeline = Pipeline::new(store, ledger, record_log, error_log, fetcher)
        .with_url_limit(opts.url_limit)
        .with_progress(reporter.clone())
        .with_cancel_token(cancel);

    let report = pipeline
        .enrich_batch(candidates, opts.include_content, opts.concurrency)
        .await;

    reporter.finish();

    // Print summary
    println!();
    println!("  Ingest complete");
    println!("  Enriched:      {}", report.enriched.len());
    println!("  Stored:        {}", report.stored);
    println!("  Skipped:       {}", report.skipped.len());
    println!("  Failed:        {}", report.failures.len());
    println!("  Errors logged: {}", report.errors_logged);
    if report.discarded > 0 {
        println!("  Discarded:     {} (cancelled)", report.discarded);
    }
    if report.sink_errors > 0 {
        println!("  Sink errors:   {}", report.sink_errors);
    }
    println!();

    // Show a sample of failures for quick triage
    for failure in report.failures.iter().take(10) {
        println!("  - {}: {}", failure.url, failure.reason);
    }
    if report.failures.len() > 10 {
        println!("  ... and {} more", report.failures.len() - 10);
    }

    Ok(())
}

/// Gather candidate records from a single file or the configured browsers.
fn collect_candidates(
    config: &AppConfig,
    browsers: Option<&str>,
    file: Option<&std::path::Path>,
    file_source: &str,
) -> Result<Vec<BookmarkRecord>> {
    if let Some(path) = file {
        let records = linkloom_sources::parse_bookmark_file(path, file_source)?;
        info!(?path, count = records.len(), "parsed bookmark file");
        return Ok(records);
    }

    let browser_list: Vec<String> = match browsers {
        Some("all") => ALL_BROWSERS.iter().map(|b| b.to_string()).collect(),
        Some(list) => list.split(',').map(|b| b.trim().to_string()).collect(),
        None => config.sources.browsers.clone(),
    };

    let mut candidates = Vec::new();
    for source in linkloom_sources::available_sources(&browser_list, &config.sources.custom_paths) {
        for path in &source.paths {
            match linkloom_sources::parse_bookmark_file(path, &source.source) {
                Ok(records) => {
                    info!(?path, source = %source.source, count = records.len(), "parsed bookmark file");
                    candidates.extend(records);
                }
                Err(e) => {
                    warn!(?path, source = %source.source, error = %e, "failed to parse bookmark file");
                }
            }
        }
    }

    Ok(candidates)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_done(&self, completed: usize, total: usize, url: &str) {
        self.spinner
            .set_message(format!("Enriching [{completed}/{total}] {url}"));
    }
}

// ---------------------------------------------------------------------------
// stats / config
// ---------------------------------------------------------------------------

async fn cmd_stats() -> Result<()> {
    let config = load_config()?;
    let paths = config.sink_paths()?;

    let store = BookmarkStore::open(&paths.db).await?;
    let ledger = JsonUrlLedger::open(&paths.ledger)?;
    let record_log = JsonlRecordLog::new(&paths.record_log);
    let error_log = JsonlErrorLog::new(&paths.error_log);

    println!();
    println!("  Stored bookmarks:  {}", store.count().await?);
    println!("  Processed URLs:    {}", ledger.len());
    println!("  Record log lines:  {}", record_log.count()?);
    println!("  Error log lines:   {}", error_log.count()?);
    println!();
    println!("  Database:   {}", paths.db.display());
    println!("  Ledger:     {}", paths.ledger.display());
    println!("  Record log: {}", paths.record_log.display());
    println!("  Error log:  {}", paths.error_log.display());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
