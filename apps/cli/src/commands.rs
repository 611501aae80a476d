//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use stockscraper_core::{ProgressReporter, RunConfig, RunSummary, UrlFailure};
use stockscraper_fetcher::{DirectFetcher, RenderProxyFetcher};
use stockscraper_shared::{
    AppConfig, ArrivalLayout, FetchStrategy, init_config, load_config, load_config_from,
    render_proxy_credentials,
};
use stockscraper_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// stockscraper: product stock snapshots from configurator-driven storefronts.
#[derive(Parser)]
#[command(
    name = "stockscraper",
    version,
    about = "Scrape per-variant stock and incoming deliveries into CSV or a database.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.stockscraper/stockscraper.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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

/// How product pages are fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum FetchArg {
    Direct,
    Render,
}

/// Arrival columns in the CSV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum ArrivalsArg {
    All,
    Next,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape every URL in the input list.
    Run(RunArgs),

    /// Open the database and report how many product rows it holds.
    CheckDb {
        /// Database file (overrides `output.database_path`).
        #[arg(long, env = "STOCKSCRAPER_DB")]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags of `run`. Each one overrides the matching config value.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Newline-delimited URL list.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Process at most this many URLs.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Page fetch strategy.
    #[arg(long)]
    pub fetch: Option<FetchArg>,

    /// CSV output path; `-` writes to stdout.
    #[arg(long, conflicts_with = "no_csv")]
    pub csv: Option<PathBuf>,

    /// Do not write a CSV.
    #[arg(long)]
    pub no_csv: bool,

    /// Upsert results into this database file.
    #[arg(long, env = "STOCKSCRAPER_DB")]
    pub db: Option<PathBuf>,

    /// Arrival columns: every scheduled arrival, or only the next one.
    #[arg(long)]
    pub arrivals: Option<ArrivalsArg>,

    /// Stamp rows with the extraction time.
    #[arg(long)]
    pub stamp: bool,
}

impl RunArgs {
    /// Fold the flags into `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if self.limit.is_some() {
            config.input.limit = self.limit;
        }
        if let Some(fetch) = self.fetch {
            config.fetch.strategy = match fetch {
                FetchArg::Direct => FetchStrategy::Direct,
                FetchArg::Render => FetchStrategy::Render,
            };
        }
        if self.no_csv {
            config.output.csv_path = None;
        } else if let Some(csv) = &self.csv {
            config.output.csv_path = Some(csv.clone());
        }
        if let Some(db) = &self.db {
            config.output.database_path = Some(db.clone());
        }
        if let Some(arrivals) = self.arrivals {
            config.output.arrivals = match arrivals {
                ArrivalsArg::All => ArrivalLayout::All,
                ArrivalsArg::Next => ArrivalLayout::Next,
            };
        }
        if self.stamp {
            config.output.stamp_extraction = true;
        }
    }
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

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout may carry CSV.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "stockscraper=info",
        1 => "stockscraper=debug",
        _ => "stockscraper=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command routing
// ---------------------------------------------------------------------------

/// Route a parsed CLI command to its handler.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(cli.config.as_deref(), &args).await,
        Command::CheckDb { db } => cmd_check_db(cli.config.as_deref(), db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    args.apply(&mut config);

    let run_config = RunConfig::from(&config);
    info!(
        input = %run_config.input.display(),
        fetch = ?config.fetch.strategy,
        "starting run"
    );

    let reporter = CliProgress::new();

    let result = match config.fetch.strategy {
        FetchStrategy::Direct => {
            let fetcher = DirectFetcher::new(&config.fetch)?;
            stockscraper_core::run(&run_config, &fetcher, &reporter).await
        }
        FetchStrategy::Render => {
            let credentials = render_proxy_credentials(&config.render_proxy)?;
            let fetcher = RenderProxyFetcher::new(&config.render_proxy, credentials)?;
            stockscraper_core::run(&run_config, &fetcher, &reporter).await
        }
    };

    reporter.spinner.finish_and_clear();
    let summary = result?;

    print_summary(&summary);
    Ok(())
}

/// Summary goes to stderr so a CSV on stdout stays clean.
fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("  Run:      {}", summary.run_id);
    eprintln!(
        "  URLs:     {} ok / {} total",
        summary.urls_succeeded, summary.urls_total
    );
    eprintln!("  Variants: {}", summary.records);
    if let Some(ts) = summary.extracted_at {
        eprintln!("  Stamped:  {ts}");
    }
    match &summary.csv {
        Some(target) => eprintln!("  CSV:      {target}"),
        None if summary.records == 0 => eprintln!("  CSV:      (no data, nothing written)"),
        None => {}
    }
    if let Some(rows) = summary.db_rows {
        eprintln!("  Database: {rows} rows upserted");
    }
    if let Some(error) = &summary.db_error {
        eprintln!("  Database: FAILED ({error})");
    }
    if !summary.failures.is_empty() {
        eprintln!("  Skipped:");
        for failure in &summary.failures {
            eprintln!("    {} [{}] {}", failure.url, failure.stage, failure.message);
        }
    }
    eprintln!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    eprintln!();
}

async fn cmd_check_db(config_path: Option<&Path>, db: Option<PathBuf>) -> Result<()> {
    let path = match db {
        Some(path) => path,
        None => resolve_config(config_path)?
            .output
            .database_path
            .ok_or_else(|| eyre!("no database configured: pass --db or set output.database_path"))?,
    };

    let storage = Storage::open_readonly(&path).await?;
    storage.ping().await?;
    let version = storage.schema_version().await;
    let count = storage.count_products().await?;

    info!(path = %path.display(), version, count, "database reachable");
    println!("Database: {}", path.display());
    println!("Schema:   v{version}");
    println!("Products: {count}");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn url_started(&self, url: &Url, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Scraping [{current}/{total}] {url}"));
    }

    fn url_succeeded(&self, _url: &Url, _variants: usize) {}

    fn url_failed(&self, failure: &UrlFailure) {
        self.spinner
            .println(format!("  skipped {} ({})", failure.url, failure.stage));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse args")
    }

    #[test]
    fn run_flags_override_config() {
        let cli = parse(&[
            "stockscraper",
            "run",
            "--input",
            "urls.txt",
            "--limit",
            "10",
            "--fetch",
            "render",
            "--csv",
            "-",
            "--db",
            "stock.db",
            "--arrivals",
            "next",
            "--stamp",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.input.path, PathBuf::from("urls.txt"));
        assert_eq!(config.input.limit, Some(10));
        assert_eq!(config.fetch.strategy, FetchStrategy::Render);
        assert_eq!(config.output.csv_path, Some(PathBuf::from("-")));
        assert_eq!(config.output.database_path, Some(PathBuf::from("stock.db")));
        assert_eq!(config.output.arrivals, ArrivalLayout::Next);
        assert!(config.output.stamp_extraction);
    }

    #[test]
    fn no_flags_keep_config() {
        let mut config = AppConfig::default();
        RunArgs::default().apply(&mut config);
        assert_eq!(config.output.csv_path, AppConfig::default().output.csv_path);
        assert_eq!(config.fetch.strategy, FetchStrategy::Direct);
    }

    #[test]
    fn no_csv_disables_output() {
        let cli = parse(&["stockscraper", "run", "--no-csv"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert!(config.output.csv_path.is_none());
    }

    #[test]
    fn csv_and_no_csv_conflict() {
        let parsed = Cli::try_parse_from(["stockscraper", "run", "--csv", "a.csv", "--no-csv"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["stockscraper", "check-db", "-vv", "--log-format", "json"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}
