//! End-to-end scrape: URL list → page → identifier → configurator → CSV/DB.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use stockscraper_export::{StockTable, flatten, write_csv_file, write_csv_stdout};
use stockscraper_fetcher::{ConfiguratorClient, PageFetcher, extract_product_id, html_snippet};
use stockscraper_shared::{
    ApiConfig, AppConfig, ArrivalLayout, EXTRACTED_AT_FORMAT, Result, ScraperError,
    VariantOption, VariantRecord,
};
use stockscraper_storage::Storage;

use crate::input::{SourceUrl, load_urls};
use crate::records::{extraction_timestamp, records_from_options};

/// Characters of page HTML logged at debug level when extraction fails.
const SNIPPET_CHARS: usize = 500;

/// Where the CSV goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvTarget {
    File(PathBuf),
    Stdout,
}

impl CsvTarget {
    /// `-` means stdout; anything else is a file path.
    pub fn from_path(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            Self::Stdout
        } else {
            Self::File(path.to_path_buf())
        }
    }
}

impl fmt::Display for CsvTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdout => f.write_str("<stdout>"),
        }
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub limit: Option<usize>,
    pub api: ApiConfig,
    /// `None` skips CSV output.
    pub csv: Option<CsvTarget>,
    /// `None` skips the database upsert.
    pub database: Option<PathBuf>,
    pub arrivals: ArrivalLayout,
    pub stamp: bool,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            input: config.input.path.clone(),
            limit: config.input.limit,
            api: config.api.clone(),
            csv: config.output.csv_path.as_deref().map(CsvTarget::from_path),
            database: config.output.database_path.clone(),
            arrivals: config.output.arrivals,
            stamp: config.output.stamp_extraction,
        }
    }
}

/// Step of the per-URL work that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchPage,
    ExtractId,
    FetchVariants,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FetchPage => "fetch page",
            Self::ExtractId => "extract product id",
            Self::FetchVariants => "fetch variants",
        })
    }
}

/// A URL that was skipped.
#[derive(Debug, Clone)]
pub struct UrlFailure {
    pub url: Url,
    pub stage: Stage,
    pub message: String,
}

/// Records and failures of a scrape, before any output is written.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub records: Vec<VariantRecord>,
    pub failures: Vec<UrlFailure>,
    /// URLs that produced a configurator response.
    pub succeeded: usize,
}

/// Result of [`run`].
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub urls_total: usize,
    pub urls_succeeded: usize,
    pub failures: Vec<UrlFailure>,
    pub records: usize,
    pub extracted_at: Option<NaiveDateTime>,
    /// Set when a CSV was written.
    pub csv: Option<CsvTarget>,
    /// Rows upserted, when the database step ran and succeeded.
    pub db_rows: Option<u64>,
    /// Database failure message; the run still completes.
    pub db_error: Option<String>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a URL is processed.
    fn url_started(&self, url: &Url, current: usize, total: usize);
    /// Called when a URL produced `variants` options.
    fn url_succeeded(&self, url: &Url, variants: usize);
    /// Called when a URL was skipped.
    fn url_failed(&self, failure: &UrlFailure);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn url_started(&self, _url: &Url, _current: usize, _total: usize) {}
    fn url_succeeded(&self, _url: &Url, _variants: usize) {}
    fn url_failed(&self, _failure: &UrlFailure) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Process `urls` in order. Any per-URL error is logged and the URL skipped.
pub async fn scrape_urls<F: PageFetcher>(
    fetcher: &F,
    client: &ConfiguratorClient,
    urls: &[SourceUrl],
    extracted_at: Option<NaiveDateTime>,
    progress: &dyn ProgressReporter,
) -> ScrapeOutcome {
    let mut outcome = ScrapeOutcome::default();
    let total = urls.len();

    for (i, source) in urls.iter().enumerate() {
        let url = &source.url;
        progress.url_started(url, i + 1, total);

        match scrape_one(fetcher, client, url).await {
            Ok(options) => {
                debug!(%url, variants = options.len(), "product scraped");
                progress.url_succeeded(url, options.len());
                outcome.succeeded += 1;
                // Rows carry the URL as written in the input list.
                outcome
                    .records
                    .extend(records_from_options(&source.line, &options, extracted_at));
            }
            Err(failure) => {
                warn!(
                    url = %failure.url,
                    stage = %failure.stage,
                    error = %failure.message,
                    "skipping url"
                );
                progress.url_failed(&failure);
                outcome.failures.push(failure);
            }
        }
    }

    outcome
}

async fn scrape_one<F: PageFetcher>(
    fetcher: &F,
    client: &ConfiguratorClient,
    url: &Url,
) -> std::result::Result<Vec<VariantOption>, UrlFailure> {
    let fail = |stage: Stage, message: String| UrlFailure {
        url: url.clone(),
        stage,
        message,
    };

    let html = fetcher
        .fetch_html(url)
        .await
        .map_err(|e| fail(Stage::FetchPage, e.to_string()))?;

    let product_id = extract_product_id(&html).map_err(|e| {
        debug!(%url, snippet = html_snippet(&html, SNIPPET_CHARS), "page without product id");
        fail(Stage::ExtractId, e.to_string())
    })?;

    debug!(%url, %product_id, "product id extracted");

    client
        .fetch_variants(&product_id)
        .await
        .map_err(|e| fail(Stage::FetchVariants, format!("product {product_id}: {e}")))
}

/// Run the full scrape.
///
/// 1. Load the URL list
/// 2. Scrape every URL sequentially
/// 3. Upsert into the database (failure is logged, not fatal)
/// 4. Write the CSV
#[instrument(skip_all, fields(input = %config.input.display(), fetch = fetcher.name()))]
pub async fn run<F: PageFetcher>(
    config: &RunConfig,
    fetcher: &F,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    if config.csv.is_none() && config.database.is_none() {
        return Err(ScraperError::validation(
            "no output configured: enable the CSV or set a database path",
        ));
    }

    let start = Instant::now();
    let run_id = Uuid::now_v7();

    progress.phase("Loading URL list");
    let urls = load_urls(&config.input, config.limit)?;
    info!(%run_id, urls = urls.len(), "starting scrape");

    let client = ConfiguratorClient::new(config.api.clone())?;
    let extracted_at = config.stamp.then(extraction_timestamp);
    if let Some(ts) = extracted_at {
        debug!(extracted_at = %ts.format(EXTRACTED_AT_FORMAT), "stamping records");
    }

    progress.phase("Scraping products");
    let outcome = scrape_urls(fetcher, &client, &urls, extracted_at, progress).await;

    let mut summary = RunSummary {
        run_id,
        urls_total: urls.len(),
        urls_succeeded: outcome.succeeded,
        failures: outcome.failures,
        records: outcome.records.len(),
        extracted_at,
        csv: None,
        db_rows: None,
        db_error: None,
        elapsed: Duration::ZERO,
    };

    if outcome.records.is_empty() {
        warn!("no variant records collected, nothing written");
    } else {
        if let Some(path) = &config.database {
            progress.phase("Writing database");
            match store_records(path, &outcome.records).await {
                Ok(rows) => summary.db_rows = Some(rows),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "database upsert failed");
                    summary.db_error = Some(e.to_string());
                }
            }
        }

        if let Some(target) = &config.csv {
            progress.phase("Writing CSV");
            let table = flatten(&outcome.records, config.arrivals, config.stamp);
            write_table(target, &table)?;
            summary.csv = Some(target.clone());
        }
    }

    summary.elapsed = start.elapsed();
    progress.done(&summary);

    info!(
        %run_id,
        urls = summary.urls_total,
        succeeded = summary.urls_succeeded,
        failed = summary.failures.len(),
        records = summary.records,
        elapsed_ms = summary.elapsed.as_millis(),
        "scrape complete"
    );

    Ok(summary)
}

async fn store_records(path: &Path, records: &[VariantRecord]) -> Result<u64> {
    let storage = Storage::open(path).await?;
    storage.upsert_products(records).await
}

fn write_table(target: &CsvTarget, table: &StockTable) -> Result<()> {
    match target {
        CsvTarget::File(path) => {
            write_csv_file(path, table)?;
            info!(path = %path.display(), rows = table.len(), "csv written");
        }
        CsvTarget::Stdout => write_csv_stdout(table)?,
    }
    Ok(())
}
