//! Scrape orchestration for stockscraper.
//!
//! This crate ties the fetcher, export and storage crates together into the
//! end-to-end [`run`] workflow.

pub mod input;
pub mod pipeline;
pub mod records;

pub use input::{SourceUrl, load_urls, parse_url_list};
pub use pipeline::{
    CsvTarget, ProgressReporter, RunConfig, RunSummary, ScrapeOutcome, SilentProgress, Stage,
    UrlFailure, run, scrape_urls,
};
pub use records::{extraction_timestamp, records_from_options};
