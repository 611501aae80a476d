//! Shared types, error model, and configuration for stockscraper.
//!
//! This crate is the foundation depended on by all other stockscraper crates.
//! It provides:
//! - [`ScraperError`]: the unified error type
//! - Domain types ([`VariantOption`], [`VariantRecord`], [`Arrival`])
//! - Configuration ([`AppConfig`], config loading, proxy credentials)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, ArrivalLayout, FetchConfig, FetchStrategy, InputConfig, OutputConfig,
    ProxyCredentials, RenderProxyConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, render_proxy_credentials,
};
pub use error::{Result, ScraperError};
pub use types::{
    Arrival, ConfiguratorResponse, ConfiguratorStep, EXTRACTED_AT_FORMAT, IncomingStock,
    QUANTITY_PER_VARIANT, StockInfo, VariantOption, VariantRecord, number_from_value,
    text_from_value,
};
