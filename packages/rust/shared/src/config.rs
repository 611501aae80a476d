//! Application configuration for stockscraper.
//!
//! User config lives at `~/.stockscraper/stockscraper.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScraperError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "stockscraper.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".stockscraper";

/// Browser User-Agent sent with direct page requests.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching stockscraper.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub render_proxy: RenderProxyConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// How product pages are retrieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP GET against the shop.
    #[default]
    Direct,
    /// Through the third-party rendering proxy (JavaScript executed).
    Render,
}

/// Which arrival columns the flat table carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalLayout {
    /// `arrival_date_N` / `arrival_qty_N` for every scheduled arrival.
    #[default]
    All,
    /// Only `next_arrival_date` / `next_arrival_qty`.
    Next,
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Newline-delimited list of product page URLs.
    #[serde(default = "default_input_path")]
    pub path: PathBuf,

    /// Process at most this many URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            limit: None,
        }
    }
}

fn default_input_path() -> PathBuf {
    PathBuf::from("referencias_GE.txt")
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub strategy: FetchStrategy,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_page_referer")]
    pub referer: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::default(),
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            referer: default_page_referer(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}
fn default_accept_language() -> String {
    "es-ES,es;q=0.9".into()
}
fn default_page_referer() -> String {
    "https://www.givingeurope.com/".into()
}

/// `[render_proxy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderProxyConfig {
    #[serde(default = "default_proxy_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the proxy username (never store it here).
    #[serde(default = "default_proxy_user_env")]
    pub username_env: String,

    /// Name of the env var holding the proxy password.
    #[serde(default = "default_proxy_pass_env")]
    pub password_env: String,

    #[serde(default = "default_proxy_timeout")]
    pub timeout_secs: u64,
}

impl Default for RenderProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_proxy_endpoint(),
            username_env: default_proxy_user_env(),
            password_env: default_proxy_pass_env(),
            timeout_secs: default_proxy_timeout(),
        }
    }
}

fn default_proxy_endpoint() -> String {
    "https://realtime.oxylabs.io/v1/queries".into()
}
fn default_proxy_user_env() -> String {
    "RENDER_PROXY_USER".into()
}
fn default_proxy_pass_env() -> String {
    "RENDER_PROXY_PASS".into()
}
fn default_proxy_timeout() -> u64 {
    60
}

/// `[api]` section: the configurator JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_layout")]
    pub layout: String,

    #[serde(default = "default_country")]
    pub country: String,

    #[serde(default)]
    pub color: String,

    /// Sent as both `Origin` and `Referer`.
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            locale: default_locale(),
            layout: default_layout(),
            country: default_country(),
            color: String::new(),
            origin: default_origin(),
            timeout_secs: default_api_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://components.givingeurope.com/api/v1".into()
}
fn default_locale() -> String {
    "es_ES".into()
}
fn default_layout() -> String {
    "wholesale".into()
}
fn default_country() -> String {
    "ES".into()
}
fn default_origin() -> String {
    "https://www.givingeurope.com".into()
}
fn default_api_timeout() -> u64 {
    10
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV destination; `-` writes to stdout. `None` disables CSV output.
    #[serde(default = "default_csv_path", skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<PathBuf>,

    #[serde(default)]
    pub arrivals: ArrivalLayout,

    /// Stamp every record with the run's extraction time.
    #[serde(default)]
    pub stamp_extraction: bool,

    /// libSQL database file for the product upsert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            arrivals: ArrivalLayout::default(),
            stamp_extraction: false,
            database_path: None,
        }
    }
}

fn default_csv_path() -> Option<PathBuf> {
    Some(PathBuf::from("GE_stock_api.csv"))
}

/// Basic-auth credentials for the rendering proxy.
#[derive(Clone)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.stockscraper/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScraperError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.stockscraper/stockscraper.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScraperError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ScraperError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScraperError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScraperError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScraperError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the rendering proxy credentials from the env vars named in the config.
pub fn render_proxy_credentials(config: &RenderProxyConfig) -> Result<ProxyCredentials> {
    let read = |var_name: &str| match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ScraperError::config(format!(
            "rendering proxy credentials not found. Set the {var_name} environment variable."
        ))),
    };

    Ok(ProxyCredentials {
        username: read(&config.username_env)?,
        password: read(&config.password_env)?,
    })
}
