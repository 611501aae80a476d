//! Product page fetchers.
//!
//! Two strategies retrieve the page HTML: a direct GET that looks like a
//! browser, and a POST to a third-party rendering proxy that executes the
//! page's JavaScript first. Both implement [`PageFetcher`].

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use stockscraper_shared::{
    FetchConfig, ProxyCredentials, RenderProxyConfig, Result, ScraperError,
};

use crate::ensure_success;

/// Accept header a browser sends for a top-level navigation.
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Retrieves the HTML of a product page.
pub trait PageFetcher: Send + Sync {
    /// Fetch the page at `url` and return its HTML.
    fn fetch_html(&self, url: &Url) -> impl Future<Output = Result<String>> + Send;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Direct fetch
// ---------------------------------------------------------------------------

/// Plain GET with browser-like headers.
pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
        headers.insert(REFERER, header_value(&config.referer)?);

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScraperError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl PageFetcher for DirectFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching product page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ScraperError::Network(format!("{url}: {e}")))?;

        ensure_success(url.as_str(), response)?
            .text()
            .await
            .map_err(|e| ScraperError::Network(format!("{url}: body read failed: {e}")))
    }

    fn name(&self) -> &str {
        "direct"
    }
}

// ---------------------------------------------------------------------------
// Rendering proxy
// ---------------------------------------------------------------------------

/// Request body for the realtime rendering endpoint.
#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    source: &'a str,
    url: &'a str,
    render: bool,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    results: Vec<RenderResult>,
}

#[derive(Debug, Deserialize)]
struct RenderResult {
    #[serde(default)]
    content: Option<String>,
}

/// Fetches pages through a rendering proxy using basic auth.
pub struct RenderProxyFetcher {
    client: Client,
    endpoint: Url,
    credentials: ProxyCredentials,
}

impl RenderProxyFetcher {
    pub fn new(config: &RenderProxyConfig, credentials: ProxyCredentials) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ScraperError::config(format!(
                "invalid rendering proxy endpoint '{}': {e}",
                config.endpoint
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScraperError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            credentials,
        })
    }
}

impl PageFetcher for RenderProxyFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        debug!(%url, endpoint = %self.endpoint, "fetching product page via rendering proxy");

        let body = RenderRequest {
            source: "universal",
            url: url.as_str(),
            render: true,
        };

        let response = self
            .client
            .post(self.endpoint.as_str())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| ScraperError::Network(format!("{}: {e}", self.endpoint)))?;

        let payload: RenderResponse = ensure_success(self.endpoint.as_str(), response)?
            .json()
            .await
            .map_err(|e| ScraperError::parse(format!("rendering proxy response: {e}")))?;

        payload
            .results
            .into_iter()
            .next()
            .and_then(|r| r.content)
            .ok_or_else(|| ScraperError::parse("rendering proxy returned no 'content'"))
    }

    fn name(&self) -> &str {
        "render"
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ScraperError::config(format!("invalid header value '{value}': {e}")))
}
