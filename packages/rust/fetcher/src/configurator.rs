//! Client for the product configurator JSON API.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use stockscraper_shared::{
    ApiConfig, ConfiguratorResponse, QUANTITY_PER_VARIANT, Result, ScraperError, VariantOption,
};

use crate::ensure_success;

/// Accept header the storefront's own JavaScript sends.
const API_ACCEPT: &str = "application/json, text/plain, */*";

/// Fetches per-variant stock data for a product-group identifier.
pub struct ConfiguratorClient {
    client: Client,
    config: ApiConfig,
}

impl ConfiguratorClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let origin = HeaderValue::from_str(&config.origin).map_err(|e| {
            ScraperError::config(format!("invalid API origin '{}': {e}", config.origin))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        headers.insert(ORIGIN, origin.clone());
        headers.insert(REFERER, origin);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScraperError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Full request URL:
    /// `{base_url}/products/{id}/configurator?locale=..&layout=..&country=..&color=..`.
    pub fn endpoint(&self, product_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            ScraperError::config(format!("invalid API base URL '{}': {e}", self.config.base_url))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ScraperError::config(format!(
                    "API base URL cannot take a path: {}",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["products", product_id, "configurator"]);

        url.query_pairs_mut()
            .append_pair("locale", &self.config.locale)
            .append_pair("layout", &self.config.layout)
            .append_pair("country", &self.config.country)
            .append_pair("color", &self.config.color);

        Ok(url)
    }

    /// Fetch the configurator and return the `quantity_per_variant` options.
    #[instrument(skip(self))]
    pub async fn fetch_variants(&self, product_id: &str) -> Result<Vec<VariantOption>> {
        let url = self.endpoint(product_id)?;
        debug!(%url, "fetching configurator");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ScraperError::Network(format!("{url}: {e}")))?;

        let body = ensure_success(url.as_str(), response)?
            .text()
            .await
            .map_err(|e| ScraperError::Network(format!("{url}: body read failed: {e}")))?;

        let parsed: ConfiguratorResponse = serde_json::from_str(&body).map_err(|e| {
            ScraperError::parse(format!("configurator response for {product_id}: {e}"))
        })?;

        variant_options(&parsed)
    }
}

/// Options of the first `quantity_per_variant` step; empty when there is none.
///
/// Fields inside an option are read leniently. Only entries that are not
/// objects at all are skipped, with a warning.
pub fn variant_options(response: &ConfiguratorResponse) -> Result<Vec<VariantOption>> {
    let Some(step) = response
        .steps
        .iter()
        .find(|s| s.kind.as_deref() == Some(QUANTITY_PER_VARIANT))
    else {
        debug!("no quantity_per_variant step in configurator");
        return Ok(Vec::new());
    };

    let items = match &step.options {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(ScraperError::parse(format!(
                "quantity_per_variant options is not a list: {other}"
            )));
        }
    };

    let mut options = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<VariantOption>(item.clone()) {
            Ok(option) => options.push(option),
            Err(e) => warn!(index, error = %e, "skipping malformed variant option"),
        }
    }

    Ok(options)
}
