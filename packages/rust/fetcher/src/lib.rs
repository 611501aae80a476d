//! HTTP access to the storefront: product pages and the configurator API.
//!
//! This crate provides:
//! - [`PageFetcher`]: page retrieval, direct ([`DirectFetcher`]) or through a
//!   rendering proxy ([`RenderProxyFetcher`])
//! - [`extract_product_id`]: pulls the product-group identifier out of a page
//! - [`ConfiguratorClient`]: fetches the per-variant stock options

pub mod configurator;
pub mod extract;
pub mod page;

use reqwest::Response;

use stockscraper_shared::{Result, ScraperError};

pub use configurator::{ConfiguratorClient, variant_options};
pub use extract::{CONFIGURATOR_ELEMENT, PRODUCT_ATTRIBUTE, extract_product_id, html_snippet};
pub use page::{DirectFetcher, PageFetcher, RenderProxyFetcher};

/// Turn a non-2xx response into [`ScraperError::Http`].
pub(crate) fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}
