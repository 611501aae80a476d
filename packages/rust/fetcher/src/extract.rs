//! Product identifier extraction from page markup.
//!
//! Product pages embed a `<fg-configurator product="...">` custom element
//! whose `product` attribute is the key for the configurator API.

use scraper::{Html, Selector};

use stockscraper_shared::{Result, ScraperError};

/// Custom element that carries the product-group identifier.
pub const CONFIGURATOR_ELEMENT: &str = "fg-configurator";

/// Attribute of [`CONFIGURATOR_ELEMENT`] holding the identifier.
pub const PRODUCT_ATTRIBUTE: &str = "product";

/// Return the `product` attribute of the first `<fg-configurator>` element.
///
/// Fails with [`ScraperError::Extraction`] when the element is missing,
/// lacks the attribute, or the attribute is blank.
pub fn extract_product_id(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(CONFIGURATOR_ELEMENT)
        .map_err(|e| ScraperError::parse(format!("invalid selector: {e}")))?;

    let element = doc.select(&selector).next().ok_or_else(|| {
        ScraperError::extraction(format!(
            "no <{CONFIGURATOR_ELEMENT} {PRODUCT_ATTRIBUTE}=\"...\"> element in page"
        ))
    })?;

    let product = element.value().attr(PRODUCT_ATTRIBUTE).ok_or_else(|| {
        ScraperError::extraction(format!(
            "<{CONFIGURATOR_ELEMENT}> has no '{PRODUCT_ATTRIBUTE}' attribute"
        ))
    })?;

    let product = product.trim();
    if product.is_empty() {
        return Err(ScraperError::extraction(format!(
            "<{CONFIGURATOR_ELEMENT}> has an empty '{PRODUCT_ATTRIBUTE}' attribute"
        )));
    }

    Ok(product.to_string())
}

/// First `max_chars` characters of `html`, for debug output on failures.
pub fn html_snippet(html: &str, max_chars: usize) -> &str {
    match html.char_indices().nth(max_chars) {
        Some((idx, _)) => &html[..idx],
        None => html,
    }
}
