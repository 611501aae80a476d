//! Input loader: the newline-delimited list of product page URLs.

use std::path::Path;

use tracing::{debug, warn};
use url::Url;

use stockscraper_shared::{Result, ScraperError};

/// One entry of the URL list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    /// The trimmed line as written in the list. Output rows carry this.
    pub line: String,
    /// The parsed (normalised) URL used for requests.
    pub url: Url,
}

/// Read the URL list at `path`. See [`parse_url_list`] for the line rules.
pub fn load_urls(path: &Path, limit: Option<usize>) -> Result<Vec<SourceUrl>> {
    let content = std::fs::read_to_string(path).map_err(|e| ScraperError::io(path, e))?;
    let urls = parse_url_list(&content, limit);
    debug!(path = %path.display(), count = urls.len(), "loaded input urls");
    Ok(urls)
}

/// Parse a URL list.
///
/// Lines are trimmed; blank lines and `#` comments are skipped. Lines that
/// are not absolute http(s) URLs are skipped with a warning. At most `limit`
/// URLs are returned.
pub fn parse_url_list(content: &str, limit: Option<usize>) -> Vec<SourceUrl> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|(line_no, line)| match Url::parse(line) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(SourceUrl {
                line: line.to_string(),
                url,
            }),
            Ok(url) => {
                warn!(line = line_no, scheme = url.scheme(), "skipping non-http url");
                None
            }
            Err(e) => {
                warn!(line = line_no, value = line, error = %e, "skipping invalid url");
                None
            }
        })
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_skips_blank_lines() {
        let urls = parse_url_list(
            "  https://shop.example/a  \n\n\t\nhttps://shop.example/b\r\n",
            None,
        );
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].line, "https://shop.example/a");
        assert_eq!(urls[1].line, "https://shop.example/b");
    }

    #[test]
    fn skips_comments_and_invalid_lines() {
        let urls = parse_url_list(
            "# catalogue\nnot a url\nftp://files.example/x\nhttps://shop.example/ok\n",
            None,
        );
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].url.path(), "/ok");
    }

    #[test]
    fn applies_limit() {
        let content = (1..=20)
            .map(|i| format!("https://shop.example/{i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let urls = parse_url_list(&content, Some(10));
        assert_eq!(urls.len(), 10);
        assert_eq!(urls[9].url.path(), "/10");
    }

    #[test]
    fn keeps_the_line_verbatim() {
        let content = "  https://shop.example\nhttps://shop.example/tazas/cerámica  \n";
        let urls = parse_url_list(content, None);

        assert_eq!(urls[0].line, "https://shop.example");
        assert_eq!(urls[0].url.as_str(), "https://shop.example/");
        assert_eq!(urls[1].line, "https://shop.example/tazas/cerámica");
        assert_eq!(urls[1].url.path(), "/tazas/cer%C3%A1mica");
    }

    #[test]
    fn strips_byte_order_mark() {
        let urls = parse_url_list("\u{feff}https://shop.example/a\n", None);
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_urls(Path::new("/nonexistent/referencias.txt"), None).unwrap_err();
        assert!(matches!(err, ScraperError::Io { .. }));
    }
}
