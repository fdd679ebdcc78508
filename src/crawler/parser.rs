//! Link extraction
//!
//! This module defines the `LinkExtractor` capability the extract stage
//! runs, and its default HTML implementation, which collects the links to
//! follow from `<a>` tags and canonical links.

use crate::crawler::fetcher::Document;
use crate::CrawlError;
use scraper::{Html, Selector};
use url::Url;

/// Produces the outbound links of a downloaded document
///
/// Extraction is synchronous and may be CPU-heavy; the pipeline runs it on
/// the blocking thread pool. A failure only drops this document's links.
pub trait LinkExtractor: Send + Sync {
    /// Returns the absolute URLs `document` links to
    fn extract_links(&self, document: &Document) -> Result<Vec<String>, CrawlError>;
}

impl<F> LinkExtractor for F
where
    F: Fn(&Document) -> Result<Vec<String>, CrawlError> + Send + Sync,
{
    fn extract_links(&self, document: &Document) -> Result<Vec<String>, CrawlError> {
        self(document)
    }
}

/// Extracts links from HTML documents with `scraper`
///
/// Relative links resolve against the URL the document was served from.
/// Documents whose content type is not HTML have no links.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, document: &Document) -> Result<Vec<String>, CrawlError> {
        if !document.is_html() {
            return Ok(Vec::new());
        }

        let base_url = Url::parse(&document.final_url).map_err(|e| CrawlError::Extract {
            url: document.url.clone(),
            message: format!("invalid base URL: {}", e),
        })?;

        parse_html(&document.body, &base_url)
            .map(|parsed| parsed.links)
            .map_err(|message| CrawlError::Extract {
                url: document.url.clone(),
                message,
            })
    }
}

/// Links extracted from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// All links found on the page (absolute URLs)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts its links
///
/// Links come from `<a href>` (except `download` anchors) and
/// `<link rel="canonical">`. They are resolved against `base_url`, stripped
/// of fragments and deduplicated in document order. `javascript:`,
/// `mailto:`, `tel:` and `data:` targets, fragment-only anchors and
/// non-HTTP(S) results are skipped. `rel="nofollow"` links are followed.
///
/// # Example
///
/// ```
/// use fanout_crawler::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url).unwrap();
/// assert_eq!(parsed.links, vec!["https://example.com/page"]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> Result<ParsedPage, String> {
    let document = Html::parse_document(html);

    Ok(ParsedPage {
        links: extract_links(&document, base_url)?,
    })
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("bad selector '{}': {:?}", css, e))
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<String>, String> {
    let link_selector = selector("a[href], link[rel='canonical'][href]")?;
    let mut seen = std::collections::HashSet::new();

    Ok(document
        .select(&link_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|link| seen.insert(link.clone()))
        .collect())
}

/// Resolves a link href to an absolute HTTP(S) URL without fragment
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if !matches!(absolute_url.scheme(), "http" | "https") {
        return None;
    }
    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}
