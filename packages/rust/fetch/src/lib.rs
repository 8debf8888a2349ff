//! Course-page content fetcher.
//!
//! Given a URL, issues one bounded-timeout GET and flattens the page into a
//! single text blob: heading/paragraph/list-item text in document order,
//! followed by every table serialized as `|`-joined rows inside explicit
//! begin/end markers (fee schedules usually live in tables).
//!
//! Failures are returned as errors; the orchestrator is the sole caller and
//! degrades them to "no dynamic context available". There is no retry and
//! no crawling — exactly one URL per lookup.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use courseadvisor_shared::{AdvisorError, Result};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("CourseAdvisor/", env!("CARGO_PKG_VERSION"));

/// Marker opening a serialized table block.
const TABLE_BEGIN: &str = "--- TABLE DATA ---";

/// Marker closing a serialized table block.
const TABLE_END: &str = "--- END TABLE DATA ---";

/// Single-URL page fetcher with a bounded timeout.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch `url` and return the flattened page text.
    ///
    /// Non-2xx statuses and transport failures are errors. A page with no
    /// extractable content yields an empty string, which callers treat the
    /// same as a failed fetch.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = Url::parse(url)
            .map_err(|e| AdvisorError::Network(format!("invalid URL '{url}': {e}")))?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AdvisorError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "page fetch returned non-success status");
            return Err(AdvisorError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AdvisorError::Network(format!("{url}: body read failed: {e}")))?;

        let text = extract_page_text(&body);
        debug!(chars = text.len(), "page content extracted");
        Ok(text)
    }
}

/// Flatten an HTML document: prose blocks first, then table blocks.
pub fn extract_page_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut blocks = extract_prose_blocks(&doc);
    blocks.extend(extract_table_blocks(&doc));
    blocks.join("\n")
}

/// Text of heading, paragraph, and list-item elements in document order.
fn extract_prose_blocks(doc: &Html) -> Vec<String> {
    let selector =
        Selector::parse("h1, h2, h3, h4, p, li").expect("valid prose selector");

    doc.select(&selector)
        .filter_map(|el| {
            let text = element_text(&el);
            (!text.is_empty()).then_some(text)
        })
        .collect()
}

/// Every `<table>` serialized as newline-separated rows of `|`-joined cells,
/// wrapped in begin/end markers.
fn extract_table_blocks(doc: &Html) -> Vec<String> {
    let table_sel = Selector::parse("table").expect("valid table selector");
    let row_sel = Selector::parse("tr").expect("valid row selector");
    let cell_sel = Selector::parse("td, th").expect("valid cell selector");

    doc.select(&table_sel)
        .filter_map(|table| {
            let rows: Vec<String> = table
                .select(&row_sel)
                .filter_map(|row| {
                    let cells: Vec<String> =
                        row.select(&cell_sel).map(|c| element_text(&c)).collect();
                    (!cells.is_empty()).then(|| cells.join("|"))
                })
                .collect();

            (!rows.is_empty())
                .then(|| format!("{TABLE_BEGIN}\n{}\n{TABLE_END}", rows.join("\n")))
        })
        .collect()
}

/// Collapsed, trimmed text content of one element.
fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURSE_PAGE: &str = r#"<html><body>
        <h1>Specialist Diploma in Construction Management</h1>
        <p>EVENT CODE: SDCM01</p>
        <ul><li>12 months part-time</li><li>Evening classes</li></ul>
        <table>
            <tr><th>Fee Type</th><th>Amount</th></tr>
            <tr><td>Full fee</td><td>S$5,350.00</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn prose_extracted_in_document_order() {
        let text = extract_page_text(COURSE_PAGE);
        let h1 = text.find("Specialist Diploma in Construction Management").unwrap();
        let code = text.find("EVENT CODE: SDCM01").unwrap();
        let li = text.find("12 months part-time").unwrap();
        assert!(h1 < code && code < li);
    }

    #[test]
    fn tables_serialized_with_markers_after_prose() {
        let text = extract_page_text(COURSE_PAGE);
        assert!(text.contains("--- TABLE DATA ---\nFee Type|Amount\nFull fee|S$5,350.00\n--- END TABLE DATA ---"));
        // Table blocks come after all prose blocks.
        assert!(text.find("Evening classes").unwrap() < text.find(TABLE_BEGIN).unwrap());
    }

    #[test]
    fn empty_elements_skipped() {
        let text = extract_page_text("<html><body><p>  </p><p>kept</p><table></table></body></html>");
        assert_eq!(text, "kept");
    }

    #[test]
    fn nested_markup_flattened() {
        let text = extract_page_text("<p>Fees are <strong>S$5,350.00</strong> nett.</p>");
        assert_eq!(text, "Fees are S$5,350.00 nett.");
    }

    #[tokio::test]
    async fn fetch_returns_extracted_text() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/sdcm"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(COURSE_PAGE))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(10).unwrap();
        let text = fetcher
            .fetch_text(&format!("{}/sdcm", server.uri()))
            .await
            .unwrap();

        assert!(text.contains("EVENT CODE: SDCM01"));
        assert!(text.contains(TABLE_BEGIN));
    }

    #[tokio::test]
    async fn invalid_url_is_an_error() {
        let fetcher = PageFetcher::new(10).unwrap();
        let err = fetcher.fetch_text("not a url").await.unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/missing"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(10).unwrap();
        let err = fetcher
            .fetch_text(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/slow"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<p>late</p>")
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(1).unwrap();
        assert!(fetcher.fetch_text(&format!("{}/slow", server.uri())).await.is_err());
    }
}
