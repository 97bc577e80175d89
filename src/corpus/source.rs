//! Streaming review source backed by the HuggingFace datasets-server.
//!
//! The rows API serves a dataset split in pages. [`HfRowsSource`] turns those
//! pages into a lazy stream of [`LabeledExample`]s: a page is only requested
//! once the consumer has drained the previous one, so dropping the stream
//! stops all further network traffic.

use futures::stream::BoxStream;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use super::types::{Label, LabeledExample, SourceError, SourceResult, Split};

/// Default dataset name for the IMDB reviews on HuggingFace.
pub const DEFAULT_DATASET: &str = "stanfordnlp/imdb";

/// Dataset configuration holding the text/label columns.
const DEFAULT_CONFIG: &str = "plain_text";

/// Base URL for HuggingFace datasets server rows API.
const HUGGINGFACE_ROWS_API: &str = "https://datasets-server.huggingface.co/rows";

/// The rows API refuses pages longer than this.
const MAX_PAGE_SIZE: usize = 100;

/// A boxed stream of labeled examples.
pub type ExampleStream<'a> = BoxStream<'a, SourceResult<LabeledExample>>;

/// A sequential, labeled review corpus split into train and test.
pub trait ReviewSource {
    /// Opens a stream over every example of `split`, in upstream order.
    fn stream(&self, split: Split) -> ExampleStream<'_>;
}

/// Configuration for the rows source.
#[derive(Debug, Clone)]
pub struct HfRowsConfig {
    /// HuggingFace dataset identifier.
    pub dataset: String,
    /// Dataset configuration name.
    pub config: String,
    /// Rows requested per page (clamped to the API maximum).
    pub page_size: usize,
    /// Delay between page requests in milliseconds.
    pub page_delay_ms: u64,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for HfRowsConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            config: DEFAULT_CONFIG.to_string(),
            page_size: MAX_PAGE_SIZE,
            page_delay_ms: 0,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Review source paging through the HuggingFace rows API.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use imdb_forge::corpus::{HfRowsSource, ReviewSource, Split};
///
/// let source = HfRowsSource::new()?;
/// let mut rows = source.stream(Split::Train);
/// while let Some(example) = rows.next().await {
///     println!("{:?}", example?.label);
/// }
/// ```
pub struct HfRowsSource {
    http_client: Client,
    config: HfRowsConfig,
}

impl HfRowsSource {
    /// Creates a source for the IMDB dataset with default settings.
    pub fn new() -> SourceResult<Self> {
        Self::with_config(HfRowsConfig::default())
    }

    /// Creates a source with custom settings.
    pub fn with_config(config: HfRowsConfig) -> SourceResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::HttpError(e.to_string()))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Get the current dataset name.
    pub fn dataset_name(&self) -> &str {
        &self.config.dataset
    }

    fn page_size(&self) -> usize {
        self.config.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    fn page_url(&self, split: Split, offset: usize) -> SourceResult<Url> {
        Url::parse_with_params(
            HUGGINGFACE_ROWS_API,
            &[
                ("dataset", self.config.dataset.clone()),
                ("config", self.config.config.clone()),
                ("split", split.as_str().to_string()),
                ("offset", offset.to_string()),
                ("length", self.page_size().to_string()),
            ],
        )
        .map_err(|e| SourceError::HttpError(format!("Invalid rows URL: {}", e)))
    }

    /// Fetches one page of rows starting at `offset`.
    async fn fetch_page(&self, split: Split, offset: usize) -> SourceResult<RowsResponse> {
        let url = self.page_url(split, offset)?;

        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::HttpError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(SourceError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SourceError::HttpError(format!(
                "API returned status {}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::HttpError(e.to_string()))?;
        parse_rows_page(&body)
    }
}

impl ReviewSource for HfRowsSource {
    fn stream(&self, split: Split) -> ExampleStream<'_> {
        let stream = async_stream::stream! {
            let mut offset = 0usize;
            loop {
                tracing::debug!(split = %split, offset, "Fetching rows page");
                let page = match self.fetch_page(split, offset).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                if page.rows.is_empty() {
                    return;
                }

                let total = page.num_rows_total;
                offset += page.rows.len();
                for row in page.rows {
                    let item: SourceResult<LabeledExample> = row.into_example();
                    let failed = item.is_err();
                    yield item;
                    if failed {
                        return;
                    }
                }

                if total.is_some_and(|total| offset >= total) {
                    return;
                }
                if self.config.page_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
                }
            }
        };
        Box::pin(stream)
    }
}

/// Parses a rows API response body.
fn parse_rows_page(body: &str) -> SourceResult<RowsResponse> {
    serde_json::from_str(body)
        .map_err(|e| SourceError::ParseError(format!("Failed to parse response: {}", e)))
}

/// Response structure from HuggingFace rows API.
#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<Row>,
    num_rows_total: Option<usize>,
}

/// A single row from the HuggingFace dataset.
#[derive(Debug, Deserialize)]
struct Row {
    row_idx: usize,
    row: ReviewRow,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    text: String,
    label: i64,
}

impl Row {
    fn into_example(self) -> SourceResult<LabeledExample> {
        let label = Label::from_class(self.row.label).ok_or(SourceError::UnexpectedLabel {
            row: self.row_idx,
            label: self.row.label,
        })?;
        Ok(LabeledExample::new(self.row.text, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "features": [],
        "rows": [
            {"row_idx": 0, "row": {"text": "Dull.<br />Skip it", "label": 0}, "truncated_cells": []},
            {"row_idx": 1, "row": {"text": "A delight", "label": 1}, "truncated_cells": []}
        ],
        "num_rows_total": 25000,
        "num_rows_per_page": 100,
        "partial": false
    }"#;

    #[test]
    fn test_parse_rows_page() {
        let page = parse_rows_page(PAGE).expect("page should parse");
        assert_eq!(page.num_rows_total, Some(25000));
        let examples: Vec<_> = page
            .rows
            .into_iter()
            .map(|r| r.into_example().expect("valid row"))
            .collect();
        assert_eq!(examples[0].label, Label::Neg);
        assert_eq!(examples[0].text, "Dull. Skip it");
        assert_eq!(examples[1].label, Label::Pos);
    }

    #[test]
    fn test_unexpected_label_is_error() {
        let row = Row {
            row_idx: 7,
            row: ReviewRow {
                text: "?".to_string(),
                label: -1,
            },
        };
        assert!(matches!(
            row.into_example(),
            Err(SourceError::UnexpectedLabel { row: 7, label: -1 })
        ));
    }

    #[test]
    fn test_malformed_page_is_parse_error() {
        assert!(matches!(
            parse_rows_page("{\"error\": \"nope\"}"),
            Err(SourceError::ParseError(_))
        ));
    }

    #[test]
    fn test_page_url_encodes_dataset() {
        let source = HfRowsSource::with_config(HfRowsConfig {
            page_size: 500,
            ..HfRowsConfig::default()
        })
        .expect("client builds");
        let url = source.page_url(Split::Test, 200).expect("valid url");
        let query = url.query().unwrap_or_default();
        assert!(query.contains("dataset=stanfordnlp%2Fimdb"));
        assert!(query.contains("split=test"));
        assert!(query.contains("offset=200"));
        assert!(query.contains("length=100"));
    }

    #[tokio::test]
    #[ignore] // Requires network access to datasets-server.huggingface.co
    async fn test_stream_first_rows() {
        use futures::StreamExt;

        let source = HfRowsSource::new().expect("client builds");
        let first: Vec<_> = source.stream(Split::Test).take(3).collect().await;
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|r| r.is_ok()));
    }
}
