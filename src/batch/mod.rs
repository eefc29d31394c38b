// src/batch/mod.rs
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::bbref::{Fetcher, StatRequest, StatType, DEFAULT_BASE_URL};
use crate::extractors::{StatTable, TableExtractor};
use crate::utils::error::{ExtractError, FetchError};

pub const SEASON_COLUMN: &str = "Season";
pub const STAT_TYPE_COLUMN: &str = "StatType";

/// Why a request contributed no rows.
#[derive(Debug)]
pub enum SkipReason {
    Fetch(FetchError),
    Extract(ExtractError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Fetch(e) => write!(f, "fetch failed: {}", e),
            SkipReason::Extract(e) => write!(f, "{}", e),
        }
    }
}

impl Serialize for SkipReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Serialize)]
pub struct SkippedRequest {
    pub request: StatRequest,
    pub url: String,
    pub reason: SkipReason,
}

/// Outcome of one batch: the combined table, if any request produced one,
/// plus every request that was skipped and why.
#[derive(Debug)]
pub struct BatchReport {
    pub requested: usize,
    pub combined: Option<StatTable>,
    pub skipped: Vec<SkippedRequest>,
}

impl BatchReport {
    /// Number of requests that produced a table.
    pub fn succeeded(&self) -> usize {
        self.requested.saturating_sub(self.skipped.len())
    }
}

/// Runs batches of requests strictly one after another.
pub struct BatchRunner<F: Fetcher> {
    fetcher: F,
    extractor: TableExtractor,
    base_url: String,
    raw_page_dir: Option<PathBuf>,
}

impl<F: Fetcher> BatchRunner<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            extractor: TableExtractor::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            raw_page_dir: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }

    pub fn with_extractor(mut self, extractor: TableExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Debug mode: keep every fetched page as `{year}_{short}.html` in `dir`.
    pub fn with_raw_page_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_page_dir = Some(dir.into());
        self
    }

    /// Fetches every year x stat type combination, years outermost.
    pub async fn fetch_season_player_stats(&self, years: &[u32], stat_types: &[StatType]) -> BatchReport {
        self.fetch_batch(&StatRequest::cartesian(years, stat_types)).await
    }

    /// Fetches, extracts and tags each request in order, then concatenates
    /// the tables. Failed requests are logged, recorded and skipped.
    pub async fn fetch_batch(&self, requests: &[StatRequest]) -> BatchReport {
        let mut tables = Vec::new();
        let mut skipped = Vec::new();

        for request in requests {
            let url = request.url(&self.base_url);
            tracing::info!("Fetching data from: {}", url);

            match self.fetch_one(request, &url).await {
                Ok(mut table) => {
                    tracing::info!(
                        "{}: {} rows x {} columns",
                        request,
                        table.len(),
                        table.columns().len()
                    );
                    table.set_constant_column(SEASON_COLUMN, &request.year.to_string());
                    table.set_constant_column(STAT_TYPE_COLUMN, request.stat_type.label());
                    tables.push(table);
                }
                Err(reason) => {
                    match &reason {
                        SkipReason::Extract(ExtractError::TableNotFound) => {
                            tracing::warn!("No table found at {}", url)
                        }
                        other => tracing::warn!("Skipping {} ({}): {}", request, url, other),
                    }
                    skipped.push(SkippedRequest { request: *request, url, reason });
                }
            }
        }

        let combined = StatTable::concat(tables, &[SEASON_COLUMN, STAT_TYPE_COLUMN]);
        if combined.is_none() {
            tracing::warn!("None of the {} requests produced a table", requests.len());
        }
        BatchReport { requested: requests.len(), combined, skipped }
    }

    async fn fetch_one(&self, request: &StatRequest, url: &str) -> Result<StatTable, SkipReason> {
        let html = self.fetcher.fetch(url).await.map_err(SkipReason::Fetch)?;
        tracing::debug!("Downloaded {} bytes for {}", html.len(), request);

        if let Some(dir) = &self.raw_page_dir {
            self.save_raw_page(dir, request, &html);
        }

        self.extractor.extract_table(&html).map_err(SkipReason::Extract)
    }

    fn save_raw_page(&self, dir: &Path, request: &StatRequest, html: &str) {
        let path = dir.join(format!("{}_{}.html", request.year, request.stat_type.short_name()));
        let result = fs::create_dir_all(dir).and_then(|_| fs::write(&path, html));
        match result {
            Ok(()) => tracing::info!("Saved raw page to: {}", path.display()),
            Err(e) => tracing::warn!("Failed to save raw page {}: {}", path.display(), e),
        }
    }
}
