//! Scrape command implementation.

use crate::config::Config;
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::format::Formatter;
use crate::session::{ScrapeOutcome, ScrapeSession};
use crate::site::extractor_for;
use crate::site::models::SearchQuery;
use crate::store::{ReviewStore, SqliteStore};
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Scrapes reviews for a product query.
pub struct ScrapeCommand {
    config: Config,
    cancel: CancellationToken,
}

impl ScrapeCommand {
    /// Creates a new scrape command.
    pub fn new(config: Config) -> Self {
        Self { config, cancel: CancellationToken::new() }
    }

    /// Lets the caller stop the run between pages (e.g. on Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Executes the scrape and returns formatted output.
    pub async fn execute(&self, product: &str, count: u32) -> Result<String> {
        let fetcher = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;
        self.execute_with_fetcher(&fetcher, product, count).await
    }

    /// Executes the scrape with a provided fetcher (for testing).
    pub async fn execute_with_fetcher(
        &self,
        fetcher: &dyn PageFetcher,
        product: &str,
        count: u32,
    ) -> Result<String> {
        let outcome = self.scrape(fetcher, product, count).await?;
        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_outcome(&outcome))
    }

    /// Runs a session and stores the dataset when a database is configured.
    pub async fn scrape(
        &self,
        fetcher: &dyn PageFetcher,
        product: &str,
        count: u32,
    ) -> Result<ScrapeOutcome> {
        let base_url = self.config.base_url();
        let extractor = extractor_for(self.config.site, &base_url);
        info!("Scraping {} reviews for: {} ({})", self.config.site, product, base_url);

        let session =
            ScrapeSession::new(fetcher, extractor.as_ref(), self.config.pagination_settings())
                .with_cancellation(self.cancel.clone());

        let outcome = session.execute(SearchQuery::new(product, count)).await?;

        if outcome.is_partial() {
            warn!("Returning a partial dataset ({} reviews)", outcome.dataset.len());
        }

        self.persist(&outcome).await;
        Ok(outcome)
    }

    /// Store failures never affect the returned dataset.
    ///
    /// SQLite I/O runs on the blocking pool so the runtime stays free.
    async fn persist(&self, outcome: &ScrapeOutcome) {
        let Some(path) = self.config.database.clone() else {
            return;
        };
        if outcome.dataset.is_empty() {
            return;
        }

        let term = outcome.query.term().to_string();
        let dataset = outcome.dataset.clone();
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            SqliteStore::open(&target).and_then(|store| store.store(&term, &dataset))
        })
        .await;

        match result {
            Ok(Ok(ack)) => info!("Stored {} reviews (batch {})", ack.rows, ack.batch_id),
            Ok(Err(e)) => warn!("Failed to store reviews in {}: {}", path.display(), e),
            Err(e) => warn!("Store task for {} did not finish: {}", path.display(), e),
        }
    }
}
