//! End-to-end scrape orchestration.

use crate::dataset::ReviewDataset;
use crate::error::{ScrapeFailure, ScrapeFailureKind};
use crate::fetcher::PageFetcher;
use crate::normalizer::Normalizer;
use crate::paginator::{PaginationSettings, Paginator, StopReason};
use crate::site::models::SearchQuery;
use crate::site::RecordExtractor;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Counters reported for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub pages_attempted: u32,
    pub pages_fetched: u32,
    pub records_kept: usize,
    pub records_dropped: usize,
    pub records_folded: usize,
    pub errors_seen: u32,
}

/// Mutable state of one run. Created and owned by a single session execution.
#[derive(Debug)]
pub struct ScrapeRun {
    pub id: Uuid,
    pub counters: RunCounters,
}

impl ScrapeRun {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), counters: RunCounters::default() }
    }
}

impl Default for ScrapeRun {
    fn default() -> Self {
        Self::new()
    }
}

/// How complete a returned dataset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum RunStatus {
    /// Pagination finished normally.
    Complete(StopReason),
    /// Pagination aborted after some pages; only those pages are included.
    Partial(ScrapeFailureKind),
}

/// A usable result of a run.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub run_id: Uuid,
    pub query: SearchQuery,
    pub dataset: ReviewDataset,
    pub counters: RunCounters,
    pub status: RunStatus,
}

impl ScrapeOutcome {
    pub fn is_partial(&self) -> bool {
        matches!(self.status, RunStatus::Partial(_))
    }
}

/// Runs queries against one site layout.
///
/// A session holds no per-run state, so one session may execute several
/// queries concurrently; each execution owns its own [`ScrapeRun`].
pub struct ScrapeSession<'a> {
    fetcher: &'a dyn PageFetcher,
    extractor: &'a dyn RecordExtractor,
    settings: PaginationSettings,
    cancel: CancellationToken,
}

impl<'a> ScrapeSession<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        extractor: &'a dyn RecordExtractor,
        settings: PaginationSettings,
    ) -> Self {
        Self { fetcher, extractor, settings, cancel: CancellationToken::new() }
    }

    /// Lets the caller abandon runs between pages.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validates, paginates, and normalizes one query.
    pub async fn execute(&self, query: SearchQuery) -> Result<ScrapeOutcome, ScrapeFailure> {
        validate(&query)?;

        let mut run = ScrapeRun::new();
        info!(
            run = %run.id,
            site = %self.extractor.format(),
            query = query.term(),
            count = query.requested_count,
            "starting scrape"
        );

        let paginator = Paginator::new(self.fetcher, self.extractor, self.settings)
            .with_cancellation(self.cancel.clone());

        let (raw, status) = match paginator.run(&query, &mut run).await {
            Ok(pagination) => (pagination.records, RunStatus::Complete(pagination.stop)),
            Err(err) => {
                let kind = ScrapeFailureKind::from(err.kind);
                if err.pages_fetched == 0 {
                    return Err(ScrapeFailure {
                        kind,
                        message: err.reason,
                        counters: run.counters,
                    });
                }
                warn!(
                    run = %run.id,
                    pages = err.pages_fetched,
                    "returning partial dataset: {}",
                    err.reason
                );
                (err.partial, RunStatus::Partial(kind))
            }
        };

        let normalized = Normalizer::new().normalize(raw);
        run.counters.records_kept = normalized.dataset.len();
        run.counters.records_dropped = normalized.stats.dropped;
        run.counters.records_folded = normalized.stats.folded;

        info!(
            run = %run.id,
            pages = run.counters.pages_fetched,
            kept = run.counters.records_kept,
            dropped = run.counters.records_dropped,
            folded = run.counters.records_folded,
            "scrape finished"
        );

        Ok(ScrapeOutcome {
            run_id: run.id,
            query,
            dataset: normalized.dataset,
            counters: run.counters,
            status,
        })
    }
}

fn validate(query: &SearchQuery) -> Result<(), ScrapeFailure> {
    if query.term().is_empty() {
        return Err(ScrapeFailure::invalid_query("product name must not be empty"));
    }
    if query.requested_count == 0 {
        return Err(ScrapeFailure::invalid_query("requested count must be positive"));
    }
    Ok(())
}
