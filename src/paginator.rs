//! Drives fetching and extraction across the product pages of one query.
//!
//! The run is an explicit state machine:
//!
//! ```text
//! Start -> FetchingPage(n) -> Extracting(n) -> FetchingPage(n+1) | Done | Aborted
//! ```
//!
//! `Start` resolves the search listing into product links. Page `n` is the
//! review page of the `n`th product. Pages are processed strictly in order
//! and each page is extracted completely before the next fetch.

use crate::error::{ExtractError, FetchError, PaginationError, PaginationErrorKind};
use crate::fetcher::PageFetcher;
use crate::session::ScrapeRun;
use crate::site::models::{ProductLink, RawRecord, SearchQuery};
use crate::site::RecordExtractor;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Limits applied to one pagination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    /// Attempts per page handed to the fetcher
    pub attempt_budget: u32,
    /// Consecutive failed pages that abort the run
    pub max_consecutive_failures: u32,
    /// Hard ceiling on pages regardless of the requested count
    pub max_pages: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self { attempt_budget: 3, max_consecutive_failures: 3, max_pages: 10 }
    }
}

/// Why a run finished normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page had no reviews, or the listing ran out of products
    Exhausted,
    /// The page cap was reached
    PageCap,
    /// Enough pages were fetched successfully
    YieldReached,
    /// The search listing had no products
    NoProducts,
    /// The caller abandoned the run
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Exhausted => "no more reviews",
            StopReason::PageCap => "page cap reached",
            StopReason::YieldReached => "requested pages fetched",
            StopReason::NoProducts => "no products found",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Records gathered by a completed run.
#[derive(Debug)]
pub struct Pagination {
    pub records: Vec<RawRecord>,
    pub stop: StopReason,
}

#[derive(Debug)]
enum PageState {
    Start,
    FetchingPage(usize),
    Extracting(usize, String),
    Done(StopReason),
    Aborted(PaginationErrorKind, String),
}

/// A page that could not be turned into records.
enum PageFailure {
    Fetch(FetchError),
    Extract(ExtractError),
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFailure::Fetch(e) => write!(f, "{}", e),
            PageFailure::Extract(e) => write!(f, "{}", e),
        }
    }
}

/// Walks the product pages of a query.
pub struct Paginator<'a> {
    fetcher: &'a dyn PageFetcher,
    extractor: &'a dyn RecordExtractor,
    settings: PaginationSettings,
    cancel: CancellationToken,
}

impl<'a> Paginator<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        extractor: &'a dyn RecordExtractor,
        settings: PaginationSettings,
    ) -> Self {
        Self { fetcher, extractor, settings, cancel: CancellationToken::new() }
    }

    /// Uses `cancel` to let the caller abandon the run between pages.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the state machine to completion, updating `run`'s counters.
    pub async fn run(
        &self,
        query: &SearchQuery,
        run: &mut ScrapeRun,
    ) -> Result<Pagination, PaginationError> {
        let requested = query.requested_count.max(1);
        let mut records: Vec<RawRecord> = Vec::new();
        let mut links: Vec<ProductLink> = Vec::new();
        let mut consecutive_failures = 0u32;
        let mut state = PageState::Start;

        loop {
            debug!(run = %run.id, state = ?StateLabel(&state), "pagination step");

            state = match state {
                PageState::Start => {
                    if self.cancel.is_cancelled() {
                        PageState::Done(StopReason::Cancelled)
                    } else {
                        match self.resolve_listing(query).await {
                            Ok(found) if found.is_empty() => PageState::Done(StopReason::NoProducts),
                            Ok(found) => {
                                consecutive_failures = 0;
                                let cap = requested.min(self.settings.max_pages.max(1)) as usize;
                                links = found.into_iter().take(cap).collect();
                                info!(run = %run.id, pages = links.len(), "resolved product pages");
                                PageState::FetchingPage(0)
                            }
                            Err(failure) => self.on_failure(
                                failure,
                                run,
                                &mut consecutive_failures,
                                PageState::Start,
                            ),
                        }
                    }
                }

                PageState::FetchingPage(n) if n >= links.len() => {
                    let reason = if links.len() < requested as usize
                        && links.len() < self.settings.max_pages as usize
                    {
                        StopReason::Exhausted
                    } else {
                        StopReason::PageCap
                    };
                    PageState::Done(reason)
                }

                PageState::FetchingPage(n) => {
                    if self.cancel.is_cancelled() {
                        PageState::Done(StopReason::Cancelled)
                    } else {
                        run.counters.pages_attempted += 1;
                        match self.fetcher.fetch(&links[n].url, self.settings.attempt_budget).await
                        {
                            Ok(html) => PageState::Extracting(n, html),
                            Err(e) => self.on_failure(
                                PageFailure::Fetch(e),
                                run,
                                &mut consecutive_failures,
                                PageState::FetchingPage(n + 1),
                            ),
                        }
                    }
                }

                PageState::Extracting(n, html) => {
                    match self.extractor.extract(&html, links[n].title.as_deref()) {
                        Ok(page_records) => {
                            consecutive_failures = 0;
                            run.counters.pages_fetched += 1;
                            debug!(
                                run = %run.id,
                                page = n + 1,
                                records = page_records.len(),
                                "extracted page"
                            );

                            if page_records.is_empty() {
                                PageState::Done(StopReason::Exhausted)
                            } else {
                                records.extend(page_records);
                                if run.counters.pages_fetched >= requested {
                                    PageState::Done(StopReason::YieldReached)
                                } else {
                                    PageState::FetchingPage(n + 1)
                                }
                            }
                        }
                        Err(ExtractError::StructuralMismatch { layout, detail }) => {
                            run.counters.errors_seen += 1;
                            PageState::Aborted(
                                PaginationErrorKind::LayoutChanged,
                                format!("{} page {} layout changed: {}", layout, n + 1, detail),
                            )
                        }
                        Err(blocked) => self.on_failure(
                            PageFailure::Extract(blocked),
                            run,
                            &mut consecutive_failures,
                            PageState::FetchingPage(n + 1),
                        ),
                    }
                }

                PageState::Done(stop) => {
                    info!(
                        run = %run.id,
                        pages = run.counters.pages_fetched,
                        records = records.len(),
                        "pagination done: {}",
                        stop
                    );
                    return Ok(Pagination { records, stop });
                }

                PageState::Aborted(kind, reason) => {
                    warn!(run = %run.id, "pagination aborted: {}", reason);
                    return Err(PaginationError {
                        kind,
                        reason,
                        pages_fetched: run.counters.pages_fetched,
                        partial: records,
                    });
                }
            };
        }
    }

    /// Fetches the search listing and lists its products.
    async fn resolve_listing(&self, query: &SearchQuery) -> Result<Vec<ProductLink>, PageFailure> {
        let url = self.extractor.search_url(query.term());
        let html = self
            .fetcher
            .fetch(&url, self.settings.attempt_budget)
            .await
            .map_err(PageFailure::Fetch)?;
        self.extractor.product_links(&html).map_err(PageFailure::Extract)
    }

    /// Counts a failed page; aborts once the consecutive threshold is hit.
    fn on_failure(
        &self,
        failure: PageFailure,
        run: &mut ScrapeRun,
        consecutive_failures: &mut u32,
        next: PageState,
    ) -> PageState {
        if let PageFailure::Extract(ExtractError::StructuralMismatch { .. }) = &failure {
            run.counters.errors_seen += 1;
            return PageState::Aborted(PaginationErrorKind::LayoutChanged, failure.to_string());
        }

        run.counters.errors_seen += 1;
        *consecutive_failures += 1;
        warn!(
            run = %run.id,
            consecutive = *consecutive_failures,
            threshold = self.settings.max_consecutive_failures,
            "page failed: {}",
            failure
        );

        if *consecutive_failures >= self.settings.max_consecutive_failures.max(1) {
            PageState::Aborted(
                PaginationErrorKind::UpstreamUnavailable,
                format!("{} consecutive failures, last: {}", consecutive_failures, failure),
            )
        } else {
            next
        }
    }
}

/// Debug view of a state without the page body.
struct StateLabel<'s>(&'s PageState);

impl fmt::Debug for StateLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            PageState::Start => write!(f, "Start"),
            PageState::FetchingPage(n) => write!(f, "FetchingPage({})", n + 1),
            PageState::Extracting(n, _) => write!(f, "Extracting({})", n + 1),
            PageState::Done(stop) => write!(f, "Done({:?})", stop),
            PageState::Aborted(kind, _) => write!(f, "Aborted({:?})", kind),
        }
    }
}
