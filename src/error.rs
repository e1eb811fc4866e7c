//! Error taxonomy for the scrape pipeline.
//!
//! Each layer has its own error type so callers can tell a network problem
//! from a layout change from bad input. `ScrapeSession` collapses all of them
//! into a single [`ScrapeFailure`].

use crate::session::RunCounters;
use crate::site::models::RawRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Timeout, connection reset or 5xx. Retried inside the fetcher.
    Transient,
    /// 4xx (other than rate limiting) or a malformed URL. Never retried.
    Permanent,
    /// The site asked us to slow down (429, or 503 throttling).
    RateLimited,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Transient => write!(f, "transient"),
            FetchErrorKind::Permanent => write!(f, "permanent"),
            FetchErrorKind::RateLimited => write!(f, "rate limited"),
        }
    }
}

/// A page could not be fetched.
#[derive(Debug, Clone, Error)]
#[error("{kind} failure fetching {url}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind, url: url.into(), message: message.into() }
    }

    pub fn transient(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transient, url, message)
    }

    pub fn permanent(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Permanent, url, message)
    }

    pub fn rate_limited(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::RateLimited, url, message)
    }

    /// Returns true if another attempt could succeed.
    pub fn is_retriable(&self) -> bool {
        !matches!(self.kind, FetchErrorKind::Permanent)
    }
}

/// A fetched page could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The page's top-level container is missing; the site layout changed.
    #[error("{layout} page layout changed: {detail}")]
    StructuralMismatch { layout: String, detail: String },

    /// A bot-check or error page was served instead of content.
    #[error("{layout} served a blocking page: {detail}")]
    Blocked { layout: String, detail: String },
}

/// Why a pagination run was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationErrorKind {
    /// Too many consecutive fetch failures.
    UpstreamUnavailable,
    /// A page no longer matched the expected layout.
    LayoutChanged,
}

/// Pagination stopped early. Carries the records from pages that were fully
/// extracted before the abort.
#[derive(Debug, Error)]
#[error("pagination aborted ({kind:?}) after {pages_fetched} page(s): {reason}")]
pub struct PaginationError {
    pub kind: PaginationErrorKind,
    pub reason: String,
    pub pages_fetched: u32,
    pub partial: Vec<RawRecord>,
}

/// Terminal failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeFailureKind {
    InvalidQuery,
    UpstreamUnavailable,
    LayoutChanged,
}

impl fmt::Display for ScrapeFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeFailureKind::InvalidQuery => write!(f, "invalid query"),
            ScrapeFailureKind::UpstreamUnavailable => write!(f, "upstream unavailable"),
            ScrapeFailureKind::LayoutChanged => write!(f, "site layout changed"),
        }
    }
}

impl From<PaginationErrorKind> for ScrapeFailureKind {
    fn from(kind: PaginationErrorKind) -> Self {
        match kind {
            PaginationErrorKind::UpstreamUnavailable => ScrapeFailureKind::UpstreamUnavailable,
            PaginationErrorKind::LayoutChanged => ScrapeFailureKind::LayoutChanged,
        }
    }
}

/// The single error a `ScrapeSession` can return.
#[derive(Debug, Clone, Error)]
#[error("scrape failed ({kind}): {message}")]
pub struct ScrapeFailure {
    pub kind: ScrapeFailureKind,
    pub message: String,
    pub counters: RunCounters,
}

impl ScrapeFailure {
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self {
            kind: ScrapeFailureKind::InvalidQuery,
            message: message.into(),
            counters: RunCounters::default(),
        }
    }
}

/// Persistence failed. Never invalidates a dataset already returned.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("nothing to store for '{0}'")]
    Empty(String),
}
