//! review-crawler - Scrape product reviews from retail search results
//!
//! A query is resolved to a search listing, each listed product's review
//! page is fetched with TLS fingerprint emulation, and the reviews are
//! normalized into a de-duplicated dataset ready for display or storage.

pub mod analysis;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod normalizer;
pub mod paginator;
pub mod retry;
pub mod session;
pub mod site;
pub mod store;

pub use config::Config;
pub use dataset::ReviewDataset;
pub use error::{ScrapeFailure, ScrapeFailureKind};
pub use session::{ScrapeOutcome, ScrapeSession};
pub use site::{PageFormat, Region};
