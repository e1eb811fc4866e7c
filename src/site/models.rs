//! Data models for queries, scraped review units, and cleaned reviews.

use serde::{Deserialize, Serialize};

/// Reviewer name used when a review carries none.
pub const ANONYMOUS_REVIEWER: &str = "Anonymous";

/// Input to a scrape run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Product search term
    pub product_name: String,
    /// Number of products (review pages) to scrape
    pub requested_count: u32,
}

impl SearchQuery {
    /// Creates a query. Validation happens when a session executes it.
    pub fn new(product_name: impl Into<String>, requested_count: u32) -> Self {
        Self { product_name: product_name.into(), requested_count }
    }

    /// Returns the trimmed search term.
    pub fn term(&self) -> &str {
        self.product_name.trim()
    }
}

/// A product discovered on a search listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLink {
    /// Listing title, used as the product name hint
    pub title: Option<String>,
    /// Absolute URL of the page holding the product's reviews
    pub url: String,
}

/// One review unit as found on the page. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub product_name: Option<String>,
    pub reviewer_name: Option<String>,
    pub rating_text: Option<String>,
    pub review_title: Option<String>,
    pub review_text: Option<String>,
    pub review_date: Option<String>,
}

/// A review that passed normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Product the review belongs to (never empty)
    pub product_name: String,
    /// Reviewer display name, or [`ANONYMOUS_REVIEWER`]
    pub reviewer_name: String,
    /// Star rating in [1.0, 5.0]
    pub rating: f64,
    /// Review body, possibly empty
    pub review_text: String,
    /// Review headline if the site shows one
    pub review_title: Option<String>,
    /// Review date as displayed by the site
    pub review_date: Option<String>,
}

impl From<NormalizedRecord> for RawRecord {
    fn from(record: NormalizedRecord) -> Self {
        Self {
            product_name: Some(record.product_name),
            reviewer_name: Some(record.reviewer_name),
            rating_text: Some(record.rating.to_string()),
            review_title: record.review_title,
            review_text: Some(record.review_text),
            review_date: record.review_date,
        }
    }
}
