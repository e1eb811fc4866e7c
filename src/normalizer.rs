//! Turns raw review units into validated, de-duplicated records.

use crate::dataset::ReviewDataset;
use crate::site::models::{NormalizedRecord, RawRecord, ANONYMOUS_REVIEWER};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Lowest and highest accepted star rating.
pub const RATING_RANGE: (f64, f64) = (1.0, 5.0);

/// What happened to the records of one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    /// Records excluded for any reason
    pub dropped: usize,
    /// Duplicates folded into an earlier record
    pub folded: usize,
    /// Dropped because the rating text had no number
    pub unparseable_rating: usize,
    /// Dropped because the rating was outside [1, 5]
    pub out_of_range: usize,
    /// Dropped because no product name was known
    pub missing_product: usize,
}

/// Result of [`Normalizer::normalize`].
#[derive(Debug, Clone)]
pub struct Normalized {
    pub dataset: ReviewDataset,
    pub stats: NormalizeStats,
}

impl Normalized {
    pub fn drop_count(&self) -> usize {
        self.stats.dropped
    }
}

/// Why a single record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    UnparseableRating,
    OutOfRange,
    MissingProduct,
}

/// Normalizes the records of one run.
#[derive(Debug, Default)]
pub struct Normalizer {
    /// Lowercased product name -> first spelling seen
    product_spellings: HashMap<String, String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cleans, validates and de-duplicates `records`, keeping discovery order.
    pub fn normalize(mut self, records: Vec<RawRecord>) -> Normalized {
        let mut stats = NormalizeStats::default();
        let mut seen: HashSet<(String, String, String)> = HashSet::new();
        let mut kept: Vec<NormalizedRecord> = Vec::with_capacity(records.len());

        for raw in records {
            let record = match self.normalize_one(raw) {
                Ok(record) => record,
                Err(rejection) => {
                    trace!("Dropping record: {:?}", rejection);
                    stats.dropped += 1;
                    match rejection {
                        Rejection::UnparseableRating => stats.unparseable_rating += 1,
                        Rejection::OutOfRange => stats.out_of_range += 1,
                        Rejection::MissingProduct => stats.missing_product += 1,
                    }
                    continue;
                }
            };

            let key = (
                record.product_name.clone(),
                record.reviewer_name.clone(),
                record.review_text.clone(),
            );
            if !seen.insert(key) {
                stats.folded += 1;
                continue;
            }

            kept.push(record);
        }

        debug!(
            "Normalized {} records ({} dropped, {} folded)",
            kept.len(),
            stats.dropped,
            stats.folded
        );

        Normalized { dataset: ReviewDataset::from_records(kept), stats }
    }

    fn normalize_one(&mut self, raw: RawRecord) -> Result<NormalizedRecord, Rejection> {
        let product_name = raw
            .product_name
            .as_deref()
            .map(collapse_whitespace)
            .filter(|name| !name.is_empty())
            .ok_or(Rejection::MissingProduct)?;

        let rating = raw
            .rating_text
            .as_deref()
            .and_then(parse_rating)
            .ok_or(Rejection::UnparseableRating)?;

        if !(RATING_RANGE.0..=RATING_RANGE.1).contains(&rating) {
            return Err(Rejection::OutOfRange);
        }

        let reviewer_name = raw
            .reviewer_name
            .as_deref()
            .map(collapse_whitespace)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ANONYMOUS_REVIEWER.to_string());

        Ok(NormalizedRecord {
            product_name: self.canonical_product(product_name),
            reviewer_name,
            rating,
            review_text: raw.review_text.as_deref().map(str::trim).unwrap_or_default().to_string(),
            review_title: trimmed_option(raw.review_title),
            review_date: trimmed_option(raw.review_date),
        })
    }

    /// Maps differently-cased spellings of a product to the first one seen.
    fn canonical_product(&mut self, name: String) -> String {
        self.product_spellings.entry(name.to_lowercase()).or_insert(name).clone()
    }
}

/// Extracts a star rating from text like "4.0 out of 5 stars", "4,5" or "5".
///
/// The first numeric token wins. Returns `None` when there is no number.
pub fn parse_rating(text: &str) -> Option<f64> {
    text.split(|c: char| c.is_whitespace() || c == '/').find_map(|token| {
        let token = token
            .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-')
            .trim_end_matches(|c: char| !c.is_ascii_digit());
        if token.is_empty() {
            return None;
        }
        token.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trimmed_option(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
