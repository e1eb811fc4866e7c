//! Holds the last scraped dataset for a caller to inspect.

use crate::dataset::{ProductRating, ReviewDataset, ReviewRow, ReviewerShare};

/// Message shown when there is nothing to analyze.
pub const NO_DATA_MESSAGE: &str =
    "No data available for analysis. Please go back to the search page.";

/// What the caller sees for the held dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisView<'a> {
    /// Nothing loaded, or the loaded dataset had no rows
    Empty(&'static str),
    Data {
        product: &'a str,
        rows: Vec<ReviewRow<'a>>,
        mean_by_product: Vec<ProductRating>,
        share_by_reviewer: Vec<ReviewerShare>,
    },
}

/// Caller-side holder of one dataset. Resetting never touches persistence.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    held: Option<(String, ReviewDataset)>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever was held with `dataset`.
    pub fn load(&mut self, product: impl Into<String>, dataset: ReviewDataset) {
        self.held = Some((product.into(), dataset));
    }

    pub fn view(&self) -> AnalysisView<'_> {
        match &self.held {
            Some((product, dataset)) if !dataset.is_empty() => AnalysisView::Data {
                product,
                rows: dataset.rows(),
                mean_by_product: dataset.mean_rating_by_product(),
                share_by_reviewer: dataset.rating_share_by_reviewer(),
            },
            _ => AnalysisView::Empty(NO_DATA_MESSAGE),
        }
    }

    /// Drops the held dataset and product.
    pub fn reset(&mut self) {
        self.held = None;
    }

    pub fn product(&self) -> Option<&str> {
        self.held.as_ref().map(|(product, _)| product.as_str())
    }
}
