//! The ordered, validated result of a scrape and its tabular projections.

use crate::site::models::NormalizedRecord;
use serde::Serialize;

/// One row of the four-column review table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow<'a> {
    #[serde(rename = "Product Name")]
    pub product_name: &'a str,
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "Review")]
    pub review: &'a str,
}

/// Mean rating of one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRating {
    pub product_name: String,
    pub mean_rating: f64,
    pub reviews: usize,
}

/// One reviewer's share of all ratings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerShare {
    pub reviewer_name: String,
    pub rating_total: f64,
    /// Fraction of the dataset's rating total, in [0, 1]
    pub share: f64,
}

/// Validated review records in discovery order.
///
/// Built only by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReviewDataset {
    records: Vec<NormalizedRecord>,
}

impl ReviewDataset {
    pub(crate) fn from_records(records: Vec<NormalizedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    /// Projects the dataset onto the `Product Name, Name, Rating, Review` table.
    pub fn rows(&self) -> Vec<ReviewRow<'_>> {
        self.records
            .iter()
            .map(|r| ReviewRow {
                product_name: &r.product_name,
                name: &r.reviewer_name,
                rating: r.rating,
                review: &r.review_text,
            })
            .collect()
    }

    /// Average rating per product, in first-appearance order.
    pub fn mean_rating_by_product(&self) -> Vec<ProductRating> {
        let mut out: Vec<ProductRating> = Vec::new();
        for record in &self.records {
            match out.iter_mut().find(|p| p.product_name == record.product_name) {
                Some(entry) => {
                    // Running total; divided below
                    entry.mean_rating += record.rating;
                    entry.reviews += 1;
                }
                None => out.push(ProductRating {
                    product_name: record.product_name.clone(),
                    mean_rating: record.rating,
                    reviews: 1,
                }),
            }
        }
        for entry in &mut out {
            entry.mean_rating /= entry.reviews as f64;
        }
        out
    }

    /// Each reviewer's share of the summed ratings, in first-appearance order.
    pub fn rating_share_by_reviewer(&self) -> Vec<ReviewerShare> {
        let grand_total: f64 = self.records.iter().map(|r| r.rating).sum();
        let mut out: Vec<ReviewerShare> = Vec::new();

        for record in &self.records {
            match out.iter_mut().find(|s| s.reviewer_name == record.reviewer_name) {
                Some(entry) => entry.rating_total += record.rating,
                None => out.push(ReviewerShare {
                    reviewer_name: record.reviewer_name.clone(),
                    rating_total: record.rating,
                    share: 0.0,
                }),
            }
        }

        if grand_total > 0.0 {
            for entry in &mut out {
                entry.share = entry.rating_total / grand_total;
            }
        }
        out
    }

    /// Mean rating across all records, or `None` when empty.
    pub fn overall_mean(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        Some(self.records.iter().map(|r| r.rating).sum::<f64>() / self.records.len() as f64)
    }
}

impl<'a> IntoIterator for &'a ReviewDataset {
    type Item = &'a NormalizedRecord;
    type IntoIter = std::slice::Iter<'a, NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(product: &str, reviewer: &str, rating: f64) -> NormalizedRecord {
        NormalizedRecord {
            product_name: product.to_string(),
            reviewer_name: reviewer.to_string(),
            rating,
            review_text: format!("{} on {}", reviewer, product),
            review_title: None,
            review_date: None,
        }
    }

    fn sample() -> ReviewDataset {
        ReviewDataset::from_records(vec![
            record("Mouse", "ann", 4.0),
            record("Keyboard", "bob", 2.0),
            record("Mouse", "bob", 5.0),
            record("Mouse", "cat", 3.0),
        ])
    }

    #[test]
    fn test_rows_use_four_columns() {
        let dataset = sample();
        let rows = dataset.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].product_name, "Keyboard");
        assert_eq!(rows[1].name, "bob");

        let json = serde_json::to_value(&rows[0]).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert!(obj.contains_key("Product Name"));
        assert!(obj.contains_key("Name"));
        assert!(obj.contains_key("Rating"));
        assert!(obj.contains_key("Review"));
    }

    #[test]
    fn test_mean_rating_by_product() {
        let means = sample().mean_rating_by_product();
        assert_eq!(means.len(), 2);
        assert_eq!(means[0].product_name, "Mouse");
        assert_eq!(means[0].reviews, 3);
        assert!((means[0].mean_rating - 4.0).abs() < f64::EPSILON);
        assert_eq!(means[1].product_name, "Keyboard");
        assert!((means[1].mean_rating - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rating_share_sums_to_one() {
        let shares = sample().rating_share_by_reviewer();
        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].reviewer_name, "ann");
        assert!((shares[1].rating_total - 7.0).abs() < f64::EPSILON);

        let total: f64 = shares.iter().map(|s| s.share).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = ReviewDataset::default();
        assert!(dataset.is_empty());
        assert!(dataset.rows().is_empty());
        assert!(dataset.mean_rating_by_product().is_empty());
        assert!(dataset.rating_share_by_reviewer().is_empty());
        assert_eq!(dataset.overall_mean(), None);
    }

    #[test]
    fn test_overall_mean() {
        assert_eq!(sample().overall_mean(), Some(3.5));
    }
}
