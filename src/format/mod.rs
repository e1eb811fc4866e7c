//! Output formatting for review datasets (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::dataset::{ProductRating, ReviewDataset, ReviewerShare};
use crate::session::{RunStatus, ScrapeOutcome};
use serde_json::json;

const CSV_HEADER: &str = "Product Name,Name,Rating,Review";

/// Formats scrape results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a full run: reviews, per-product and per-reviewer summaries, counters.
    pub fn format_outcome(&self, outcome: &ScrapeOutcome) -> String {
        match self.format {
            OutputFormat::Json => self.json_outcome(outcome),
            OutputFormat::Csv => self.format_dataset(&outcome.dataset),
            OutputFormat::Table => {
                let mut out = self.format_dataset(&outcome.dataset);
                if !outcome.dataset.is_empty() {
                    out.push_str("\n\n");
                    out.push_str(&self.table_summary(&outcome.dataset));
                }
                out.push_str("\n\n");
                out.push_str(&status_line(outcome));
                out
            }
            OutputFormat::Markdown => {
                let mut out = format!("## Reviews for \"{}\"\n\n", outcome.query.term());
                out.push_str(&self.format_dataset(&outcome.dataset));
                if !outcome.dataset.is_empty() {
                    out.push_str("\n\n");
                    out.push_str(&self.markdown_summary(&outcome.dataset));
                }
                out.push_str("\n\n");
                out.push_str(&format!("*{}*", status_line(outcome)));
                out
            }
        }
    }

    /// Formats the review table only.
    pub fn format_dataset(&self, dataset: &ReviewDataset) -> String {
        if dataset.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => CSV_HEADER.to_string(),
                _ => "No reviews found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&dataset.rows()).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_reviews(dataset),
            OutputFormat::Markdown => self.markdown_reviews(dataset),
            OutputFormat::Csv => self.csv_reviews(dataset),
        }
    }

    // JSON formatting

    fn json_outcome(&self, outcome: &ScrapeOutcome) -> String {
        let value = json!({
            "run_id": outcome.run_id,
            "query": outcome.query,
            "status": outcome.status,
            "counters": outcome.counters,
            "reviews": outcome.dataset.rows(),
            "mean_rating_by_product": outcome.dataset.mean_rating_by_product(),
            "rating_share_by_reviewer": outcome.dataset.rating_share_by_reviewer(),
            "overall_mean": outcome.dataset.overall_mean(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    // Table formatting

    fn table_reviews(&self, dataset: &ReviewDataset) -> String {
        let product_width = 30;
        let name_width = 20;
        let rating_width = 6;
        let review_width = 60;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<product_width$}  {:<name_width$}  {:>rating_width$}  {}",
            "Product Name", "Name", "Rating", "Review"
        ));
        lines.push(format!(
            "{:-<product_width$}  {:-<name_width$}  {:-<rating_width$}  {:-<review_width$}",
            "", "", "", ""
        ));

        for row in dataset.rows() {
            lines.push(format!(
                "{:<product_width$}  {:<name_width$}  {:>rating_width$.1}  {}",
                truncate(row.product_name, product_width),
                truncate(row.name, name_width),
                row.rating,
                truncate(&single_line(row.review), review_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} reviews", dataset.len()));

        lines.join("\n")
    }

    fn table_summary(&self, dataset: &ReviewDataset) -> String {
        let mut lines = vec!["Average rating by product:".to_string()];
        for ProductRating { product_name, mean_rating, reviews } in dataset.mean_rating_by_product()
        {
            lines.push(format!(
                "  {:<40}  {:.2}  {}",
                truncate(&product_name, 40),
                mean_rating,
                bar(mean_rating)
            ));
            lines.push(format!("  {:<40}  ({} reviews)", "", reviews));
        }

        lines.push(String::new());
        lines.push("Rating share by reviewer:".to_string());
        for ReviewerShare { reviewer_name, share, .. } in dataset.rating_share_by_reviewer() {
            lines.push(format!("  {:<24}  {:>5.1}%", truncate(&reviewer_name, 24), share * 100.0));
        }

        if let Some(mean) = dataset.overall_mean() {
            lines.push(String::new());
            lines.push(format!("Overall average: {:.2}", mean));
        }

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_reviews(&self, dataset: &ReviewDataset) -> String {
        let mut lines = Vec::new();

        lines.push("| Product Name | Name | Rating | Review |".to_string());
        lines.push("|--------------|------|--------|--------|".to_string());

        for row in dataset.rows() {
            lines.push(format!(
                "| {} | {} | {:.1} | {} |",
                markdown_escape(row.product_name),
                markdown_escape(row.name),
                row.rating,
                markdown_escape(&truncate(&single_line(row.review), 120))
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} reviews*", dataset.len()));

        lines.join("\n")
    }

    fn markdown_summary(&self, dataset: &ReviewDataset) -> String {
        let mut lines = vec![
            "### Average rating by product".to_string(),
            String::new(),
            "| Product Name | Average | Reviews |".to_string(),
            "|--------------|---------|---------|".to_string(),
        ];
        for p in dataset.mean_rating_by_product() {
            lines.push(format!(
                "| {} | {:.2} | {} |",
                markdown_escape(&p.product_name),
                p.mean_rating,
                p.reviews
            ));
        }

        lines.push(String::new());
        lines.push("### Rating share by reviewer".to_string());
        lines.push(String::new());
        lines.push("| Name | Share |".to_string());
        lines.push("|------|-------|".to_string());
        for s in dataset.rating_share_by_reviewer() {
            lines.push(format!("| {} | {:.1}% |", markdown_escape(&s.reviewer_name), s.share * 100.0));
        }

        if let Some(mean) = dataset.overall_mean() {
            lines.push(String::new());
            lines.push(format!("**Overall average:** {:.2}", mean));
        }

        lines.join("\n")
    }

    // CSV formatting

    fn csv_reviews(&self, dataset: &ReviewDataset) -> String {
        let mut lines = vec![CSV_HEADER.to_string()];

        for row in dataset.rows() {
            lines.push(format!(
                "{},{},{},{}",
                Self::csv_escape(row.product_name),
                Self::csv_escape(row.name),
                row.rating,
                Self::csv_escape(row.review)
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn status_line(outcome: &ScrapeOutcome) -> String {
    let c = &outcome.counters;
    let status = match outcome.status {
        RunStatus::Complete(stop) => format!("complete ({})", stop),
        RunStatus::Partial(kind) => format!("PARTIAL ({})", kind),
    };
    format!(
        "Run {}: {} | pages {}/{} | kept {} | dropped {} | duplicates {} | errors {}",
        outcome.run_id,
        status,
        c.pages_fetched,
        c.pages_attempted,
        c.records_kept,
        c.records_dropped,
        c.records_folded,
        c.errors_seen
    )
}

/// Shortens `s` to at most `width` characters.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn markdown_escape(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Text bar for a rating in [1, 5], two cells per star.
fn bar(rating: f64) -> String {
    "#".repeat((rating * 2.0).round().clamp(0.0, 10.0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::paginator::StopReason;
    use crate::session::RunCounters;
    use crate::site::models::{RawRecord, SearchQuery};
    use crate::error::ScrapeFailureKind;
    use uuid::Uuid;

    fn raw(product: &str, reviewer: &str, rating: &str, text: &str) -> RawRecord {
        RawRecord {
            product_name: Some(product.to_string()),
            reviewer_name: Some(reviewer.to_string()),
            rating_text: Some(rating.to_string()),
            review_text: Some(text.to_string()),
            ..RawRecord::default()
        }
    }

    fn make_dataset() -> ReviewDataset {
        Normalizer::new()
            .normalize(vec![
                raw("Logitech M185", "ann", "4.0 out of 5 stars", "Works, mostly"),
                raw("Logitech M185", "bob", "5", "Says \"great\""),
                raw("HP X200", "cat", "2", "Scroll | wheel broke"),
            ])
            .dataset
    }

    fn make_outcome(status: RunStatus) -> ScrapeOutcome {
        let dataset = make_dataset();
        ScrapeOutcome {
            run_id: Uuid::nil(),
            query: SearchQuery::new("wireless mouse", 2),
            counters: RunCounters {
                pages_attempted: 2,
                pages_fetched: 2,
                records_kept: dataset.len(),
                records_dropped: 1,
                records_folded: 0,
                errors_seen: 0,
            },
            dataset,
            status,
        }
    }

    #[test]
    fn test_table_reviews() {
        let output = Formatter::new(OutputFormat::Table).format_dataset(&make_dataset());
        assert!(output.contains("Product Name"));
        assert!(output.contains("Logitech M185"));
        assert!(output.contains("4.0"));
        assert!(output.contains("Total: 3 reviews"));
    }

    #[test]
    fn test_table_outcome_has_summary_and_counters() {
        let output = Formatter::new(OutputFormat::Table)
            .format_outcome(&make_outcome(RunStatus::Complete(StopReason::YieldReached)));
        assert!(output.contains("Average rating by product:"));
        assert!(output.contains("4.50"));
        assert!(output.contains("Rating share by reviewer:"));
        assert!(output.contains("pages 2/2"));
        assert!(output.contains("dropped 1"));
        assert!(output.contains("complete"));
    }

    #[test]
    fn test_summaries_include_overall_average() {
        let outcome = make_outcome(RunStatus::Complete(StopReason::YieldReached));

        let table = Formatter::new(OutputFormat::Table).format_outcome(&outcome);
        assert!(table.contains("Overall average: 3.67"));

        let markdown = Formatter::new(OutputFormat::Markdown).format_outcome(&outcome);
        assert!(markdown.contains("**Overall average:** 3.67"));

        let value: serde_json::Value = serde_json::from_str(
            &Formatter::new(OutputFormat::Json).format_outcome(&outcome),
        )
        .unwrap();
        let mean = value["overall_mean"].as_f64().unwrap();
        assert!((mean - 11.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_overall_mean_null_when_empty() {
        let mut outcome = make_outcome(RunStatus::Complete(StopReason::Exhausted));
        outcome.dataset = ReviewDataset::default();

        let output = Formatter::new(OutputFormat::Json).format_outcome(&outcome);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(value["overall_mean"].is_null());
    }

    #[test]
    fn test_partial_outcome_is_flagged() {
        let output = Formatter::new(OutputFormat::Table)
            .format_outcome(&make_outcome(RunStatus::Partial(ScrapeFailureKind::UpstreamUnavailable)));
        assert!(output.contains("PARTIAL"));
        assert!(output.contains("upstream unavailable"));
    }

    #[test]
    fn test_json_outcome() {
        let output = Formatter::new(OutputFormat::Json)
            .format_outcome(&make_outcome(RunStatus::Complete(StopReason::PageCap)));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["reviews"].as_array().unwrap().len(), 3);
        assert_eq!(value["reviews"][0]["Product Name"], "Logitech M185");
        assert_eq!(value["reviews"][0]["Name"], "ann");
        assert_eq!(value["status"]["status"], "complete");
        assert_eq!(value["counters"]["records_dropped"], 1);
        assert_eq!(value["mean_rating_by_product"][1]["product_name"], "HP X200");
    }

    #[test]
    fn test_json_empty_dataset() {
        let output = Formatter::new(OutputFormat::Json).format_dataset(&ReviewDataset::default());
        assert_eq!(output, "[]");
    }

    #[test]
    fn test_markdown_outcome() {
        let output = Formatter::new(OutputFormat::Markdown)
            .format_outcome(&make_outcome(RunStatus::Complete(StopReason::PageCap)));
        assert!(output.contains("## Reviews for \"wireless mouse\""));
        assert!(output.contains("| Product Name | Name | Rating | Review |"));
        assert!(output.contains("Scroll \\| wheel broke"));
        assert!(output.contains("### Average rating by product"));
    }

    #[test]
    fn test_csv_escaping() {
        let output = Formatter::new(OutputFormat::Csv).format_dataset(&make_dataset());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "Logitech M185,ann,4,\"Works, mostly\"");
        assert_eq!(lines[2], "Logitech M185,bob,5,\"Says \"\"great\"\"\"");
    }

    #[test]
    fn test_csv_empty_has_header() {
        let output = Formatter::new(OutputFormat::Csv).format_dataset(&ReviewDataset::default());
        assert_eq!(output, CSV_HEADER);
    }

    #[test]
    fn test_empty_table() {
        let output = Formatter::new(OutputFormat::Table).format_dataset(&ReviewDataset::default());
        assert_eq!(output, "No reviews found.");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Kabellose Maus für Büro", 10), "Kabello...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(5.0), "##########");
        assert_eq!(bar(2.5), "#####");
    }
}
