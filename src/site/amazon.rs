//! Amazon layout: search listings and product-reviews pages.

use crate::error::ExtractError;
use crate::site::models::{ProductLink, RawRecord};
use crate::site::selectors::amazon;
use crate::site::{element_text, PageFormat, RecordExtractor};
use scraper::{ElementRef, Html};
use tracing::{debug, trace};

/// Extractor for Amazon storefront pages.
pub struct AmazonExtractor {
    base_url: String,
}

impl AmazonExtractor {
    /// Creates an extractor for the storefront at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    /// Returns the review listing URL for an ASIN.
    pub fn reviews_url(&self, asin: &str) -> String {
        format!("{}/product-reviews/{}", self.base_url, asin)
    }

    /// Checks for CAPTCHA or the 503 dog page.
    fn check_for_block(&self, document: &Html) -> Result<(), ExtractError> {
        if document.select(&amazon::CAPTCHA).next().is_some() {
            return Err(self.blocked("CAPTCHA detected"));
        }

        if document.select(&amazon::DOG_PAGE).next().is_some() {
            return Err(self.blocked("error page (503 dog page) detected"));
        }

        Ok(())
    }

    fn blocked(&self, detail: &str) -> ExtractError {
        ExtractError::Blocked { layout: self.format().to_string(), detail: detail.to_string() }
    }

    /// Parses one review unit. Missing pieces stay `None`.
    fn parse_review(&self, element: ElementRef, product_name: Option<&str>) -> RawRecord {
        let first = |selector: &scraper::Selector| element.select(selector).next().and_then(element_text);

        RawRecord {
            product_name: product_name.map(String::from),
            reviewer_name: first(&amazon::REVIEWER),
            rating_text: first(&amazon::REVIEW_RATING),
            review_title: first(&amazon::REVIEW_TITLE),
            review_text: first(&amazon::REVIEW_BODY),
            review_date: first(&amazon::REVIEW_DATE),
        }
    }
}

impl RecordExtractor for AmazonExtractor {
    fn format(&self) -> PageFormat {
        PageFormat::Amazon
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/s?k={}", self.base_url, urlencoding::encode(query))
    }

    fn product_links(&self, html: &str) -> Result<Vec<ProductLink>, ExtractError> {
        let document = Html::parse_document(html);
        self.check_for_block(&document)?;

        let mut links: Vec<ProductLink> = Vec::new();
        for card in document.select(&amazon::RESULT) {
            // Cards without an ASIN are ad placeholders
            let asin = match card.value().attr(amazon::ASIN_ATTR) {
                Some(asin) if !asin.trim().is_empty() => asin.trim(),
                _ => {
                    trace!("Skipping result card without ASIN");
                    continue;
                }
            };

            let url = self.reviews_url(asin);
            if links.iter().any(|l| l.url == url) {
                continue;
            }

            let title = card.select(&amazon::RESULT_TITLE).next().and_then(element_text);
            links.push(ProductLink { title, url });
        }

        debug!("Found {} products on Amazon listing", links.len());
        Ok(links)
    }

    fn extract(
        &self,
        html: &str,
        product_name_hint: Option<&str>,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        let document = Html::parse_document(html);
        self.check_for_block(&document)?;

        let Some(container) = document.select(&amazon::REVIEW_LIST).next() else {
            return Err(ExtractError::StructuralMismatch {
                layout: self.format().to_string(),
                detail: "review list container not found".to_string(),
            });
        };

        let page_title = document.select(&amazon::PRODUCT_TITLE).next().and_then(element_text);
        let product_name = page_title.as_deref().or(product_name_hint);

        let records: Vec<RawRecord> = container
            .select(&amazon::REVIEW)
            .map(|unit| self.parse_review(unit, product_name))
            .collect();

        debug!("Extracted {} Amazon review units", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_html(name: &str, rating: &str, body: &str) -> String {
        format!(
            r#"<div data-hook="review">
                <span class="a-profile-name">{}</span>
                <i data-hook="review-star-rating"><span class="a-icon-alt">{}</span></i>
                <a data-hook="review-title"><i><span class="a-icon-alt">{}</span></i><span>Headline</span></a>
                <span data-hook="review-date">Reviewed in the United States on May 1, 2024</span>
                <span data-hook="review-body"><span>{}</span></span>
            </div>"#,
            name, rating, rating, body
        )
    }

    fn reviews_page(title: Option<&str>, reviews: &[String]) -> String {
        let title = title
            .map(|t| format!(r#"<a data-hook="product-link" href="/dp/X">{}</a>"#, t))
            .unwrap_or_default();
        format!(
            r#"<html><body>{}<div id="cm_cr-review_list">{}</div></body></html>"#,
            title,
            reviews.join("")
        )
    }

    #[test]
    fn test_search_url_encodes_query() {
        let extractor = AmazonExtractor::new("https://www.amazon.com/");
        assert_eq!(
            extractor.search_url("wireless mouse"),
            "https://www.amazon.com/s?k=wireless%20mouse"
        );
    }

    #[test]
    fn test_product_links() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let html = r##"
            <html><body>
                <div data-component-type="s-search-result" data-asin="B001">
                    <h2><a class="a-link-normal" href="/dp/B001"><span>Logitech M185</span></a></h2>
                </div>
                <div data-component-type="s-search-result" data-asin="">
                    <h2><a href="#"><span>Ad slot</span></a></h2>
                </div>
                <div data-component-type="s-search-result" data-asin="B002"></div>
                <div data-component-type="s-search-result" data-asin="B001"></div>
            </body></html>
        "##;

        let links = extractor.product_links(html).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://www.amazon.com/product-reviews/B001");
        assert_eq!(links[0].title.as_deref(), Some("Logitech M185"));
        assert_eq!(links[1].url, "https://www.amazon.com/product-reviews/B002");
        assert!(links[1].title.is_none());
    }

    #[test]
    fn test_product_links_empty_listing() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let links = extractor.product_links("<html><body></body></html>").unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_extract_reviews() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let html = reviews_page(
            Some("Logitech M185 Wireless Mouse"),
            &[review_html("Jane", "4.0 out of 5 stars", "Works well"), review_html("Bob", "5.0 out of 5 stars", "Great")],
        );

        let records = extractor.extract(&html, Some("hint")).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.product_name.as_deref(), Some("Logitech M185 Wireless Mouse"));
        assert_eq!(first.reviewer_name.as_deref(), Some("Jane"));
        assert_eq!(first.rating_text.as_deref(), Some("4.0 out of 5 stars"));
        assert_eq!(first.review_title.as_deref(), Some("Headline"));
        assert_eq!(first.review_text.as_deref(), Some("Works well"));
        assert!(first.review_date.as_deref().unwrap().contains("May 1, 2024"));
    }

    #[test]
    fn test_extract_uses_hint_without_page_title() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let html = reviews_page(None, &[review_html("Jane", "4.0 out of 5 stars", "ok")]);

        let records = extractor.extract(&html, Some("Listing Title")).unwrap();
        assert_eq!(records[0].product_name.as_deref(), Some("Listing Title"));
    }

    #[test]
    fn test_extract_tolerates_missing_fields() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let html = reviews_page(
            None,
            &[r#"<div data-hook="review"><span data-hook="review-body">only text</span></div>"#
                .to_string()],
        );

        let records = extractor.extract(&html, None).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].product_name.is_none());
        assert!(records[0].reviewer_name.is_none());
        assert!(records[0].rating_text.is_none());
        assert_eq!(records[0].review_text.as_deref(), Some("only text"));
    }

    #[test]
    fn test_extract_empty_container_is_not_an_error() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let html = reviews_page(Some("Mouse"), &[]);
        assert!(extractor.extract(&html, None).unwrap().is_empty());
    }

    #[test]
    fn test_extract_missing_container() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let result = extractor.extract("<html><body><div id='dp'></div></body></html>", None);
        assert!(matches!(result, Err(ExtractError::StructuralMismatch { .. })));
    }

    #[test]
    fn test_captcha_is_blocked() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let html = r#"<html><body><form action="/errors/validateCaptcha"></form></body></html>"#;

        let result = extractor.extract(html, None);
        assert!(matches!(result, Err(ExtractError::Blocked { .. })));

        let result = extractor.product_links(html);
        assert!(matches!(result, Err(ExtractError::Blocked { .. })));
    }

    #[test]
    fn test_dog_page_is_blocked() {
        let extractor = AmazonExtractor::new("https://www.amazon.com");
        let html = r#"<html><body><img alt="Sorry, the dog ate this page"></body></html>"#;
        let err = extractor.extract(html, None).unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
