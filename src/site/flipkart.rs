//! Flipkart layout: search listings and product pages with inline reviews.

use crate::error::ExtractError;
use crate::site::models::{ProductLink, RawRecord};
use crate::site::selectors::flipkart;
use crate::site::{absolute_url, element_text, PageFormat, RecordExtractor};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

/// Extractor for Flipkart pages.
pub struct FlipkartExtractor {
    base_url: String,
}

impl FlipkartExtractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn check_for_block(&self, document: &Html) -> Result<(), ExtractError> {
        if document.select(&flipkart::CAPTCHA).next().is_some() {
            return Err(ExtractError::Blocked {
                layout: self.format().to_string(),
                detail: "bot check detected".to_string(),
            });
        }
        Ok(())
    }

    fn first_text(element: ElementRef, selector: &Selector) -> Option<String> {
        element.select(selector).next().and_then(element_text)
    }

    fn parse_review(&self, element: ElementRef, product_name: Option<&str>) -> RawRecord {
        RawRecord {
            product_name: product_name.map(String::from),
            reviewer_name: Self::first_text(element, &flipkart::REVIEWER),
            rating_text: Self::first_text(element, &flipkart::RATING),
            review_title: Self::first_text(element, &flipkart::REVIEW_TITLE),
            review_text: Self::first_text(element, &flipkart::REVIEW_BODY)
                .map(|t| t.trim_end_matches("READ MORE").trim_end().to_string()),
            review_date: Self::first_text(element, &flipkart::REVIEW_DATE),
        }
    }
}

impl RecordExtractor for FlipkartExtractor {
    fn format(&self) -> PageFormat {
        PageFormat::Flipkart
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={}", self.base_url, urlencoding::encode(query))
    }

    fn product_links(&self, html: &str) -> Result<Vec<ProductLink>, ExtractError> {
        let document = Html::parse_document(html);
        self.check_for_block(&document)?;

        let mut links: Vec<ProductLink> = Vec::new();
        for anchor in document.select(&flipkart::PRODUCT_LINK) {
            let Some(href) = anchor.value().attr("href").filter(|h| !h.trim().is_empty()) else {
                continue;
            };

            let Some(url) = absolute_url(&self.base_url, href.trim()) else {
                trace!("Skipping unresolvable product link: {}", href);
                continue;
            };
            if links.iter().any(|l| l.url == url) {
                continue;
            }

            let title = Self::first_text(anchor, &flipkart::LINK_TITLE)
                .or_else(|| anchor.value().attr("title").map(|t| t.trim().to_string()))
                .filter(|t| !t.is_empty());

            links.push(ProductLink { title, url });
        }

        debug!("Found {} products on Flipkart listing", links.len());
        Ok(links)
    }

    fn extract(
        &self,
        html: &str,
        product_name_hint: Option<&str>,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        let document = Html::parse_document(html);
        self.check_for_block(&document)?;

        let Some(container) = document.select(&flipkart::CONTAINER).next() else {
            return Err(ExtractError::StructuralMismatch {
                layout: self.format().to_string(),
                detail: "#container root not found".to_string(),
            });
        };

        let page_title = Self::first_text(container, &flipkart::PRODUCT_TITLE);
        let product_name = page_title.as_deref().or(product_name_hint);

        let records: Vec<RawRecord> = container
            .select(&flipkart::REVIEW)
            .map(|unit| self.parse_review(unit, product_name))
            .collect();

        debug!("Extracted {} Flipkart review units", records.len());
        Ok(records)
    }
}
