//! Site layouts: selectors, review extraction, and data models.
//!
//! Markup parsing is the fragile part of the pipeline, so each supported
//! layout gets its own [`RecordExtractor`] keyed by a [`PageFormat`]. The
//! paginator only ever talks to the trait.

pub mod amazon;
pub mod flipkart;
pub mod models;
pub mod regions;
pub mod selectors;

use crate::error::ExtractError;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

pub use amazon::AmazonExtractor;
pub use flipkart::FlipkartExtractor;
pub use models::{NormalizedRecord, ProductLink, RawRecord, SearchQuery};
pub use regions::Region;

/// Parses one layout's pages into links and raw review records.
pub trait RecordExtractor: Send + Sync {
    /// Layout this extractor understands.
    fn format(&self) -> PageFormat;

    /// Builds the search listing URL for a product query.
    fn search_url(&self, query: &str) -> String;

    /// Lists the products on a search listing, in page order.
    fn product_links(&self, html: &str) -> Result<Vec<ProductLink>, ExtractError>;

    /// Extracts every review unit on a product page.
    ///
    /// An empty result is valid. Only a missing top-level container or a
    /// blocking page is an error.
    fn extract(&self, html: &str, product_name_hint: Option<&str>)
        -> Result<Vec<RawRecord>, ExtractError>;
}

/// Identifier of a supported page layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    Amazon,
    Flipkart,
}

impl PageFormat {
    /// Returns the default base URL for this layout.
    pub fn default_base_url(&self, region: Region) -> String {
        match self {
            PageFormat::Amazon => region.base_url(),
            PageFormat::Flipkart => "https://www.flipkart.com".to_string(),
        }
    }

    pub fn all() -> &'static [PageFormat] {
        &[PageFormat::Amazon, PageFormat::Flipkart]
    }

    /// Short description for listings.
    pub fn description(&self) -> &'static str {
        match self {
            PageFormat::Amazon => "Amazon search results and product-reviews pages",
            PageFormat::Flipkart => "Flipkart search results and product pages",
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFormat::Amazon => write!(f, "amazon"),
            PageFormat::Flipkart => write!(f, "flipkart"),
        }
    }
}

impl FromStr for PageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amazon" | "amz" => Ok(PageFormat::Amazon),
            "flipkart" | "fk" => Ok(PageFormat::Flipkart),
            _ => Err(format!("Unknown site: {}. Use: amazon, flipkart", s)),
        }
    }
}

/// Returns the extractor registered for a layout.
pub fn extractor_for(format: PageFormat, base_url: impl Into<String>) -> Box<dyn RecordExtractor> {
    let base_url = base_url.into();
    match format {
        PageFormat::Amazon => Box::new(AmazonExtractor::new(base_url)),
        PageFormat::Flipkart => Box::new(FlipkartExtractor::new(base_url)),
    }
}

/// Collects an element's text with whitespace runs collapsed; `None` if blank.
pub(crate) fn element_text(element: ElementRef) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Resolves an href against a base URL, or `None` if either is unusable.
pub(crate) fn absolute_url(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(String::from)
}
