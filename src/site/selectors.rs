//! CSS selectors for every supported page layout.
//!
//! Update this file when a site changes its HTML structure. When parsing
//! fails, capture an HTML sample, update selectors, and add a test fixture
//! under `tests/fixtures/`.

use scraper::Selector;
use std::sync::LazyLock;

/// Amazon search listings and product review pages.
pub mod amazon {
    use super::*;

    /// Search result card.
    pub static RESULT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[data-component-type='s-search-result']").unwrap());

    /// ASIN attribute on a result card.
    pub const ASIN_ATTR: &str = "data-asin";

    /// Product title on a result card.
    pub static RESULT_TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "h2 a span, \
             h2 span.a-text-normal, \
             .a-size-medium.a-text-normal, \
             .a-size-base-plus.a-text-normal",
        )
        .unwrap()
    });

    /// Review list container. Its absence means the layout changed.
    pub static REVIEW_LIST: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "#cm_cr-review_list, \
             [data-hook='reviews-medley-widget'], \
             #cm-cr-dp-review-list",
        )
        .unwrap()
    });

    /// One review.
    pub static REVIEW: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[data-hook='review']").unwrap());

    /// Reviewer display name.
    pub static REVIEWER: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".a-profile-name").unwrap());

    /// Star rating text ("4.0 out of 5 stars").
    pub static REVIEW_RATING: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-hook='review-star-rating'] .a-icon-alt, \
             [data-hook='cmps-review-star-rating'] .a-icon-alt",
        )
        .unwrap()
    });

    /// Review headline. The star icon shares the link, so target the last span.
    pub static REVIEW_TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a[data-hook='review-title'] > span:last-child, \
             span[data-hook='review-title'] > span:last-child",
        )
        .unwrap()
    });

    /// Review body.
    pub static REVIEW_BODY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[data-hook='review-body']").unwrap());

    /// Review date line.
    pub static REVIEW_DATE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[data-hook='review-date']").unwrap());

    /// Product title on the review page.
    pub static PRODUCT_TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a[data-hook='product-link'], \
             #productTitle",
        )
        .unwrap()
    });

    /// CAPTCHA form.
    pub static CAPTCHA: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "form[action*='validateCaptcha'], \
             img[src*='captcha']",
        )
        .unwrap()
    });

    /// Dog page (Amazon's error page).
    pub static DOG_PAGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "img[alt*='dog'], \
             a[href='/ref=cs_503_link']",
        )
        .unwrap()
    });
}

/// Flipkart search listings and product pages.
pub mod flipkart {
    use super::*;

    /// Product anchor on a search listing.
    pub static PRODUCT_LINK: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a.CGtC98, \
             a.wjcEIp, \
             a.VJA3rP, \
             div._1AtVbE a[href*='/p/']",
        )
        .unwrap()
    });

    /// Product name inside a listing anchor.
    pub static LINK_TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "div.KzDlHZ, \
             div._4rR01T",
        )
        .unwrap()
    });

    /// Application root. Its absence means the layout changed.
    pub static CONTAINER: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#container").unwrap());

    /// One review block.
    pub static REVIEW: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "div.EPCmJX, \
             div._16PBlm",
        )
        .unwrap()
    });

    /// Numeric rating badge.
    pub static RATING: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "div.XQDdHH, \
             div._3LWZlK",
        )
        .unwrap()
    });

    /// Reviewer name.
    pub static REVIEWER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "p._2NsDsF.AwS1CA, \
             p._2sc7ZR._2V5EHH",
        )
        .unwrap()
    });

    /// Review headline.
    pub static REVIEW_TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "p.z9E0IG, \
             p._2-N8zT",
        )
        .unwrap()
    });

    /// Review comment.
    pub static REVIEW_BODY: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "div.ZmyHeo, \
             div.t-ZTKy",
        )
        .unwrap()
    });

    /// Review date paragraph (the name paragraph shares the base class).
    pub static REVIEW_DATE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "p._2NsDsF:not(.AwS1CA), \
             p._2sc7ZR:not(._2V5EHH)",
        )
        .unwrap()
    });

    /// Product title on the product page.
    pub static PRODUCT_TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "span.VU-ZEz, \
             span.B_NuCI",
        )
        .unwrap()
    });

    /// Bot-check interstitial.
    pub static CAPTCHA: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "form[action*='captcha'], \
             #px-captcha",
        )
        .unwrap()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_selectors_compile() {
        // Force evaluation of all lazy selectors to ensure they compile
        let _ = &*amazon::RESULT;
        let _ = &*amazon::RESULT_TITLE;
        let _ = &*amazon::REVIEW_LIST;
        let _ = &*amazon::REVIEW;
        let _ = &*amazon::REVIEWER;
        let _ = &*amazon::REVIEW_RATING;
        let _ = &*amazon::REVIEW_TITLE;
        let _ = &*amazon::REVIEW_BODY;
        let _ = &*amazon::REVIEW_DATE;
        let _ = &*amazon::PRODUCT_TITLE;
        let _ = &*amazon::CAPTCHA;
        let _ = &*amazon::DOG_PAGE;
        let _ = &*flipkart::PRODUCT_LINK;
        let _ = &*flipkart::LINK_TITLE;
        let _ = &*flipkart::CONTAINER;
        let _ = &*flipkart::REVIEW;
        let _ = &*flipkart::RATING;
        let _ = &*flipkart::REVIEWER;
        let _ = &*flipkart::REVIEW_TITLE;
        let _ = &*flipkart::REVIEW_BODY;
        let _ = &*flipkart::REVIEW_DATE;
        let _ = &*flipkart::PRODUCT_TITLE;
        let _ = &*flipkart::CAPTCHA;
    }

    #[test]
    fn test_amazon_asin_attr_reads_result_card() {
        let html = Html::parse_fragment(
            r#"<div data-component-type="s-search-result" data-asin="B004YAVF8I"></div>"#,
        );
        let asins: Vec<&str> =
            html.select(&amazon::RESULT).filter_map(|e| e.value().attr(amazon::ASIN_ATTR)).collect();
        assert_eq!(asins, vec!["B004YAVF8I"]);
    }

    #[test]
    fn test_amazon_review_title_skips_star_icon() {
        let html = Html::parse_fragment(
            r#"<a data-hook="review-title"><i><span class="a-icon-alt">5.0 out of 5 stars</span></i><span>Works well</span></a>"#,
        );
        let title: Vec<String> =
            html.select(&amazon::REVIEW_TITLE).map(|e| e.text().collect()).collect();
        assert_eq!(title, vec!["Works well".to_string()]);
    }

    #[test]
    fn test_flipkart_date_excludes_name() {
        let html = Html::parse_fragment(
            r#"<div><p class="_2NsDsF AwS1CA">Ravi</p><p class="_2NsDsF">Oct, 2024</p></div>"#,
        );
        let dates: Vec<String> =
            html.select(&flipkart::REVIEW_DATE).map(|e| e.text().collect()).collect();
        assert_eq!(dates, vec!["Oct, 2024".to_string()]);

        let names: Vec<String> =
            html.select(&flipkart::REVIEWER).map(|e| e.text().collect()).collect();
        assert_eq!(names, vec!["Ravi".to_string()]);
    }
}
