//! Synchronous page-to-record steps shared by single and bulk scrapes.
//!
//! Everything here works on a borrowed HTML string and returns owned
//! records, so the parsed DOM never lives across an `.await`.

use chrono::{DateTime, Utc};
use prodex_core::{OrderRecord, ProductRecord, ValidationRules};
use serde::{Deserialize, Serialize};

use crate::assemble::{assemble_order, assemble_product};
use crate::document::Document;
use crate::error::ScraperError;
use crate::sanitize::SanitizerSet;
use crate::sites::{Site, EBAY_ORDER};
use crate::validate::{validate, validate_order, Validation};

/// One product page to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkLink {
    /// Caller-supplied external id; when blank the id is read from the
    /// URL or page.
    #[serde(default)]
    pub id: String,
    pub url: String,
    /// Forces a site's strategy table instead of detecting it from the URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,
}

impl BulkLink {
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            site: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::UnsupportedSite`] when no site was forced and
    /// the URL's host has no strategy table.
    pub fn resolve_site(&self) -> Result<Site, ScraperError> {
        self.site
            .or_else(|| Site::from_url(&self.url))
            .ok_or_else(|| ScraperError::UnsupportedSite {
                url: self.url.clone(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedProduct {
    pub record: ProductRecord,
    pub validation: Validation,
}

#[derive(Debug, Clone)]
pub struct ProcessedOrder {
    pub record: OrderRecord,
    pub validation: Validation,
}

/// Parses, assembles, sanitizes, and validates one product page.
///
/// # Errors
///
/// Returns [`ScraperError::UnsupportedSite`] when the link's site cannot be
/// determined.
pub fn process_product_page(
    html: &str,
    link: &BulkLink,
    rules: &ValidationRules,
    sanitizers: &SanitizerSet,
    scraped_at: DateTime<Utc>,
) -> Result<ProcessedProduct, ScraperError> {
    let site = link.resolve_site()?;
    let profile = site.profile();
    let doc = Document::parse_with_url(html, &link.url);

    let external_id = match link.id.trim() {
        "" => profile.external_id(&doc, &link.url).unwrap_or_default(),
        id => id.to_owned(),
    };
    let assembled = assemble_product(&doc, profile, &external_id, &link.url, scraped_at);
    let record = sanitizers.for_site(site).sanitize_product(&assembled);
    let validation = validate(&record, rules);

    Ok(ProcessedProduct { record, validation })
}

/// Parses and validates one seller order detail page.
#[must_use]
pub fn process_order_page(html: &str, url: &str, scraped_at: DateTime<Utc>) -> ProcessedOrder {
    let doc = Document::parse_with_url(html, url);
    let record = assemble_order(&doc, &EBAY_ORDER, url, scraped_at);
    let validation = validate_order(&record);
    ProcessedOrder { record, validation }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <span id="productTitle">Amazon Basics Travel Mug</span>
        <span class="priceToPay"><span class="a-offscreen">$12.00</span></span>
        <input type="hidden" id="ASIN" value="B0FROMPAGE">"#;

    fn process(link: &BulkLink) -> Result<ProcessedProduct, ScraperError> {
        let rules = ValidationRules::default();
        process_product_page(PAGE, link, &rules, &SanitizerSet::builtin(), Utc::now())
    }

    #[test]
    fn id_from_link_wins_over_page() {
        let link = BulkLink::new("CALLER01", "https://www.amazon.com/dp/B0FROMURL1");
        let out = process(&link).unwrap();
        assert_eq!(out.record.external_id, "CALLER01");
    }

    #[test]
    fn blank_id_is_derived_and_title_sanitized() {
        let link = BulkLink::new("", "https://www.amazon.com/dp/B0FROMURL1");
        let out = process(&link).unwrap();
        assert_eq!(out.record.external_id, "B0FROMURL1");
        assert_eq!(out.record.title.as_deref(), Some("Travel Mug"));
        assert_eq!(out.record.price.as_deref(), Some("$12.00"));
        assert!(out.validation.accepted);
    }

    #[test]
    fn forced_site_applies_to_unknown_hosts() {
        let mut link = BulkLink::new("", "http://127.0.0.1:8080/landing");
        assert!(matches!(process(&link), Err(ScraperError::UnsupportedSite { .. })));

        link.site = Some(Site::Amazon);
        let out = process(&link).unwrap();
        assert_eq!(out.record.external_id, "B0FROMPAGE");
    }

    #[test]
    fn links_deserialize_without_id_or_site() {
        let links: Vec<BulkLink> = serde_json::from_str(
            r#"[{"url":"https://www.ebay.com/itm/123456789012"},{"id":"X","url":"u","site":"costco"}]"#,
        )
        .unwrap();
        assert_eq!(links[0].id, "");
        assert_eq!(links[1].site, Some(Site::Costco));
    }

    #[test]
    fn order_page_without_items_is_rejected() {
        let out = process_order_page(
            "<dl><dt>Order number</dt><dd>01-23456-78901</dd></dl>",
            "https://www.ebay.com/sh/ord",
            Utc::now(),
        );
        assert_eq!(out.record.order_id, "01-23456-78901");
        assert!(!out.validation.accepted);
    }
}
