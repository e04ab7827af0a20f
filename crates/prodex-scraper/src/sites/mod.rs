//! Per-site strategy tables.
//!
//! A [`SiteProfile`] is pure data: which selectors, attributes, and
//! patterns to try for each field, in priority order. Adding a site means
//! adding a table, not code.

mod amazon;
mod costco;
mod ebay;
mod yami;

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::document::Document;
use crate::extract::{FlagStrategy, ImageStrategy, PriceStrategy, SectionSpec, TextStrategy};

pub use ebay::{OrderProfile, EBAY_ORDER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Amazon,
    Yami,
    Costco,
    Ebay,
}

impl Site {
    pub const ALL: [Site; 4] = [Site::Amazon, Site::Yami, Site::Costco, Site::Ebay];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Site::Amazon => "amazon",
            Site::Yami => "yami",
            Site::Costco => "costco",
            Site::Ebay => "ebay",
        }
    }

    #[must_use]
    pub fn profile(self) -> &'static SiteProfile {
        match self {
            Site::Amazon => &amazon::PROFILE,
            Site::Yami => &yami::PROFILE,
            Site::Costco => &costco::PROFILE,
            Site::Ebay => &ebay::PROFILE,
        }
    }

    /// Detects the site from a page URL's host (`amazon.com`,
    /// `www.amazon.co.uk`, `m.ebay.com`, ...).
    #[must_use]
    pub fn from_url(url: &str) -> Option<Site> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        Site::ALL.into_iter().find(|site| {
            site.profile().hosts.iter().any(|domain| {
                host == *domain
                    || host.starts_with(&format!("{domain}."))
                    || host.contains(&format!(".{domain}."))
                    || host.ends_with(&format!(".{domain}"))
            })
        })
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Site::ALL
            .into_iter()
            .find(|site| site.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown site \"{s}\" (expected amazon, yami, costco, or ebay)"))
    }
}

/// Strategy tables for one product site.
#[derive(Debug)]
pub struct SiteProfile {
    pub site: Site,
    /// Registrable-domain stems matched against the URL host, e.g. `"amazon"`.
    pub hosts: &'static [&'static str],
    /// URL regexes whose first capture group is the external id.
    pub id_patterns: &'static [&'static str],
    /// DOM lookups for the external id when the URL has none.
    pub id_strategies: &'static [TextStrategy],
    pub title: &'static [TextStrategy],
    pub price: &'static [PriceStrategy],
    /// Containers of the delivery message.
    pub delivery: &'static [&'static str],
    pub fulfillment: &'static [FlagStrategy],
    pub images: &'static [ImageStrategy],
    /// Site-specific URL substrings of non-product images.
    pub image_rejects: &'static [&'static str],
    /// Regex for a size suffix replaced by `.` to get the full-size URL.
    pub image_size_token: Option<&'static str>,
    pub description: &'static [TextStrategy],
    pub bullets: SectionSpec,
    pub specifications: SectionSpec,
}

impl SiteProfile {
    /// The site's identifier for the product on this page: URL patterns
    /// first, then DOM lookups.
    #[must_use]
    pub fn external_id(&self, doc: &Document, url: &str) -> Option<String> {
        id_from_url(self.id_patterns, url).or_else(|| {
            self.id_strategies
                .iter()
                .find_map(|strategy| strategy.evaluate(doc).ok().flatten())
        })
    }
}

/// First capture of the first pattern in `patterns` that matches `url`.
pub(crate) fn id_from_url(patterns: &[&str], url: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let re = Regex::new(pattern)
            .map_err(|e| tracing::debug!(pattern, error = %e, "invalid id pattern"))
            .ok()?;
        re.captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned())
    })
}

/// Section labels shared by every product site.
pub(crate) const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, .section-title, .a-text-bold";
