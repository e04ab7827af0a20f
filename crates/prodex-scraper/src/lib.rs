//! Product and order extraction for storefront pages.
//!
//! Pages are parsed into a [`Document`], run through the site's strategy
//! table, sanitized, validated, and handed to a dedup store. The
//! [`BulkScraper`] drives that pipeline over many links.

pub mod assemble;
pub mod bulk;
pub mod document;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
mod rate_limit;
pub mod sanitize;
pub mod sites;
pub mod validate;

pub use assemble::{assemble_order, assemble_product};
pub use bulk::{BulkOptions, BulkProgress, BulkScraper, BulkSummary, ItemOutcome, ItemStatus};
pub use document::Document;
pub use error::{ScraperError, StrategyError};
pub use extract::{extract, FieldKind, FieldValue};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use pipeline::{
    process_order_page, process_product_page, BulkLink, ProcessedOrder, ProcessedProduct,
};
pub use sanitize::{builtin_rules, Sanitizer, SanitizerSet};
pub use sites::{OrderProfile, Site, SiteProfile, EBAY_ORDER};
pub use validate::{parse_price, validate, validate_order, Validation};
