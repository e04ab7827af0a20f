use thiserror::Error;

use prodex_store::StoreError;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("fetch of {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no strategy table for {url}")]
    UnsupportedSite { url: String },

    #[error("invalid brand rule \"{pattern}\": {reason}")]
    InvalidBrandRule { pattern: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of a single extraction strategy. Always recovered inside the
/// strategy chain; never escapes record assembly.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
