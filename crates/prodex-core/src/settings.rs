//! Per-run scrape settings.
//!
//! Settings are always passed explicitly into the validator and the bulk
//! orchestrator; nothing reads them from ambient state. They are typically
//! imported from a JSON file exported by the user.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeSettings {
    pub require_price: bool,
    /// Only accept records carrying the fast-shipping badge.
    pub require_fulfillment_flag: bool,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub max_ship_days: Option<u32>,
    /// Process at most this many links from a bulk input.
    pub max_count: Option<usize>,
    /// Skip links whose id is already stored instead of re-scraping them.
    pub skip_duplicates: bool,
}

/// The subset of [`ScrapeSettings`] the validator acts on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationRules {
    pub require_price: bool,
    pub require_fulfillment_flag: bool,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub max_ship_days: Option<u32>,
}

impl ScrapeSettings {
    /// Parses settings from JSON text and validates them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SettingsParse`] for malformed JSON and
    /// [`ConfigError::Validation`] for contradictory values.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: ScrapeSettings =
            serde_json::from_str(raw).map_err(ConfigError::SettingsParse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when `minPrice` exceeds `maxPrice`,
    /// a price bound is negative, or `maxCount` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, bound) in [("minPrice", self.min_price), ("maxPrice", self.max_price)] {
            if bound.is_some_and(|b| b.is_sign_negative()) {
                return Err(ConfigError::Validation(format!(
                    "{name} must not be negative"
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "minPrice {min} is greater than maxPrice {max}"
                )));
            }
        }

        if self.max_count == Some(0) {
            return Err(ConfigError::Validation(
                "maxCount must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn rules(&self) -> ValidationRules {
        ValidationRules {
            require_price: self.require_price,
            require_fulfillment_flag: self.require_fulfillment_flag,
            min_price: self.min_price,
            max_price: self.max_price,
            max_ship_days: self.max_ship_days,
        }
    }
}

/// Load and validate scrape settings from a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed, or fails validation.
pub fn load_settings(path: &Path) -> Result<ScrapeSettings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    ScrapeSettings::from_json_str(&content)
}
