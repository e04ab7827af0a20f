pub mod app_config;
pub mod brand_rules;
pub mod config;
pub mod records;
pub mod settings;

pub use app_config::{AppConfig, Environment};
pub use brand_rules::{load_brand_rules, BrandRuleConfig, BrandRulesFile, SiteRules};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{
    Financials, KeyedRecord, OrderItem, OrderRecord, ProductRecord, RecordKind, ShippingAddress,
    MAX_IMAGES,
};
pub use settings::{load_settings, ScrapeSettings, ValidationRules};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse brand rules file: {0}")]
    BrandRulesParse(#[source] serde_yaml::Error),

    #[error("failed to parse scrape settings: {0}")]
    SettingsParse(#[source] serde_json::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
