use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One ordered text substitution applied by the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRuleConfig {
    /// Regular expression, matched case-insensitively.
    pub pattern: String,
    /// Replacement text; empty removes the match.
    #[serde(default)]
    pub replacement: String,
}

impl BrandRuleConfig {
    #[must_use]
    pub fn remove(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRules {
    /// Site tag, e.g. `"amazon"`.
    pub site: String,
    pub rules: Vec<BrandRuleConfig>,
}

#[derive(Debug, Deserialize)]
pub struct BrandRulesFile {
    pub sites: Vec<SiteRules>,
}

impl BrandRulesFile {
    /// Returns the configured rules for a site tag, if the file lists it.
    #[must_use]
    pub fn rules_for(&self, site: &str) -> Option<&[BrandRuleConfig]> {
        self.sites
            .iter()
            .find(|s| s.site.eq_ignore_ascii_case(site))
            .map(|s| s.rules.as_slice())
    }
}

/// Load and validate sanitizer brand rules from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brand_rules(path: &Path) -> Result<BrandRulesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let rules_file: BrandRulesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::BrandRulesParse)?;

    validate_brand_rules(&rules_file)?;

    Ok(rules_file)
}

fn validate_brand_rules(rules_file: &BrandRulesFile) -> Result<(), ConfigError> {
    let mut seen_sites = HashSet::new();

    for site in &rules_file.sites {
        if site.site.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site name must be non-empty".to_string(),
            ));
        }

        if !seen_sites.insert(site.site.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site: '{}'",
                site.site
            )));
        }

        for rule in &site.rules {
            if rule.pattern.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "site '{}' has an empty pattern",
                    site.site
                )));
            }
            if let Err(e) = regex::Regex::new(&rule.pattern) {
                return Err(ConfigError::Validation(format!(
                    "site '{}' has invalid pattern '{}': {e}",
                    site.site, rule.pattern
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, patterns: &[&str]) -> SiteRules {
        SiteRules {
            site: name.to_string(),
            rules: patterns.iter().map(|p| BrandRuleConfig::remove(p)).collect(),
        }
    }

    #[test]
    fn validate_rejects_empty_site_name() {
        let file = BrandRulesFile {
            sites: vec![site("  ", &["Amazon"])],
        };
        let err = validate_brand_rules(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_site() {
        let file = BrandRulesFile {
            sites: vec![site("amazon", &["Amazon"]), site("Amazon", &["Prime"])],
        };
        let err = validate_brand_rules(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate site"));
    }

    #[test]
    fn validate_rejects_bad_regex() {
        let file = BrandRulesFile {
            sites: vec![site("costco", &["Kirkland(", "Costco"])],
        };
        let err = validate_brand_rules(&file).unwrap_err();
        assert!(err.to_string().contains("invalid pattern 'Kirkland('"));
    }

    #[test]
    fn validate_rejects_empty_pattern() {
        let file = BrandRulesFile {
            sites: vec![site("yami", &[""])],
        };
        assert!(validate_brand_rules(&file).is_err());
    }

    #[test]
    fn rules_for_is_case_insensitive() {
        let file = BrandRulesFile {
            sites: vec![site("eBay", &[r"\beBay\b"])],
        };
        assert_eq!(file.rules_for("ebay").map(<[_]>::len), Some(1));
        assert!(file.rules_for("amazon").is_none());
    }

    #[test]
    fn parses_yaml_with_default_replacement() {
        let yaml = r"
sites:
  - site: amazon
    rules:
      - pattern: '\bAmazon\b'
      - pattern: 'Subscribe & Save'
        replacement: 'subscription'
";
        let file: BrandRulesFile = serde_yaml::from_str(yaml).unwrap();
        let rules = file.rules_for("amazon").unwrap();
        assert_eq!(rules[0].replacement, "");
        assert_eq!(rules[1].replacement, "subscription");
    }

    #[test]
    fn load_brand_rules_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("brand_rules.yaml");
        assert!(
            path.exists(),
            "brand_rules.yaml missing at {path:?}; required for this test"
        );
        let result = load_brand_rules(&path);
        assert!(result.is_ok(), "failed to load brand_rules.yaml: {result:?}");
        let rules_file = result.unwrap();
        for tag in ["amazon", "yami", "costco", "ebay"] {
            assert!(rules_file.rules_for(tag).is_some(), "missing rules for {tag}");
        }
    }
}
