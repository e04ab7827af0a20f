//! Brand and marketplace wording removal.
//!
//! Each site carries an ordered list of regex substitutions. After the
//! substitutions a tidy pass repairs the punctuation and spacing they leave
//! behind. The whole pass repeats until the text stops changing, so
//! sanitizing already-sanitized text is a no-op.

use std::collections::HashMap;
use std::sync::LazyLock;

use prodex_core::{BrandRuleConfig, BrandRulesFile, ProductRecord};
use regex::{Regex, RegexBuilder};

use crate::error::ScraperError;
use crate::sites::Site;

static EMPTY_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)|\[\s*\]|\{\s*\}").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;:!?])").expect("valid regex"));
static DOUBLED_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([,;:!?])(?:\s*[,;:])+").expect("valid regex"));
static LEADING_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s,.;:!?|/&\-–—]+").expect("valid regex"));
static TRAILING_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,;:|/&\-–—]+$").expect("valid regex"));

const AMAZON_RULES: &[&str] = &[
    r"https?://(?:[a-z0-9-]+\.)*amazon\.[a-z.]+\S*",
    r"https?://(?:[a-z0-9-]+\.)*amzn\.(?:to|com)\S*",
    r"\bAmazon\s+Prime\b",
    r"\bAmazon'?s?\s+Choice\b",
    r"\bAmazon\s+Basics\b",
    r"\bAmazon(?:\.com)?\b",
    r"\bPrime\s+(?:eligible|shipping|delivery|members?)\b",
    r"\bVisit\s+the\s+[^.]{0,40}?\s+Store\b",
];

const YAMI_RULES: &[&str] = &[
    r"https?://(?:[a-z0-9-]+\.)*yami(?:buy)?\.com\S*",
    r"\bYamibuy\b",
    r"\bYami\b",
];

const COSTCO_RULES: &[&str] = &[
    r"https?://(?:[a-z0-9-]+\.)*costco\.[a-z.]+\S*",
    r"\bCostco(?:\.com)?\s+(?:Wholesale|Member(?:ship)?s?|Exclusive)\b",
    r"\bCostco(?:\.com)?\b",
    r"\bmembers?\s+only\b",
];

const EBAY_RULES: &[&str] = &[
    r"https?://(?:[a-z0-9-]+\.)*ebay\.[a-z.]+\S*",
    r"\beBay\s+(?:Money\s+Back\s+Guarantee|Refurbished)\b",
    r"\beBay\b",
];

static BUILTIN: LazyLock<SanitizerSet> = LazyLock::new(|| {
    let by_site = Site::ALL
        .into_iter()
        .map(|site| {
            let sanitizer =
                Sanitizer::new(&builtin_rules(site)).expect("built-in brand rules are valid");
            (site, sanitizer)
        })
        .collect();
    SanitizerSet { by_site }
});

/// The removal rules a site uses when no rules file overrides them.
#[must_use]
pub fn builtin_rules(site: Site) -> Vec<BrandRuleConfig> {
    let patterns = match site {
        Site::Amazon => AMAZON_RULES,
        Site::Yami => YAMI_RULES,
        Site::Costco => COSTCO_RULES,
        Site::Ebay => EBAY_RULES,
    };
    patterns.iter().copied().map(BrandRuleConfig::remove).collect()
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Regex,
    replacement: String,
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    rules: Vec<CompiledRule>,
}

impl Sanitizer {
    /// Compiles `rules` case-insensitively, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBrandRule`] for a pattern that does
    /// not compile.
    pub fn new(rules: &[BrandRuleConfig]) -> Result<Self, ScraperError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let pattern = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ScraperError::InvalidBrandRule {
                        pattern: rule.pattern.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(CompiledRule {
                    pattern,
                    replacement: rule.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>, ScraperError>>()?;
        Ok(Self { rules })
    }

    /// Applies passes until the text stops changing.
    ///
    /// A pass that does not shorten the text ends the loop, so a rule whose
    /// replacement grows the text cannot repeat forever.
    #[must_use]
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = self.pass(text);
        loop {
            let next = self.pass(&current);
            if next.len() >= current.len() {
                return next;
            }
            current = next;
        }
    }

    /// Returns a copy of `record` with title, description, bullet points,
    /// and specification values sanitized. Blank bullets and specification
    /// rows are dropped; a blank title becomes `None`.
    #[must_use]
    pub fn sanitize_product(&self, record: &ProductRecord) -> ProductRecord {
        let mut clean = record.clone();
        clean.title = record
            .title
            .as_deref()
            .map(|t| self.sanitize(t))
            .filter(|t| !t.is_empty());
        clean.description = self.sanitize(&record.description);
        clean.bullet_points = record
            .bullet_points
            .iter()
            .map(|b| self.sanitize(b))
            .filter(|b| !b.is_empty())
            .collect();
        clean.specifications = record
            .specifications
            .iter()
            .map(|(key, value)| (key.clone(), self.sanitize(value)))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        clean
    }

    fn pass(&self, text: &str) -> String {
        let mut out = text.to_owned();
        for rule in &self.rules {
            out = rule
                .pattern
                .replace_all(&out, rule.replacement.as_str())
                .into_owned();
        }
        tidy(&out)
    }
}

fn tidy(text: &str) -> String {
    let out = EMPTY_BRACKETS.replace_all(text, "");
    let out = WHITESPACE.replace_all(&out, " ");
    let out = SPACE_BEFORE_PUNCT.replace_all(&out, "$1");
    let out = DOUBLED_PUNCT.replace_all(&out, "$1");
    let out = LEADING_PUNCT.replace(&out, "");
    let out = TRAILING_PUNCT.replace(&out, "");
    out.trim().to_owned()
}

/// One sanitizer per supported site.
#[derive(Debug, Clone)]
pub struct SanitizerSet {
    by_site: HashMap<Site, Sanitizer>,
}

impl SanitizerSet {
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Built-in sanitizers with each site listed in `file` replaced by the
    /// file's rules. Unknown site names are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBrandRule`] if a configured pattern
    /// does not compile.
    pub fn from_rules_file(file: &BrandRulesFile) -> Result<Self, ScraperError> {
        let mut set = Self::builtin();
        for site_rules in &file.sites {
            match site_rules.site.parse::<Site>() {
                Ok(site) => {
                    set.by_site.insert(site, Sanitizer::new(&site_rules.rules)?);
                }
                Err(reason) => {
                    tracing::warn!(site = %site_rules.site, %reason, "ignoring brand rules");
                }
            }
        }
        Ok(set)
    }

    #[must_use]
    pub fn for_site(&self, site: Site) -> &Sanitizer {
        // Every site is inserted at construction.
        &self.by_site[&site]
    }
}

impl Default for SanitizerSet {
    fn default() -> Self {
        Self::builtin()
    }
}
