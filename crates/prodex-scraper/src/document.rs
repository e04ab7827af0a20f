//! Parsed page wrapper used by every extraction strategy.
//!
//! `scraper::Html` is not `Send`, so a [`Document`] must be built, read, and
//! dropped without crossing an `.await`.

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::StrategyError;

pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            base_url: None,
        }
    }

    /// Parses `html` and remembers `page_url` for resolving relative links.
    /// An unparseable URL leaves relative links unresolved.
    #[must_use]
    pub fn parse_with_url(html: &str, page_url: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            base_url: Url::parse(page_url).ok(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// # Errors
    ///
    /// Returns [`StrategyError::InvalidSelector`] if `css` does not parse.
    pub fn select_first(&self, css: &str) -> Result<Option<ElementRef<'_>>, StrategyError> {
        let selector = parse_selector(css)?;
        Ok(self.html.select(&selector).next())
    }

    /// # Errors
    ///
    /// Returns [`StrategyError::InvalidSelector`] if `css` does not parse.
    pub fn select_all(&self, css: &str) -> Result<Vec<ElementRef<'_>>, StrategyError> {
        let selector = parse_selector(css)?;
        Ok(self.html.select(&selector).collect())
    }

    /// Text of the first element matching `css` that has any non-blank text.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::InvalidSelector`] if `css` does not parse.
    pub fn text_of(&self, css: &str) -> Result<Option<String>, StrategyError> {
        Ok(self
            .select_all(css)?
            .into_iter()
            .map(element_text)
            .find(|t| !t.is_empty()))
    }

    /// Non-blank value of `attr` on the first matching element that has it.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::InvalidSelector`] if `css` does not parse.
    pub fn attr_of(&self, css: &str, attr: &str) -> Result<Option<String>, StrategyError> {
        Ok(self.select_all(css)?.into_iter().find_map(|el| {
            el.value()
                .attr(attr)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        }))
    }

    /// Content of `<meta property=key>` or `<meta name=key>`.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<String> {
        let selector = parse_selector("meta").ok()?;
        self.html.select(&selector).find_map(|el| {
            let value = el.value();
            let matches = value.attr("property") == Some(key) || value.attr("name") == Some(key);
            if !matches {
                return None;
            }
            value
                .attr("content")
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
        })
    }

    /// Every JSON-LD object typed `Product`, including those nested in
    /// top-level arrays and `@graph` containers. Malformed blocks are skipped.
    #[must_use]
    pub fn json_ld_products(&self) -> Vec<Value> {
        let Ok(selector) = parse_selector(r#"script[type="application/ld+json"]"#) else {
            return Vec::new();
        };

        let mut products = Vec::new();
        for script in self.html.select(&selector) {
            let raw: String = script.text().collect();
            let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
                tracing::trace!("skipping unparseable JSON-LD block");
                continue;
            };
            collect_products(value, &mut products);
        }
        products
    }

    /// Raw text of every inline `<script>` without a `src`.
    #[must_use]
    pub fn inline_scripts(&self) -> Vec<String> {
        let Ok(selector) = parse_selector("script:not([src])") else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    /// Resolves a possibly relative link against the page URL.
    ///
    /// `//host/x` gains `https:`; `/x` and `x` are joined onto the page URL
    /// when one is known. Returns `None` for blank, `data:`, and
    /// `javascript:` values and for relative links with no base.
    #[must_use]
    pub fn absolutize(&self, link: &str) -> Option<String> {
        let link = link.trim();
        if link.is_empty() || link.starts_with("data:") || link.starts_with("javascript:") {
            return None;
        }
        if let Some(rest) = link.strip_prefix("//") {
            return Some(format!("https://{rest}"));
        }
        if link.starts_with("http://") || link.starts_with("https://") {
            return Some(link.to_owned());
        }
        self.base_url
            .as_ref()
            .and_then(|base| base.join(link).ok())
            .map(String::from)
    }
}

fn collect_products(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_products(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_products(graph, out);
            }
            let is_product = match map.get("@type") {
                Some(Value::String(t)) => t == "Product",
                Some(Value::Array(types)) => types.iter().any(|t| t == "Product"),
                _ => false,
            };
            if is_product {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector, StrategyError> {
    Selector::parse(css).map_err(|e| StrategyError::InvalidSelector {
        selector: css.to_owned(),
        reason: e.to_string(),
    })
}

/// Visible text of an element with whitespace runs collapsed to one space.
#[must_use]
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
