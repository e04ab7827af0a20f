use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::ElementRef;
use serde_json::Value;

use super::{first_match, FieldKind};
use crate::document::{element_text, Document};
use crate::error::StrategyError;

static PRICE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$(?:\d{1,3}(?:,\d{3})*|\d+)\.\d{2}$").expect("valid regex")
});

static PRICE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}").expect("valid regex")
});

const UNITS: &str = r"(?:fl\.?\s*oz|fluid\s+ounces?|ounces?|oz|counts?|ct|items?|units?|each|pounds?|lbs?|grams?|g|kg|kilograms?|ml|liters?|litres?|l|sheets?|feet|foot|ft|100\s*(?:g|ml|count)?)\b";

// "$0.42 / Fl Oz", "$12.99 per ounce"
static UNIT_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^[\s)]*(?:\bper\s*|/\s*){UNITS}")).expect("valid regex")
});

// "Price per ounce: $0.42"
static UNIT_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)(?:\bper\s*|/\s*){UNITS}\s*:\s*$")).expect("valid regex")
});

// Characters of context on each side of a price token searched for unit wording.
const CONTEXT_CHARS: usize = 30;
// Ancestor levels searched by the per-unit guard.
const UNIT_GUARD_DEPTH: usize = 3;

/// Strategy for the product's selling price.
#[derive(Debug, Clone, Copy)]
pub enum PriceStrategy {
    /// Currency tokens in the text of matching elements.
    Selector(&'static str),
    /// A price split over separate whole and fraction elements inside `container`.
    Split {
        container: &'static str,
        whole: &'static str,
        fraction: &'static str,
    },
    /// A numeric `<meta>` amount such as `product:price:amount`.
    Meta(&'static str),
    /// `offers.price` / `offers.lowPrice` of a JSON-LD `Product`.
    JsonLdOffer,
}

impl PriceStrategy {
    fn evaluate(&self, doc: &Document) -> Result<Option<String>, StrategyError> {
        match *self {
            PriceStrategy::Selector(css) => Ok(doc
                .select_all(css)?
                .into_iter()
                .find_map(price_in_element)),
            PriceStrategy::Split {
                container,
                whole,
                fraction,
            } => {
                let whole_sel = crate::document::parse_selector(whole)?;
                let fraction_sel = crate::document::parse_selector(fraction)?;
                Ok(doc.select_all(container)?.into_iter().find_map(|el| {
                    let whole: String = el
                        .select(&whole_sel)
                        .next()
                        .map(element_text)?
                        .chars()
                        .filter(|c| c.is_ascii_digit() || *c == ',')
                        .collect();
                    let fraction: String = el
                        .select(&fraction_sel)
                        .next()
                        .map(element_text)?
                        .chars()
                        .filter(char::is_ascii_digit)
                        .collect();
                    let candidate = format!("${whole}.{fraction}");
                    (PRICE_SHAPE.is_match(&candidate) && !is_unit_price(el, &candidate))
                        .then_some(candidate)
                }))
            }
            PriceStrategy::Meta(key) => Ok(doc.meta(key).and_then(|raw| format_amount(&raw))),
            PriceStrategy::JsonLdOffer => Ok(doc
                .json_ld_products()
                .iter()
                .find_map(|product| offer_price(product.get("offers")?))),
        }
    }
}

/// First price in the profile's strategy chain that passes the currency
/// shape check and the per-unit guard.
#[must_use]
pub fn extract_price(doc: &Document, strategies: &[PriceStrategy]) -> Option<String> {
    first_match(FieldKind::Price, strategies, |s| s.evaluate(doc))
}

/// Returns the first well-formed dollar amount in `text`, normalized to
/// `$1,234.56` / `$35.99` form, ignoring amounts followed or preceded by
/// unit-rate wording.
#[must_use]
pub fn normalize_price(text: &str) -> Option<String> {
    tokens_in(text).into_iter().find_map(|(candidate, before, after)| {
        let unit_context = is_unit_context(before, after);
        (!unit_context).then_some(candidate)
    })
}

fn is_unit_context(before: &str, after: &str) -> bool {
    UNIT_BEFORE.is_match(before) || UNIT_AFTER.is_match(after)
}

fn price_in_element(el: ElementRef<'_>) -> Option<String> {
    let text = element_text(el);
    normalize_price(&text).filter(|candidate| !is_unit_price(el, candidate))
}

/// Per-unit guard: looks at the element and up to three ancestors for unit
/// wording next to `candidate`, or for a unit-price class or id.
fn is_unit_price(el: ElementRef<'_>, candidate: &str) -> bool {
    let levels = std::iter::once(el).chain(el.ancestors().filter_map(ElementRef::wrap));
    for node in levels.take(UNIT_GUARD_DEPTH + 1) {
        let value = node.value();
        let marker = format!(
            "{} {}",
            value.attr("class").unwrap_or_default(),
            value.attr("id").unwrap_or_default()
        )
        .to_lowercase()
        .replace(['-', '_'], "");
        if marker.contains("perunit") || marker.contains("unitprice") {
            return true;
        }

        let text = element_text(node);
        let near_candidate = tokens_in(&text)
            .into_iter()
            .find(|(token, _, _)| token == candidate);
        if let Some((_, before, after)) = near_candidate {
            if is_unit_context(before, after) {
                return true;
            }
        }
    }
    false
}

/// Every price token in `text` that has the accepted shape, with the text
/// around it bounded by neighbouring tokens and [`CONTEXT_CHARS`].
fn tokens_in(text: &str) -> Vec<(String, &str, &str)> {
    let matches: Vec<_> = PRICE_TOKEN.find_iter(text).collect();
    matches
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            let candidate: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
            if !PRICE_SHAPE.is_match(&candidate) {
                return None;
            }
            let lower = i.checked_sub(1).map_or(0, |p| matches[p].end());
            let upper = matches.get(i + 1).map_or(text.len(), regex::Match::start);
            let before = tail_chars(&text[lower..m.start()], CONTEXT_CHARS);
            let after = head_chars(&text[m.end()..upper], CONTEXT_CHARS);
            Some((candidate, before, after))
        })
        .collect()
}

fn head_chars(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(idx, _)| &s[..idx])
}

fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    s.char_indices().nth(count - n).map_or(s, |(idx, _)| &s[idx..])
}

fn offer_price(offers: &Value) -> Option<String> {
    match offers {
        Value::Array(items) => items.iter().find_map(offer_price),
        Value::Object(map) => ["price", "lowPrice"]
            .iter()
            .find_map(|key| match map.get(*key)? {
                Value::Number(n) => format_amount(&n.to_string()),
                Value::String(s) => format_amount(s),
                _ => None,
            }),
        _ => None,
    }
}

/// Formats a bare numeric amount (`"35.9"`, `"1234"`) as `$35.90`.
fn format_amount(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let amount = Decimal::from_str(&cleaned).ok()?;
    if amount.is_sign_negative() {
        return None;
    }
    Some(format!("${:.2}", amount.round_dp(2)))
}
