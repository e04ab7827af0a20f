//! Field extraction by ordered strategy chains.
//!
//! Each field of a [`SiteProfile`] lists strategies as plain data. The
//! engine evaluates them in order and the first plausible result wins; a
//! strategy that errors is logged and treated as having found nothing.
//! Images are the one exception and are unioned across strategies.

mod delivery;
mod images;
mod price;
mod sections;

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;

use crate::document::Document;
use crate::error::StrategyError;
use crate::sites::SiteProfile;

pub use delivery::{extract_delivery, parse_delivery, DeliveryInfo};
pub use images::{extract_images, ImageStrategy};
pub use price::{extract_price, normalize_price, PriceStrategy};
pub use sections::{extract_bullets, extract_specifications, SectionSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Price,
    DeliveryFee,
    Images,
    Description,
    BulletPoints,
    Specifications,
    FulfillmentFlag,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Title => "title",
            FieldKind::Price => "price",
            FieldKind::DeliveryFee => "deliveryFee",
            FieldKind::Images => "images",
            FieldKind::Description => "description",
            FieldKind::BulletPoints => "bulletPoints",
            FieldKind::Specifications => "specifications",
            FieldKind::FulfillmentFlag => "fulfillmentFlag",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl FieldValue {
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_list(self) -> Vec<String> {
        match self {
            FieldValue::List(items) => items,
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, String> {
        match self {
            FieldValue::Map(map) => map,
            _ => BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, FieldValue::Flag(true))
    }
}

/// Strategy for a single free-text value.
#[derive(Debug, Clone, Copy)]
pub enum TextStrategy {
    /// Text of the first matching element with non-blank text.
    Selector(&'static str),
    /// Attribute value of the first matching element that carries it.
    Attr {
        selector: &'static str,
        attr: &'static str,
    },
    /// `<meta property|name=...>` content.
    Meta(&'static str),
    /// String at a dotted path inside a JSON-LD `Product` object.
    JsonLd(&'static str),
}

impl TextStrategy {
    pub(crate) fn evaluate(&self, doc: &Document) -> Result<Option<String>, StrategyError> {
        let found = match *self {
            TextStrategy::Selector(css) => doc.text_of(css)?,
            TextStrategy::Attr { selector, attr } => doc.attr_of(selector, attr)?,
            TextStrategy::Meta(key) => doc.meta(key),
            TextStrategy::JsonLd(path) => doc.json_ld_products().iter().find_map(|product| {
                path.split('.')
                    .try_fold(product, |node, key| node.get(key))
                    .and_then(|v| v.as_str())
                    .map(str::to_owned)
            }),
        };
        Ok(found
            .map(|s| crate::document::collapse_whitespace(&s))
            .filter(|s| !s.is_empty()))
    }
}

/// Strategy for a boolean badge such as Prime or "Fulfilled by".
#[derive(Debug, Clone, Copy)]
pub enum FlagStrategy {
    /// Set when any element matches.
    Present(&'static str),
    /// Set when a matching element's text contains `phrase` (case-insensitive).
    TextContains {
        selector: &'static str,
        phrase: &'static str,
    },
}

impl FlagStrategy {
    fn evaluate(&self, doc: &Document) -> Result<Option<bool>, StrategyError> {
        let hit = match *self {
            FlagStrategy::Present(css) => doc.select_first(css)?.is_some(),
            FlagStrategy::TextContains { selector, phrase } => {
                let phrase = phrase.to_lowercase();
                doc.select_all(selector)?.into_iter().any(|el| {
                    crate::document::element_text(el)
                        .to_lowercase()
                        .contains(&phrase)
                })
            }
        };
        Ok(hit.then_some(true))
    }
}

/// Evaluates `strategies` in order and returns the first `Some`.
pub(crate) fn first_match<S, T>(
    field: FieldKind,
    strategies: &[S],
    mut evaluate: impl FnMut(&S) -> Result<Option<T>, StrategyError>,
) -> Option<T>
where
    S: fmt::Debug,
{
    for (position, strategy) in strategies.iter().enumerate() {
        match evaluate(strategy) {
            Ok(Some(value)) => {
                tracing::trace!(%field, position, ?strategy, "strategy matched");
                return Some(value);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(%field, position, ?strategy, error = %e, "strategy failed");
            }
        }
    }
    None
}

#[must_use]
pub fn extract_text(
    field: FieldKind,
    doc: &Document,
    strategies: &[TextStrategy],
) -> Option<String> {
    first_match(field, strategies, |s| s.evaluate(doc))
}

#[must_use]
pub fn extract_flag(doc: &Document, strategies: &[FlagStrategy]) -> bool {
    first_match(FieldKind::FulfillmentFlag, strategies, |s| s.evaluate(doc)).unwrap_or(false)
}

/// Extracts one field from `doc` with the profile's strategy chain, or
/// `None` when no strategy produced a plausible value.
///
/// Delivery days are not a chain of their own; they come from
/// [`extract_delivery`] alongside the fee, measured against a scrape date.
#[must_use]
pub fn extract(field: FieldKind, doc: &Document, profile: &SiteProfile) -> Option<FieldValue> {
    match field {
        FieldKind::Title => extract_text(field, doc, profile.title).map(FieldValue::Text),
        FieldKind::Description => {
            extract_text(field, doc, profile.description).map(FieldValue::Text)
        }
        FieldKind::Price => extract_price(doc, profile.price).map(FieldValue::Text),
        FieldKind::DeliveryFee => extract_delivery(doc, profile.delivery, Utc::now().date_naive())
            .fee
            .map(FieldValue::Text),
        FieldKind::Images => {
            let images = extract_images(doc, profile);
            (!images.is_empty()).then_some(FieldValue::List(images))
        }
        FieldKind::BulletPoints => {
            let bullets = extract_bullets(doc, &profile.bullets);
            (!bullets.is_empty()).then_some(FieldValue::List(bullets))
        }
        FieldKind::Specifications => {
            let specs = extract_specifications(doc, &profile.specifications);
            (!specs.is_empty()).then_some(FieldValue::Map(specs))
        }
        FieldKind::FulfillmentFlag => {
            extract_flag(doc, profile.fulfillment).then_some(FieldValue::Flag(true))
        }
    }
}

/// Strips the left-to-right / right-to-left marks some sites pad labels with.
pub(crate) fn strip_direction_marks(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200e}' | '\u{200f}' | '\u{200b}' | '\u{feff}'))
        .collect()
}
