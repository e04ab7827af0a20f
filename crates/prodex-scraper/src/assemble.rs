//! Record assembly: run every field's strategy chain over a parsed page.
//!
//! Assembly never fails. Any field may come back empty; deciding whether
//! the result is good enough is the validator's job.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use prodex_core::{OrderItem, OrderRecord, ProductRecord, ShippingAddress};
use regex::Regex;
use scraper::ElementRef;

use crate::document::{collapse_whitespace, element_text, parse_selector, Document};
use crate::extract::{extract, extract_delivery, normalize_price, FieldKind, FieldValue};
use crate::sites::{id_from_url, OrderProfile, SiteProfile};

static CITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<city>[^,]+),\s*(?P<state>[A-Za-z][A-Za-z .]*?)\s+(?P<postal>\d{5}(?:-\d{4})?|[A-Za-z]\d[A-Za-z]\s?\d[A-Za-z]\d)$",
    )
    .expect("valid regex")
});

static PHONE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:phone:?\s*)?\+?[\d\s().-]{7,}$").expect("valid regex"));

static ITEM_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:/itm/(?:[^/?#]+/)?|item\s+(?:number|#)\s*:?\s*)(\d{9,15})")
        .expect("valid regex")
});

static SKU: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:custom\s+label\s*(?:\(sku\))?|\bsku)\s*:?\s*([A-Za-z0-9][\w.\-]*)")
        .expect("valid regex")
});

static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:quantity|qty)\s*:?\s*(\d+)").expect("valid regex"));

const ADDRESS_HEADINGS: &[&str] = &["ship to", "shipping address", "ship to:", "shipping address:"];

/// Builds a product record from a parsed product page.
#[must_use]
pub fn assemble_product(
    doc: &Document,
    profile: &SiteProfile,
    external_id: &str,
    url: &str,
    scraped_at: DateTime<Utc>,
) -> ProductRecord {
    let mut record = ProductRecord::empty(external_id, url, profile.site.as_str(), scraped_at);

    let field = |kind: FieldKind| extract(kind, doc, profile);

    record.title = field(FieldKind::Title).and_then(FieldValue::into_text);
    record.price = field(FieldKind::Price).and_then(FieldValue::into_text);
    let delivery = extract_delivery(doc, profile.delivery, scraped_at.date_naive());
    record.delivery_fee = delivery.fee;
    record.delivery_days = delivery.days;
    record.fulfillment_flag = field(FieldKind::FulfillmentFlag).is_some_and(|v| v.is_set());
    for image in field(FieldKind::Images).map(FieldValue::into_list).unwrap_or_default() {
        record.push_image(image);
    }
    record.description = field(FieldKind::Description)
        .and_then(FieldValue::into_text)
        .unwrap_or_default();
    record.bullet_points = field(FieldKind::BulletPoints)
        .map(FieldValue::into_list)
        .unwrap_or_default();
    record.specifications = field(FieldKind::Specifications)
        .map(FieldValue::into_map)
        .unwrap_or_default();

    tracing::debug!(
        site = %profile.site,
        external_id,
        has_title = record.title.is_some(),
        has_price = record.price.is_some(),
        images = record.images.len(),
        bullets = record.bullet_points.len(),
        specs = record.specifications.len(),
        "assembled product record"
    );
    record
}

/// Builds an order record from a seller's order detail page.
#[must_use]
pub fn assemble_order(
    doc: &Document,
    profile: &OrderProfile,
    url: &str,
    scraped_at: DateTime<Utc>,
) -> OrderRecord {
    let labelled = |labels: &[&str]| labelled_value(doc, profile.label_selector, labels);
    let money = |labels: &[&str]| labelled(labels).and_then(|v| normalize_price(&v));

    let order_id = id_from_url(profile.id_patterns, url)
        .or_else(|| labelled(profile.order_id_labels))
        .unwrap_or_default();
    let mut order = OrderRecord::empty(order_id, url, scraped_at);

    order.order_date = labelled(profile.order_date_labels);
    order.buyer_username = labelled(profile.buyer_labels);
    order.tracking_number = labelled(profile.tracking_labels);
    order.carrier = labelled(profile.carrier_labels);
    order.status = labelled(profile.status_labels);

    order.financials.total_sale = money(profile.total_sale_labels);
    order.financials.your_earnings = money(profile.earnings_labels);
    order.financials.fees = money(profile.fees_labels);
    order.financials.shipping_cost = money(profile.shipping_cost_labels);

    order.shipping_address = shipping_address(doc, profile);
    order.items = line_items(doc, profile);

    tracing::debug!(
        order_id = %order.order_id,
        items = order.items.len(),
        "assembled order record"
    );
    order
}

/// Value next to the first element under `label_selector` whose text is
/// exactly one of `labels` (case-insensitive, trailing colon ignored).
/// Labels are tried in priority order.
fn labelled_value(doc: &Document, label_selector: &str, labels: &[&str]) -> Option<String> {
    let candidates = match doc.select_all(label_selector) {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(error = %e, "label lookup failed");
            return None;
        }
    };
    let normalized: Vec<(ElementRef<'_>, String)> = candidates
        .into_iter()
        .map(|el| {
            let label = element_text(el)
                .trim_end_matches(':')
                .trim()
                .to_lowercase();
            (el, label)
        })
        .collect();

    labels.iter().find_map(|wanted| {
        normalized
            .iter()
            .filter(|(_, label)| label == wanted)
            .find_map(|(el, _)| value_after(*el))
    })
}

/// Text of the label's next element sibling, or of its parent's when the
/// label sits alone in a wrapper.
fn value_after(label: ElementRef<'_>) -> Option<String> {
    let parent = label.parent().and_then(ElementRef::wrap);
    [Some(label), parent].into_iter().flatten().find_map(|node| {
        node.next_siblings()
            .find_map(ElementRef::wrap)
            .map(element_text)
            .filter(|t| !t.is_empty())
    })
}

fn is_phone(line: &str) -> bool {
    PHONE_LINE.is_match(&line.to_lowercase())
        && line.chars().filter(char::is_ascii_digit).count() >= 7
}

fn shipping_address(doc: &Document, profile: &OrderProfile) -> ShippingAddress {
    let block = profile.address_blocks.iter().find_map(|css| {
        doc.select_first(css)
            .map_err(|e| tracing::debug!(selector = css, error = %e, "address lookup failed"))
            .ok()
            .flatten()
    });
    let Some(block) = block else {
        return ShippingAddress::default();
    };

    let lines: Vec<String> = block
        .text()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .filter(|line| !ADDRESS_HEADINGS.contains(&line.to_lowercase().as_str()))
        .collect();

    let mut address = ShippingAddress::default();
    let city_idx = lines.iter().position(|line| CITY_LINE.is_match(line));
    if let Some(caps) = city_idx.and_then(|i| CITY_LINE.captures(&lines[i])) {
        address.city = Some(caps["city"].trim().to_owned());
        address.state_or_province = Some(caps["state"].trim().to_owned());
        address.postal_code = Some(caps["postal"].to_owned());
    }
    address.phone_number = lines
        .iter()
        .find(|line| is_phone(line))
        .map(|line| {
            line.trim_start_matches(|c: char| c.is_alphabetic() || c == ':')
                .trim()
                .to_owned()
        });

    let street: Vec<&String> = lines[..city_idx.unwrap_or(lines.len())]
        .iter()
        .filter(|line| !is_phone(line))
        .collect();
    address.name = street.first().map(|s| (*s).clone());
    address.address_line1 = street.get(1).map(|s| (*s).clone());
    address
}

fn line_items(doc: &Document, profile: &OrderProfile) -> Vec<OrderItem> {
    let rows = match doc.select_all(profile.item_rows) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::debug!(error = %e, "line item lookup failed");
            return Vec::new();
        }
    };
    let first_in = |row: ElementRef<'_>, css: &str| -> Option<String> {
        let selector = parse_selector(css).ok()?;
        row.select(&selector)
            .map(element_text)
            .find(|t| !t.is_empty())
    };

    rows.into_iter()
        .filter_map(|row| {
            let text = element_text(row);
            let href = parse_selector(profile.item_link)
                .ok()
                .and_then(|sel| row.select(&sel).find_map(|a| a.value().attr("href")))
                .unwrap_or_default();

            let item = OrderItem {
                title: first_in(row, profile.item_title),
                item_id: ITEM_NUMBER
                    .captures(href)
                    .or_else(|| ITEM_NUMBER.captures(&text))
                    .map(|c| c[1].to_owned()),
                sku: SKU.captures(&text).map(|c| c[1].to_owned()),
                quantity: QUANTITY
                    .captures(&text)
                    .and_then(|c| c[1].parse().ok())
                    .unwrap_or(1),
                sold_price: first_in(row, profile.item_price)
                    .and_then(|p| normalize_price(&p))
                    .or_else(|| normalize_price(&text)),
            };
            (item.title.is_some() || item.item_id.is_some()).then_some(item)
        })
        .collect()
}

#[cfg(test)]
#[path = "assemble_test.rs"]
mod tests;
