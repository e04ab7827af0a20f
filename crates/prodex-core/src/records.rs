//! Scraped record shapes shared by the scraper and the record store.
//!
//! Field names serialize in camelCase so the persisted JSON matches the
//! export format consumed downstream (`externalId`, `bulletPoints`, ...).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on images kept per product.
pub const MAX_IMAGES: usize = 10;

/// Which record family a stored payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Product,
    Order,
}

impl RecordKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Product => "product",
            RecordKind::Order => "order",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record the store can dedup by a stable site-provided key.
pub trait KeyedRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn record_key(&self) -> &str;
}

/// A product scraped from a product detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Site identifier, e.g. an Amazon ASIN or an eBay item number.
    pub external_id: String,
    pub title: Option<String>,
    /// Formatted currency string such as `"$35.99"`.
    pub price: Option<String>,
    /// Formatted currency string; `"$0.00"` for free delivery.
    pub delivery_fee: Option<String>,
    /// Estimated days until delivery, when the page states one.
    #[serde(default)]
    pub delivery_days: Option<u32>,
    /// Fast or guaranteed shipping badge (Prime, Fulfilled by X, ...).
    pub fulfillment_flag: bool,
    /// Absolute, deduplicated URLs in discovery order; at most [`MAX_IMAGES`].
    pub images: Vec<String>,
    pub description: String,
    pub bullet_points: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    /// Site tag, e.g. `"amazon"`.
    pub source: String,
}

impl ProductRecord {
    /// Creates a record with every extracted field empty.
    #[must_use]
    pub fn empty(
        external_id: impl Into<String>,
        source_url: impl Into<String>,
        source: impl Into<String>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            title: None,
            price: None,
            delivery_fee: None,
            delivery_days: None,
            fulfillment_flag: false,
            images: Vec::new(),
            description: String::new(),
            bullet_points: Vec::new(),
            specifications: BTreeMap::new(),
            source_url: source_url.into(),
            scraped_at,
            source: source.into(),
        }
    }

    /// Appends an image unless it is already present or the cap is reached.
    /// Returns `true` when the image was added.
    pub fn push_image(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.images.len() >= MAX_IMAGES || self.images.iter().any(|u| *u == url) {
            return false;
        }
        self.images.push(url);
        true
    }

    /// Inserts a specification row; a repeated key overwrites the earlier value.
    pub fn insert_spec(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.specifications.insert(key.into(), value.into());
    }
}

impl KeyedRecord for ProductRecord {
    const KIND: RecordKind = RecordKind::Product;

    fn record_key(&self) -> &str {
        &self.external_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: Option<String>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub title: Option<String>,
    pub item_id: Option<String>,
    pub sku: Option<String>,
    pub quantity: u32,
    pub sold_price: Option<String>,
}

impl Default for OrderItem {
    fn default() -> Self {
        Self {
            title: None,
            item_id: None,
            sku: None,
            quantity: 1,
            sold_price: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    pub total_sale: Option<String>,
    pub your_earnings: Option<String>,
    pub fees: Option<String>,
    pub shipping_cost: Option<String>,
}

/// A sold order scraped from a seller's order detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: String,
    pub order_date: Option<String>,
    pub buyer_username: Option<String>,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub financials: Financials,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub status: Option<String>,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
}

impl OrderRecord {
    #[must_use]
    pub fn empty(
        order_id: impl Into<String>,
        url: impl Into<String>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            order_date: None,
            buyer_username: None,
            shipping_address: ShippingAddress::default(),
            items: Vec::new(),
            financials: Financials::default(),
            tracking_number: None,
            carrier: None,
            status: None,
            url: url.into(),
            scraped_at,
        }
    }
}

impl KeyedRecord for OrderRecord {
    const KIND: RecordKind = RecordKind::Order;

    fn record_key(&self) -> &str {
        &self.order_id
    }
}
