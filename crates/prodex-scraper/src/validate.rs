//! Acceptance checks applied to assembled records before they are stored.

use std::str::FromStr;

use prodex_core::{OrderRecord, ProductRecord, ValidationRules};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub accepted: bool,
    /// Why the record was rejected; empty when accepted.
    pub reasons: Vec<String>,
}

impl Validation {
    fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            accepted: reasons.is_empty(),
            reasons,
        }
    }
}

/// Parses a formatted price such as `"$1,234.56"`.
#[must_use]
pub fn parse_price(formatted: &str) -> Option<Decimal> {
    let digits: String = formatted
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    Decimal::from_str(&digits).ok()
}

/// Checks `record` against `rules`; never mutates the record.
#[must_use]
pub fn validate(record: &ProductRecord, rules: &ValidationRules) -> Validation {
    let mut reasons = Vec::new();

    if record.external_id.trim().is_empty() {
        reasons.push("missing external id".to_owned());
    }

    let price = record.price.as_deref().and_then(parse_price);
    if rules.require_price && price.is_none() {
        reasons.push("missing price".to_owned());
    }

    if rules.min_price.is_some() || rules.max_price.is_some() {
        match price {
            None if !rules.require_price => {
                reasons.push("price bounds set but price is unknown".to_owned());
            }
            None => {}
            Some(price) => {
                if let Some(min) = rules.min_price.filter(|min| price < *min) {
                    reasons.push(format!("price {price} is below minimum {min}"));
                }
                if let Some(max) = rules.max_price.filter(|max| price > *max) {
                    reasons.push(format!("price {price} is above maximum {max}"));
                }
            }
        }
    }

    if rules.require_fulfillment_flag && !record.fulfillment_flag {
        reasons.push("missing fulfillment badge".to_owned());
    }

    if let (Some(limit), Some(days)) = (rules.max_ship_days, record.delivery_days) {
        if days > limit {
            reasons.push(format!("delivery in {days} days exceeds limit of {limit}"));
        }
    }

    Validation::from_reasons(reasons)
}

/// An order needs its order number and at least one line item.
#[must_use]
pub fn validate_order(order: &OrderRecord) -> Validation {
    let mut reasons = Vec::new();
    if order.order_id.trim().is_empty() {
        reasons.push("missing order id".to_owned());
    }
    if order.items.is_empty() {
        reasons.push("order has no items".to_owned());
    }
    Validation::from_reasons(reasons)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use prodex_core::OrderItem;
    use rust_decimal::Decimal;

    use super::*;

    fn record(price: Option<&str>) -> ProductRecord {
        let mut r = ProductRecord::empty(
            "B0TEST0001",
            "https://www.amazon.com/dp/B0TEST0001",
            "amazon",
            Utc::now(),
        );
        r.price = price.map(str::to_owned);
        r
    }

    #[test]
    fn default_rules_accept_a_bare_record() {
        let v = validate(&record(None), &ValidationRules::default());
        assert!(v.accepted);
        assert!(v.reasons.is_empty());
    }

    #[test]
    fn require_price_rejects_missing_price() {
        let rules = ValidationRules {
            require_price: true,
            ..ValidationRules::default()
        };
        let v = validate(&record(None), &rules);
        assert!(!v.accepted);
        assert_eq!(v.reasons, vec!["missing price"]);
        assert!(validate(&record(Some("$4.99")), &rules).accepted);
    }

    #[test]
    fn price_bounds() {
        let rules = ValidationRules {
            min_price: Some(Decimal::new(1000, 2)),
            max_price: Some(Decimal::new(100_000, 2)),
            ..ValidationRules::default()
        };
        assert!(validate(&record(Some("$10.00")), &rules).accepted);
        assert!(validate(&record(Some("$1,000.00")), &rules).accepted);
        assert!(!validate(&record(Some("$9.99")), &rules).accepted);
        assert!(!validate(&record(Some("$1,000.01")), &rules).accepted);

        let unknown = validate(&record(None), &rules);
        assert!(!unknown.accepted);
        assert_eq!(unknown.reasons.len(), 1);
    }

    #[test]
    fn fulfillment_and_ship_days() {
        let rules = ValidationRules {
            require_fulfillment_flag: true,
            max_ship_days: Some(3),
            ..ValidationRules::default()
        };
        let mut r = record(Some("$5.00"));
        r.fulfillment_flag = true;
        assert!(validate(&r, &rules).accepted, "unknown delivery time passes");

        r.delivery_days = Some(5);
        let v = validate(&r, &rules);
        assert!(!v.accepted);
        assert!(v.reasons[0].contains("exceeds"));

        r.delivery_days = Some(2);
        r.fulfillment_flag = false;
        assert_eq!(
            validate(&r, &rules).reasons,
            vec!["missing fulfillment badge"]
        );
    }

    #[test]
    fn empty_external_id_is_rejected() {
        let mut r = record(Some("$5.00"));
        r.external_id = String::new();
        assert!(!validate(&r, &ValidationRules::default()).accepted);
    }

    #[test]
    fn orders_need_id_and_items() {
        let mut order = OrderRecord::empty(
            "12-34567-89012",
            "https://www.ebay.com/mesh/ord/details",
            Utc::now(),
        );
        assert!(!validate_order(&order).accepted);
        order.items.push(OrderItem::default());
        assert!(validate_order(&order).accepted);
        order.order_id.clear();
        assert_eq!(validate_order(&order).reasons, vec!["missing order id"]);
    }

    #[test]
    fn parse_price_handles_grouping() {
        assert_eq!(parse_price("$1,234.56"), Some(Decimal::new(123_456, 2)));
        assert_eq!(parse_price("free"), None);
    }
}
