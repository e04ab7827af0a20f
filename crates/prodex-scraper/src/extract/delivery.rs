use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::{first_match, normalize_price, FieldKind};
use crate::document::{element_text, Document};

static FREE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfree\b(?:\s+\w+)?\s+(?:delivery|shipping)\b|\b(?:delivery|shipping)\s*:?\s*free\b")
        .expect("valid regex")
});

static DAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:-|–|to)\s*(\d{1,2})\s+(?:business\s+|working\s+)?days?\b")
        .expect("valid regex")
});

static IN_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|within)\s+(\d{1,2})\s+(?:business\s+|working\s+)?days?\b")
        .expect("valid regex")
});

static CALENDAR_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})\b")
        .expect("valid regex")
});

static TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btomorrow\b").expect("valid regex"));

/// Delivery fee and estimated days parsed from a delivery message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub fee: Option<String>,
    pub days: Option<u32>,
}

/// Reads the first delivery message among `selectors` that states a fee or
/// a delivery time. `today` anchors calendar dates.
#[must_use]
pub fn extract_delivery(
    doc: &Document,
    selectors: &[&'static str],
    today: NaiveDate,
) -> DeliveryInfo {
    first_match(FieldKind::DeliveryFee, selectors, |css| {
        Ok(doc
            .select_all(css)?
            .into_iter()
            .find_map(|el| parse_delivery(&element_text(el), today)))
    })
    .unwrap_or_default()
}

/// Parses a message such as `"FREE delivery Tuesday, March 5"` or
/// `"$5.99 shipping, arrives in 3-5 business days"`.
///
/// A range yields its upper bound. Returns `None` when neither a fee nor a
/// delivery time is stated.
#[must_use]
pub fn parse_delivery(text: &str, today: NaiveDate) -> Option<DeliveryInfo> {
    let fee = if FREE.is_match(text) {
        Some("$0.00".to_owned())
    } else {
        normalize_price(text)
    };
    let days = days_until(text, today);
    (fee.is_some() || days.is_some()).then_some(DeliveryInfo { fee, days })
}

fn days_until(text: &str, today: NaiveDate) -> Option<u32> {
    if let Some(date) = CALENDAR_DATE.captures(text).and_then(|c| {
        let month = month_number(&c[1])?;
        let day: u32 = c[2].parse().ok()?;
        next_occurrence(today, month, day)
    }) {
        return u32::try_from((date - today).num_days()).ok();
    }
    if let Some(c) = DAY_RANGE.captures(text) {
        let low: u32 = c[1].parse().ok()?;
        let high: u32 = c[2].parse().ok()?;
        return Some(low.max(high));
    }
    if let Some(c) = IN_DAYS.captures(text) {
        return c[1].parse().ok();
    }
    TOMORROW.is_match(text).then_some(1)
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = name.get(..3)?.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// The first `month`/`day` on or after `today`, rolling into next year.
fn next_occurrence(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year >= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn free_delivery_with_calendar_date() {
        let info = parse_delivery("FREE delivery Tuesday, March 5", day(2026, 3, 1)).unwrap();
        assert_eq!(info.fee.as_deref(), Some("$0.00"));
        assert_eq!(info.days, Some(4));
    }

    #[test]
    fn paid_delivery_with_business_day_range() {
        let info = parse_delivery(
            "$5.99 shipping. Arrives in 3-5 business days",
            day(2026, 3, 1),
        )
        .unwrap();
        assert_eq!(info.fee.as_deref(), Some("$5.99"));
        assert_eq!(info.days, Some(5));
    }

    #[test]
    fn date_earlier_in_year_rolls_over() {
        let info = parse_delivery("Delivery Jan 3", day(2026, 12, 30)).unwrap();
        assert_eq!(info.days, Some(4));
        assert!(info.fee.is_none());
    }

    #[test]
    fn shipping_free_and_tomorrow() {
        let info = parse_delivery("Shipping: Free. Get it tomorrow", day(2026, 5, 1)).unwrap();
        assert_eq!(info.fee.as_deref(), Some("$0.00"));
        assert_eq!(info.days, Some(1));
    }

    #[test]
    fn message_without_fee_or_time_is_none() {
        assert!(parse_delivery("Ships from and sold by Amazon.com", day(2026, 1, 1)).is_none());
    }

    #[test]
    fn first_informative_message_wins() {
        let doc = Document::parse(
            "<div class='d'>Ships from Amazon</div><div class='d'>FREE delivery within 2 days</div>",
        );
        let info = extract_delivery(&doc, &["#missing", ".d"], day(2026, 1, 1));
        assert_eq!(
            info,
            DeliveryInfo {
                fee: Some("$0.00".to_owned()),
                days: Some(2)
            }
        );
    }
}
