//! In-memory travel records after the lookup join.

use chrono::NaiveDate;

use crate::derive::DerivedMetrics;
use crate::rates::{Discount, TicketCategory};

/// One ticket transaction joined with its ticket category and enriched with
/// derived metrics. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelRecord {
    /// Geschäftspartner, normalized (see [`normalize_partner`]).
    pub partner: String,
    /// Betrag; `None` when the source value was not numeric.
    pub fare: Option<f64>,
    /// Reiseklasse; `None` when absent or not an integer.
    pub fare_class: Option<u8>,
    pub discount: Discount,
    /// Raw Reduktion text. Records without one are left out of the
    /// subscription distribution.
    pub discount_label: Option<String>,
    pub category: Option<TicketCategory>,
    pub departure: Option<NaiveDate>,
    pub user: Option<String>,
    pub product: String,
    pub metrics: DerivedMetrics,
}

impl TravelRecord {
    /// Builds a record and derives its metrics.
    pub fn new(
        partner: impl Into<String>,
        fare: Option<f64>,
        fare_class: Option<u8>,
        discount_label: Option<String>,
        category: Option<TicketCategory>,
        departure: Option<NaiveDate>,
    ) -> Self {
        let partner: String = partner.into();
        let discount_label = discount_label.filter(|label| !label.trim().is_empty());
        let discount = Discount::parse(discount_label.as_deref());
        let metrics = DerivedMetrics::compute(fare, fare_class, &discount, category.as_ref());

        Self {
            partner: normalize_partner(&partner),
            fare,
            fare_class,
            discount,
            discount_label,
            category,
            departure,
            user: None,
            product: String::new(),
            metrics,
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }
}

/// Partner ids arrive either as integers or as floats (`1000123.0`).
/// Numeric ids are rounded to integer text; anything else is trimmed.
pub fn normalize_partner(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{}", value.round() as i64),
        _ => trimmed.to_string(),
    }
}

/// Parses a fare amount, coercing anything non-numeric to `None`.
pub fn parse_fare(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a fare class, accepting `1` and `1.0` alike.
pub fn parse_fare_class(raw: &str) -> Option<u8> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.fract() != 0.0 || !(0.0..=u8::MAX as f64).contains(&value) {
        return None;
    }
    Some(value as u8)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M"];

/// Parses a departure date. Unparseable values yield `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                chrono::NaiveDateTime::parse_from_str(trimmed, fmt)
                    .ok()
                    .map(|dt| dt.date())
            })
        })
}
