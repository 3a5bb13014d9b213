//! Data types produced by the aggregation pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Label of the synthetic row that sums every category.
pub const TOTAL_LABEL: &str = "TOTAL";

/// One line of the category summary table.
///
/// Field names double as the CSV/display column labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Total Distance")]
    pub total_distance_km: f64,
    #[serde(rename = "Total Energy (MJ/km)")]
    pub total_energy_mj: f64,
    #[serde(rename = "Total CO₂ (kg)")]
    pub total_co2_kg: f64,
    #[serde(rename = "Total Fare")]
    pub total_fare: f64,
}

impl SummaryRow {
    pub fn is_total(&self) -> bool {
        self.category == TOTAL_LABEL
    }
}

/// Headline figures shown above the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Headline {
    pub records: usize,
    pub total_distance_km: f64,
    pub total_co2_kg: f64,
    pub total_savings_vs_car_kg: f64,
    pub total_tree_equivalent: f64,
}

/// Daily CO₂ totals with a running sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub distance_km: f64,
    pub co2_kg: f64,
    pub cumulative_co2_kg: f64,
}

/// A point on the fitted or forecast trend line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub cumulative_co2_kg: f64,
}

/// Least-squares line of cumulative CO₂ against day ordinal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendLine {
    /// kg CO₂ per day.
    pub slope: f64,
    /// Value at day ordinal 0 (days from CE).
    pub intercept: f64,
    pub fitted: Vec<TrendPoint>,
    pub forecast: Vec<TrendPoint>,
}

/// Result of a trend fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Trend {
    /// Fewer than two distinct dates; no line can be fitted.
    Insufficient { distinct_dates: usize },
    Fitted(TrendLine),
}

impl Trend {
    pub fn line(&self) -> Option<&TrendLine> {
        match self {
            Trend::Fitted(line) => Some(line),
            Trend::Insufficient { .. } => None,
        }
    }
}

/// Number of distinct users holding a given subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AboShare {
    pub discount: String,
    pub users: usize,
}
