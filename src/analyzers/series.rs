use crate::analyzers::types::{SeriesPoint, Trend, TrendLine, TrendPoint};
use crate::analyzers::utility::{mean, sum_present};
use crate::record::TravelRecord;
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

/// Default forecast horizon in days.
pub const DEFAULT_HORIZON_DAYS: u32 = 90;

/// Largest horizon the CLI accepts.
pub const MAX_HORIZON_DAYS: u32 = 3650;

/// Daily CO₂ and distance totals, ascending by date, with a running CO₂ sum.
///
/// Undated records are skipped.
pub fn time_series(records: &[&TravelRecord]) -> Vec<SeriesPoint> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&TravelRecord>> = BTreeMap::new();

    for record in records {
        if let Some(date) = record.departure {
            by_date.entry(date).or_default().push(*record);
        }
    }

    let mut cumulative = 0.0;
    by_date
        .into_iter()
        .map(|(date, day)| {
            let co2_kg = sum_present(day.iter().map(|r| r.metrics.co2_kg));
            cumulative += co2_kg;
            SeriesPoint {
                date,
                distance_km: sum_present(day.iter().map(|r| r.metrics.distance_km)),
                co2_kg,
                cumulative_co2_kg: cumulative,
            }
        })
        .collect()
}

/// Fits cumulative CO₂ against day ordinal by ordinary least squares and
/// extends the line `horizon_days` past the last observed date.
///
/// The series is expected to hold one point per date, as produced by
/// [`time_series`]. With fewer than two distinct dates the slope is
/// undefined and [`Trend::Insufficient`] is returned. The forecast stops
/// early at the end of the representable calendar.
pub fn trend_forecast(series: &[SeriesPoint], horizon_days: u32) -> Trend {
    let mut dates: Vec<NaiveDate> = series.iter().map(|p| p.date).collect();
    dates.sort();
    dates.dedup();
    if dates.len() < 2 {
        return Trend::Insufficient {
            distinct_dates: dates.len(),
        };
    }

    let xs: Vec<f64> = series.iter().map(|p| ordinal(p.date)).collect();
    let ys: Vec<f64> = series.iter().map(|p| p.cumulative_co2_kg).collect();
    let x_mean = mean(&xs);
    let y_mean = mean(&ys);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        sxy += (x - x_mean) * (y - y_mean);
        sxx += (x - x_mean).powi(2);
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let at = |date: NaiveDate| TrendPoint {
        date,
        cumulative_co2_kg: intercept + slope * ordinal(date),
    };

    let fitted = dates.iter().copied().map(at).collect();

    // `dates` has at least two entries here.
    let last = dates[dates.len() - 1];
    let forecast = (1..=u64::from(horizon_days))
        .map_while(|offset| last.checked_add_days(Days::new(offset)))
        .map(at)
        .collect();

    Trend::Fitted(TrendLine {
        slope,
        intercept,
        fitted,
        forecast,
    })
}

fn ordinal(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}
