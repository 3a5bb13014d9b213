//! Selection of records by reporting period (Zeitraum) and business partner.
//!
//! Filters never copy or mutate records; they return a new view of
//! references into the loaded dataset.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::record::{TravelRecord, normalize_partner};

/// Reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    All,
    YearToDate,
    Last3Months,
}

impl Period {
    /// Inclusive date bounds for `today`, or `None` for [`Period::All`].
    ///
    /// Year-to-date has no upper bound: trips booked ahead for later this
    /// year still count.
    pub fn bounds(self, today: NaiveDate) -> Option<(NaiveDate, Option<NaiveDate>)> {
        match self {
            Period::All => None,
            Period::YearToDate => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                Some((start, None))
            }
            Period::Last3Months => {
                // checked_sub_months clamps to the last day of shorter months.
                let start = today.checked_sub_months(Months::new(3)).unwrap_or(NaiveDate::MIN);
                Some((start, Some(today)))
            }
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "alle" => Ok(Period::All),
            "ytd" | "year-to-date" | "year_to_date" => Ok(Period::YearToDate),
            "3m" | "last-3-months" | "last_3_months" => Ok(Period::Last3Months),
            other => Err(format!("unknown period '{other}' (expected all, ytd or 3m)")),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Period::All => "all",
            Period::YearToDate => "ytd",
            Period::Last3Months => "3m",
        };
        f.write_str(label)
    }
}

/// Restricts `records` to `period` as seen from `today`.
///
/// Undated records only survive [`Period::All`].
pub fn filter_period<'a>(
    records: &[&'a TravelRecord],
    period: Period,
    today: NaiveDate,
) -> Vec<&'a TravelRecord> {
    let Some((start, end)) = period.bounds(today) else {
        return records.to_vec();
    };

    records
        .iter()
        .copied()
        .filter(|r| match r.departure {
            Some(d) => d >= start && end.is_none_or(|end| d <= end),
            None => false,
        })
        .collect()
}

/// Restricts `records` to the selected partners. An empty selection keeps
/// everything.
pub fn filter_partners<'a, S: AsRef<str>>(
    records: &[&'a TravelRecord],
    selection: &[S],
) -> Vec<&'a TravelRecord> {
    if selection.is_empty() {
        return records.to_vec();
    }

    let wanted: BTreeSet<String> = selection
        .iter()
        .map(|p| normalize_partner(p.as_ref()))
        .collect();

    records
        .iter()
        .copied()
        .filter(|r| wanted.contains(&r.partner))
        .collect()
}

/// Distinct partner ids, numeric ids in numeric order ahead of any others.
pub fn partners(records: &[TravelRecord]) -> Vec<String> {
    let mut ids: Vec<String> = records
        .iter()
        .map(|r| r.partner.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    ids.sort_by_cached_key(|id| match id.parse::<i64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, id.clone()),
    });
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::TicketCategory;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(partner: &str, departure: Option<NaiveDate>) -> TravelRecord {
        TravelRecord::new(
            partner,
            Some(10.0),
            Some(2),
            None,
            Some(TicketCategory::Inland),
            departure,
        )
    }

    #[test]
    fn test_all_is_identity() {
        let records = vec![record("1", Some(date(2020, 5, 1))), record("1", None)];
        let view: Vec<_> = records.iter().collect();
        assert_eq!(filter_period(&view, Period::All, date(2025, 6, 1)).len(), 2);
    }

    #[test]
    fn test_year_to_date_boundaries() {
        let today = date(2025, 6, 15);
        let records = vec![
            record("1", Some(date(2024, 12, 31))),
            record("1", Some(date(2025, 1, 1))),
            record("1", Some(date(2025, 6, 15))),
            record("1", None),
        ];
        let view: Vec<_> = records.iter().collect();

        let kept = filter_period(&view, Period::YearToDate, today);
        let dates: Vec<_> = kept.iter().map(|r| r.departure.unwrap()).collect();
        assert_eq!(dates, vec![date(2025, 1, 1), date(2025, 6, 15)]);
    }

    #[test]
    fn test_year_to_date_keeps_trips_booked_ahead() {
        let today = date(2025, 3, 31);
        let records = vec![
            record("1", Some(date(2025, 4, 10))),
            record("1", Some(date(2026, 1, 2))),
        ];
        let view: Vec<_> = records.iter().collect();

        let kept = filter_period(&view, Period::YearToDate, today);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].departure, Some(date(2025, 4, 10)));

        // The trailing window still stops at the reference date.
        assert!(filter_period(&view, Period::Last3Months, today).is_empty());
    }

    #[test]
    fn test_last_three_months() {
        let today = date(2025, 5, 31);
        let records = vec![
            record("1", Some(date(2025, 2, 27))),
            record("1", Some(date(2025, 2, 28))),
            record("1", Some(date(2025, 5, 1))),
            record("1", Some(date(2025, 6, 1))),
        ];
        let view: Vec<_> = records.iter().collect();

        let kept = filter_period(&view, Period::Last3Months, today);
        let dates: Vec<_> = kept.iter().map(|r| r.departure.unwrap()).collect();
        assert_eq!(dates, vec![date(2025, 2, 28), date(2025, 5, 1)]);
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("ytd".parse::<Period>(), Ok(Period::YearToDate));
        assert_eq!("3M".parse::<Period>(), Ok(Period::Last3Months));
        assert_eq!("all".parse::<Period>(), Ok(Period::All));
        assert!("week".parse::<Period>().is_err());
    }

    #[test]
    fn test_filter_partners_normalizes_selection() {
        let records = vec![record("1000123.0", None), record("2000", None), record("3000", None)];
        let view: Vec<_> = records.iter().collect();

        let kept = filter_partners(&view, &["1000123", "3000"]);
        assert_eq!(kept.len(), 2);

        let none: [&str; 0] = [];
        assert_eq!(filter_partners(&view, &none).len(), 3);
    }

    #[test]
    fn test_partners_sorted_distinct() {
        let records = vec![record("20", None), record("10", None), record("20.0", None)];
        assert_eq!(partners(&records), vec!["10".to_string(), "20".to_string()]);
    }

    #[test]
    fn test_partners_sort_numerically() {
        let records = vec![
            record("10", None),
            record("ACME AG", None),
            record("9", None),
            record("1000123", None),
        ];
        assert_eq!(partners(&records), vec!["9", "10", "1000123", "ACME AG"]);
    }
}
