//! The dashboard service: one cached dataset, many selections.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::analyzers::aggregate::{abo_distribution, category_summary, headline};
use crate::analyzers::series::{time_series, trend_forecast};
use crate::analyzers::types::{AboShare, Headline, SeriesPoint, SummaryRow, Trend};
use crate::cache::{CacheKey, DatasetCache};
use crate::config::DataSources;
use crate::fetch::Fetcher;
use crate::filter::{Period, filter_partners, filter_period, partners};
use crate::parser::{Dataset, load_dataset};
use crate::record::{TravelRecord, normalize_partner};

/// What the user picked: partners (empty = all), period and the reference
/// date the period is resolved against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub partners: Vec<String>,
    pub period: Period,
    pub today: NaiveDate,
}

impl Selection {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            partners: Vec::new(),
            period: Period::All,
            today,
        }
    }

    pub fn with_partners(mut self, partners: Vec<String>) -> Self {
        self.partners = partners;
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    /// Label used in titles and download file names, built from the
    /// normalized partner ids.
    pub fn partner_label(&self) -> String {
        if self.partners.is_empty() {
            return "all".to_string();
        }
        self.partners
            .iter()
            .map(|p| normalize_partner(p))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Applies the partner and period filters to `records`.
    pub fn apply<'a>(&self, records: &[&'a TravelRecord]) -> Vec<&'a TravelRecord> {
        let by_partner = filter_partners(records, self.partners.as_slice());
        filter_period(&by_partner, self.period, self.today)
    }
}

/// Every figure the dashboard shows for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub selection: Selection,
    pub headline: Headline,
    pub summary: Vec<SummaryRow>,
    pub series: Vec<SeriesPoint>,
    pub trend: Trend,
    pub abos: Vec<AboShare>,
}

/// Builds a [`DashboardView`] from the selection alone.
pub fn build_view(
    records: &[&TravelRecord],
    selection: &Selection,
    horizon_days: u32,
) -> DashboardView {
    let selected = selection.apply(records);
    let series = time_series(&selected);
    let trend = trend_forecast(&series, horizon_days);

    DashboardView {
        selection: selection.clone(),
        headline: headline(&selected),
        summary: category_summary(&selected),
        abos: abo_distribution(&selected),
        series,
        trend,
    }
}

/// Owns the source locations, a fetcher and the dataset cache.
pub struct Dashboard<F> {
    sources: DataSources,
    fetcher: F,
    cache: DatasetCache,
}

impl<F: Fetcher> Dashboard<F> {
    pub fn new(sources: DataSources, fetcher: F, cache: DatasetCache) -> Self {
        Self {
            sources,
            fetcher,
            cache,
        }
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// The loaded dataset, reading the sources only when they changed.
    pub fn dataset(&mut self) -> Result<&Dataset> {
        let key = CacheKey::for_sources(&self.sources)?;
        let (fetcher, sources) = (&self.fetcher, &self.sources);
        self.cache.get_or_load(key, || load_dataset(fetcher, sources))
    }

    /// Drops the cached dataset.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn partners(&mut self) -> Result<Vec<String>> {
        Ok(partners(&self.dataset()?.records))
    }

    pub fn view(&mut self, selection: &Selection, horizon_days: u32) -> Result<DashboardView> {
        let dataset = self.dataset()?;
        let view = build_view(&dataset.view(), selection, horizon_days);
        debug!(
            partners = %selection.partner_label(),
            period = %selection.period,
            records = view.headline.records,
            "View built"
        );
        Ok(view)
    }
}
