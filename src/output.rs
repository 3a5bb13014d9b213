//! Output formatting and persistence for dashboard figures.
//!
//! Supports a plain-text table, JSON, and the downloadable summary CSV.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::types::{AboShare, Headline, SummaryRow};
use crate::dashboard::{DashboardView, Selection};

/// Writes a value as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(out: &mut W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Serializes the summary table as UTF-8 CSV with a header row.
pub fn summary_csv(rows: &[SummaryRow]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to finish summary CSV: {}", e.error()))
}

/// Parses a summary table written by [`summary_csv`].
pub fn parse_summary_csv(bytes: &[u8]) -> Result<Vec<SummaryRow>> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: SummaryRow = result?;
        rows.push(row);
    }
    Ok(rows)
}

/// Download name for the summary of `selection`.
pub fn summary_file_name(selection: &Selection) -> String {
    format!("summary_geschaeftspartner_{}.csv", selection.partner_label())
}

/// Writes the summary CSV to `path`, replacing any existing file.
pub fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let bytes = summary_csv(rows)?;
    fs::write(path, bytes).with_context(|| format!("failed to write '{}'", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "Summary CSV written");
    Ok(())
}

/// Writes `summary_*.csv` and `view.json` for `view` into `dir`.
pub fn write_report(dir: &Path, view: &DashboardView) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create '{}'", dir.display()))?;

    let csv_path = dir.join(summary_file_name(&view.selection));
    write_summary_csv(&csv_path, &view.summary)?;

    let json_path = dir.join("view.json");
    let file = fs::File::create(&json_path)
        .with_context(|| format!("failed to create '{}'", json_path.display()))?;
    let mut out = std::io::BufWriter::new(file);
    write_json(&mut out, view)?;
    out.flush()?;
    info!(path = %json_path.display(), "View JSON written");

    Ok(vec![csv_path, json_path])
}

/// Writes the headline figures as aligned text.
pub fn write_headline<W: Write>(out: &mut W, headline: &Headline) -> Result<()> {
    writeln!(out, "Records:            {}", headline.records)?;
    writeln!(out, "Distance (km):      {:.2}", headline.total_distance_km)?;
    writeln!(out, "CO₂ (kg):           {:.2}", headline.total_co2_kg)?;
    writeln!(out, "Saved vs. car (kg): {:.2}", headline.total_savings_vs_car_kg)?;
    writeln!(out, "Tree equivalent:    {:.1}", headline.total_tree_equivalent)?;
    Ok(())
}

/// Writes the summary table as aligned text.
pub fn write_table<W: Write>(out: &mut W, rows: &[SummaryRow]) -> Result<()> {
    let width = rows
        .iter()
        .map(|r| r.category.chars().count())
        .chain(std::iter::once("Category".len()))
        .max()
        .unwrap_or(8);

    writeln!(
        out,
        "{:<width$}  {:>7}  {:>14}  {:>20}  {:>14}  {:>12}",
        "Category", "Count", "Total Distance", "Total Energy (MJ/km)", "Total CO₂ (kg)", "Total Fare"
    )?;
    for row in rows {
        writeln!(
            out,
            "{:<width$}  {:>7}  {:>14.2}  {:>20.2}  {:>14.3}  {:>12.2}",
            row.category,
            row.count,
            row.total_distance_km,
            row.total_energy_mj,
            row.total_co2_kg,
            row.total_fare
        )?;
    }
    Ok(())
}

/// Writes the subscription distribution as text.
pub fn write_abos<W: Write>(out: &mut W, shares: &[AboShare]) -> Result<()> {
    for share in shares {
        writeln!(out, "{:<12} {}", share.discount, share.users)?;
    }
    Ok(())
}
