//! Parsing of the record and lookup tables and the product-name join.
//!
//! Columns are bound by header name, so extra or reordered columns in either
//! file do not affect the join.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::DataSources;
use crate::fetch::{Fetcher, fetch_table};
use crate::rates::TicketCategory;
use crate::record::{TravelRecord, parse_date, parse_fare, parse_fare_class};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A row of the transaction export, as read.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Geschäftspartner")]
    partner: String,
    #[serde(rename = "Betrag")]
    fare: String,
    #[serde(rename = "Reiseklasse")]
    fare_class: String,
    #[serde(rename = "Reduktion")]
    discount: Option<String>,
    #[serde(rename = "NOVA Produktbezeichnung")]
    product: String,
    #[serde(rename = "Hinreisedatum", default)]
    departure: Option<String>,
    #[serde(rename = "WebShop Benutzer Name", default)]
    user: Option<String>,
}

/// A row of the "Artikel Prüfung" sheet.
#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(rename = "Artikelname")]
    name: String,
    #[serde(rename = "RUMBA-Artikel")]
    category: Option<String>,
}

/// Product name to ticket category(ies). A name listed more than once joins
/// once per listing.
#[derive(Debug, Default)]
pub struct Lookup {
    articles: HashMap<String, Vec<Option<TicketCategory>>>,
}

impl Lookup {
    pub fn get(&self, product: &str) -> Option<&[Option<TicketCategory>]> {
        self.articles.get(product).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Counters collected while loading.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_joined: usize,
    pub unmatched_products: usize,
    pub unparsed_fares: usize,
    pub fallback_rows: usize,
}

/// The joined, derived record table.
#[derive(Debug, Default)]
pub struct Dataset {
    pub records: Vec<TravelRecord>,
    pub report: LoadReport,
}

impl Dataset {
    /// A view over every record.
    pub fn view(&self) -> Vec<&TravelRecord> {
        self.records.iter().collect()
    }
}

/// Parses the lookup table.
pub fn parse_lookup(bytes: &[u8], delimiter: u8) -> Result<Lookup> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(strip_bom(bytes));

    let mut lookup = Lookup::default();
    for result in rdr.deserialize() {
        let article: RawArticle = result.context("invalid lookup row")?;
        let category = article
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(TicketCategory::parse);
        lookup.articles.entry(article.name).or_default().push(category);
    }

    debug!(articles = lookup.len(), "Lookup table parsed");
    Ok(lookup)
}

/// Parses the record table, inner-joins it with `lookup` on the product name
/// and derives metrics for every joined row.
pub fn parse_records(bytes: &[u8], delimiter: u8, lookup: &Lookup) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(strip_bom(bytes));

    let mut dataset = Dataset::default();
    for (index, result) in rdr.deserialize().enumerate() {
        let raw: RawRecord = result.with_context(|| format!("invalid record row {}", index + 1))?;
        dataset.report.rows_read += 1;

        let Some(categories) = lookup.get(&raw.product) else {
            dataset.report.unmatched_products += 1;
            continue;
        };

        let fare = parse_fare(&raw.fare);
        if fare.is_none() {
            dataset.report.unparsed_fares += 1;
        }

        for category in categories {
            let record = TravelRecord::new(
                raw.partner.as_str(),
                fare,
                parse_fare_class(&raw.fare_class),
                non_empty(raw.discount.clone()),
                category.clone(),
                raw.departure.as_deref().and_then(parse_date),
            )
            .with_user(non_empty(raw.user.clone()))
            .with_product(raw.product.as_str());

            if record.metrics.is_fallback() {
                dataset.report.fallback_rows += 1;
                debug!(
                    row = index + 1,
                    fare_class = ?record.fare_class,
                    discount = %record.discount,
                    "No rate rule matched, using fare as distance"
                );
            }

            dataset.records.push(record);
            dataset.report.rows_joined += 1;
        }
    }

    Ok(dataset)
}

/// Fetches both tables and builds the dataset.
#[tracing::instrument(skip(fetcher), fields(records = %sources.records, lookup = %sources.lookup))]
pub fn load_dataset<F: Fetcher + ?Sized>(fetcher: &F, sources: &DataSources) -> Result<Dataset> {
    let lookup_bytes = fetch_table(fetcher, &sources.lookup)?;
    let lookup = parse_lookup(&lookup_bytes, sources.lookup_delimiter())
        .with_context(|| format!("failed to parse lookup '{}'", sources.lookup))?;

    let record_bytes = fetch_table(fetcher, &sources.records)?;
    let dataset = parse_records(&record_bytes, sources.delimiter, &lookup)
        .with_context(|| format!("failed to parse records '{}'", sources.records))?;

    let report = &dataset.report;
    if report.unmatched_products > 0 {
        warn!(
            unmatched = report.unmatched_products,
            "Records without a matching article were dropped"
        );
    }
    info!(
        rows_read = report.rows_read,
        rows_joined = report.rows_joined,
        unparsed_fares = report.unparsed_fares,
        fallback_rows = report.fallback_rows,
        "Dataset loaded"
    );

    Ok(dataset)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::{Discount, RateRule};
    use chrono::NaiveDate;

    const LOOKUP: &str = "\
Artikelname,RUMBA-Artikel,Bemerkung
Sparbillett,Tickets Inland,
EC Mailand,Tickets Ausland,
ZVV Tageskarte,Tickets Verkehrsverbund,
Leer,,
";

    #[test]
    fn test_parse_lookup() {
        let lookup = parse_lookup(LOOKUP.as_bytes(), b',').unwrap();
        assert_eq!(lookup.len(), 4);
        assert_eq!(
            lookup.get("EC Mailand"),
            Some(&[Some(TicketCategory::Ausland)][..])
        );
        assert_eq!(lookup.get("Leer"), Some(&[None][..]));
        assert!(lookup.get("Unbekannt").is_none());
    }

    #[test]
    fn test_join_drops_unmatched_and_derives() {
        let lookup = parse_lookup(LOOKUP.as_bytes(), b',').unwrap();
        let records = "\
Geschäftspartner,Betrag,Reiseklasse,Reduktion,Hinreisedatum,NOVA Produktbezeichnung,WebShop Benutzer Name
1000123.0,100,1,,2025-01-15,Sparbillett,anna
1000123.0,-30,2,KEINE,2025-01-16,Sparbillett,anna
2000,abc,2,HTA123,,EC Mailand,ben
2000,12,2,,2025-02-01,Velotaxi,ben
";
        let dataset = parse_records(records.as_bytes(), b',', &lookup).unwrap();

        assert_eq!(dataset.report.rows_read, 4);
        assert_eq!(dataset.report.rows_joined, 3);
        assert_eq!(dataset.report.unmatched_products, 1);
        assert_eq!(dataset.report.unparsed_fares, 1);

        let first = &dataset.records[0];
        assert_eq!(first.partner, "1000123");
        assert_eq!(first.discount, Discount::None);
        assert_eq!(first.departure, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(first.user.as_deref(), Some("anna"));
        assert!((first.metrics.distance_km.unwrap() - 100.0 / 0.287).abs() < 1e-9);

        assert_eq!(dataset.records[1].metrics.rule, Some(RateRule::Refund));

        let third = &dataset.records[2];
        assert_eq!(third.fare, None);
        assert_eq!(third.departure, None);
        assert_eq!(third.metrics.distance_km, None);
    }

    #[test]
    fn test_reordered_and_extra_columns() {
        let lookup = parse_lookup(LOOKUP.as_bytes(), b',').unwrap();
        let records = "\
Extra;NOVA Produktbezeichnung;Reduktion;Betrag;Geschäftspartner;Reiseklasse;Kostenstelle
x;ZVV Tageskarte;GA2KL;36;7;1;4711
";
        let dataset = parse_records(records.as_bytes(), b';', &lookup).unwrap();

        assert_eq!(dataset.records.len(), 1);
        let record = &dataset.records[0];
        assert_eq!(record.partner, "7");
        assert_eq!(record.category, Some(TicketCategory::Verkehrsverbund));
        assert!((record.metrics.distance_km.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(record.departure, None);
        assert_eq!(record.user, None);
    }

    #[test]
    fn test_duplicate_articles_join_once_per_listing() {
        let lookup = parse_lookup(
            "Artikelname,RUMBA-Artikel\nGA 2. Klasse,GA\nGA 2. Klasse,Ausschluss\n".as_bytes(),
            b',',
        )
        .unwrap();
        let records = "\
Geschäftspartner,Betrag,Reiseklasse,Reduktion,NOVA Produktbezeichnung
1,10,2,GA1KL,GA 2. Klasse
";
        let dataset = parse_records(records.as_bytes(), b',', &lookup).unwrap();
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.records[0].category, Some(TicketCategory::Ga));
        assert_eq!(dataset.records[1].category, Some(TicketCategory::Ausschluss));
    }

    #[test]
    fn test_bom_is_ignored() {
        let lookup = b"\xEF\xBB\xBFArtikelname,RUMBA-Artikel\nA,GA\n";
        assert_eq!(parse_lookup(lookup, b',').unwrap().len(), 1);
    }

    #[test]
    fn test_missing_key_column_is_an_error() {
        let lookup = parse_lookup(LOOKUP.as_bytes(), b',').unwrap();
        let records = "Geschäftspartner,Betrag,Reiseklasse,Reduktion\n1,10,2,\n";
        assert!(parse_records(records.as_bytes(), b',', &lookup).is_err());
    }

    #[test]
    fn test_fallback_rows_are_counted() {
        let lookup = parse_lookup(LOOKUP.as_bytes(), b',').unwrap();
        let records = "\
Geschäftspartner,Betrag,Reiseklasse,Reduktion,NOVA Produktbezeichnung
1,42,2,GA2KL,Sparbillett
";
        let dataset = parse_records(records.as_bytes(), b',', &lookup).unwrap();
        assert_eq!(dataset.report.fallback_rows, 1);
        assert_eq!(dataset.records[0].metrics.distance_km, Some(42.0));
    }

    #[test]
    fn test_load_with_separate_lookup_delimiter() {
        let dir = std::env::temp_dir();
        let records_path = dir.join("mission_to_zero_mixed_records.csv");
        let lookup_path = dir.join("mission_to_zero_mixed_lookup.csv");
        std::fs::write(
            &records_path,
            "Geschäftspartner;Betrag;Reiseklasse;Reduktion;NOVA Produktbezeichnung\n1;10;2;;Sparbillett\n2;23.9;2;;Sparbillett\n",
        )
        .unwrap();
        std::fs::write(&lookup_path, LOOKUP).unwrap();

        let sources = DataSources::new(
            records_path.to_string_lossy(),
            lookup_path.to_string_lossy(),
        )
        .with_delimiter(b';')
        .with_lookup_delimiter(b',');
        let dataset = load_dataset(&crate::fetch::FileFetcher, &sources).unwrap();

        assert_eq!(dataset.report.rows_joined, 2);
        assert_eq!(dataset.records[1].category, Some(TicketCategory::Inland));
        assert!((dataset.records[1].metrics.distance_km.unwrap() - 100.0).abs() < 1e-9);

        std::fs::remove_file(&records_path).unwrap();
        std::fs::remove_file(&lookup_path).unwrap();
    }
}
