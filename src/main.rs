//! CLI entry point for the CO₂ emissions dashboard.
//!
//! Loads the travel-expense export and the ticket lookup once, applies a
//! partner/period selection and prints or writes the dashboard figures.

mod infra;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use mission_to_zero::analyzers::series::{DEFAULT_HORIZON_DAYS, MAX_HORIZON_DAYS};
use mission_to_zero::cache::DatasetCache;
use mission_to_zero::config::{DataSources, parse_delimiter};
use mission_to_zero::dashboard::{Dashboard, Selection};
use mission_to_zero::fetch::SourceFetcher;
use mission_to_zero::filter::Period;
use mission_to_zero::output::{
    write_abos, write_headline, write_json, write_report, write_summary_csv, write_table,
};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "mission_to_zero")]
#[command(about = "CO₂ reporting for business travel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// JSON file with `records`, `lookup`, `delimiter` and `lookup_delimiter`
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Travel record export (path or URL, `.gz` allowed)
    #[arg(long)]
    records: Option<String>,

    /// Ticket lookup table exported from the "Artikel Prüfung" sheet
    #[arg(long)]
    lookup: Option<String>,

    /// Field delimiter of the record table (and of the lookup unless overridden)
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    /// Field delimiter of the lookup table
    #[arg(long, value_parser = parse_delimiter)]
    lookup_delimiter: Option<u8>,
}

#[derive(Args)]
struct SelectionArgs {
    /// Geschäftspartner to include (repeatable; default all)
    #[arg(short, long = "partner")]
    partners: Vec<String>,

    /// Reporting period: all, ytd or 3m
    #[arg(long, default_value_t = Period::All)]
    period: Period,

    /// Reference date for the period (YYYY-MM-DD; default today)
    #[arg(long)]
    today: Option<NaiveDate>,
}

impl SelectionArgs {
    fn selection(self) -> Selection {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        Selection::new(today)
            .with_partners(self.partners)
            .with_period(self.period)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print headline figures and the per-category summary table
    Summary {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        selection: SelectionArgs,

        /// Also write the summary table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the daily CO₂ series and its linear trend forecast as JSON
    Series {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        selection: SelectionArgs,

        /// Forecast horizon in days
        #[arg(
            long,
            default_value_t = DEFAULT_HORIZON_DAYS,
            value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_HORIZON_DAYS))
        )]
        horizon: u32,
    },
    /// Print the distribution of subscriptions (distinct users per discount)
    Abos {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// List the Geschäftspartner ids present in the data
    Partners {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Write the summary CSV and a JSON view of every figure into a directory
    Report {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output directory
        #[arg(short = 'd', long, default_value = "reports")]
        output_dir: PathBuf,

        /// Forecast horizon in days
        #[arg(
            long,
            default_value_t = DEFAULT_HORIZON_DAYS,
            value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_HORIZON_DAYS))
        )]
        horizon: u32,

        /// Also write one report per partner
        #[arg(long, default_value_t = false)]
        per_partner: bool,
    },
    /// Resolve the warehouse session settings and log them (token redacted)
    WarehouseCheck {
        /// Access token as forwarded by the hosting proxy
        #[arg(long, value_name = "TOKEN")]
        forwarded_token: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/mission_to_zero.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("mission_to_zero.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Summary {
            data,
            selection,
            output,
            json,
        } => {
            let mut dashboard = open_dashboard(data)?;
            let view = dashboard.view(&selection.selection(), DEFAULT_HORIZON_DAYS)?;

            if json {
                write_json(&mut out, &(&view.headline, &view.summary))?;
            } else {
                writeln!(
                    out,
                    "CO₂ emissions for Geschäftspartner {} ({})",
                    view.selection.partner_label(),
                    view.selection.period
                )?;
                write_headline(&mut out, &view.headline)?;
                writeln!(out)?;
                write_table(&mut out, &view.summary)?;
            }

            if let Some(path) = output {
                write_summary_csv(&path, &view.summary)?;
            }
        }
        Commands::Series {
            data,
            selection,
            horizon,
        } => {
            let mut dashboard = open_dashboard(data)?;
            let view = dashboard.view(&selection.selection(), horizon)?;
            if view.trend.line().is_none() {
                warn!(
                    points = view.series.len(),
                    "Not enough distinct dates for a trend forecast"
                );
            }
            write_json(&mut out, &(&view.series, &view.trend))?;
        }
        Commands::Abos { data, selection } => {
            let mut dashboard = open_dashboard(data)?;
            let view = dashboard.view(&selection.selection(), 0)?;
            write_abos(&mut out, &view.abos)?;
        }
        Commands::Partners { data } => {
            let mut dashboard = open_dashboard(data)?;
            let partners = dashboard.partners()?;
            info!(total = partners.len(), "Partner list built");
            for partner in partners {
                writeln!(out, "{partner}")?;
            }
        }
        Commands::Report {
            data,
            selection,
            output_dir,
            horizon,
            per_partner,
        } => {
            let mut dashboard = open_dashboard(data)?;
            let selection = selection.selection();

            let view = dashboard.view(&selection, horizon)?;
            write_headline(&mut out, &view.headline)?;
            for path in write_report(&output_dir, &view)? {
                writeln!(out, "{}", path.display())?;
            }

            if per_partner {
                // Reuses the cached dataset; the sources are read once.
                for partner in dashboard.partners()? {
                    let one = selection.clone().with_partners(vec![partner]);
                    let view = dashboard.view(&one, horizon)?;
                    for path in write_report(&output_dir, &view)? {
                        writeln!(out, "{}", path.display())?;
                    }
                }
            }
            info!(loads = dashboard.cache().loads(), "Report finished");
        }
        Commands::WarehouseCheck { forwarded_token } => {
            let headers = forwarded_token.map(|token| {
                std::collections::HashMap::from([(
                    infra::warehouse::ACCESS_TOKEN_HEADER.to_string(),
                    token,
                )])
            });
            let params =
                infra::warehouse::bootstrap(headers.as_ref(), |key| std::env::var(key).ok())
                    .context("warehouse configuration is incomplete")?;
            info!(settings = %params, "Warehouse session settings resolved");
        }
    }

    Ok(())
}

/// Resolves the data sources (flags, then config file, then environment)
/// and builds a dashboard with an empty cache.
fn open_dashboard(args: DataArgs) -> Result<Dashboard<SourceFetcher>> {
    let mut sources = match &args.config {
        Some(path) => DataSources::load(path)?,
        None => DataSources::from_env(),
    };
    if let Some(records) = args.records {
        sources.records = records;
    }
    if let Some(lookup) = args.lookup {
        sources.lookup = lookup;
    }
    if let Some(delimiter) = args.delimiter {
        sources.delimiter = delimiter;
    }
    if let Some(delimiter) = args.lookup_delimiter {
        sources.lookup_delimiter = Some(delimiter);
    }

    info!(records = %sources.records, lookup = %sources.lookup, "Using data sources");
    Ok(Dashboard::new(sources, SourceFetcher::new()?, DatasetCache::new()))
}
