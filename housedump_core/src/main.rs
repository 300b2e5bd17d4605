use std::{io, sync::Arc};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{LevelFilter, error};
use serde::Serialize;
use tokio::runtime::Builder;

use housedump_core::{
    ALL, IngestError, Ingestor, NEW_TAIPEI, QueryError, QueryFilter, Table, ValuationRequest,
    batch::{BatchRequest, run_batch},
    configuration::Configuration,
    load_dump,
};

#[derive(Parser, Debug)]
#[command(name = "housedump", version, about = "House transaction dump analyzer")]
struct Args {
    /// Path of the SQL dump to load
    #[arg(long, value_name = "PATH")]
    sql: String,

    /// Only read INSERT statements into this table (default: every table)
    #[arg(long, value_name = "NAME")]
    table: Option<String>,

    /// Number of statements parsed concurrently (default: 16)
    #[arg(long, alias = "concurrent-threads", value_name = "N")]
    workers: Option<usize>,

    /// Logging level off, error, warn, info, debug, trace (default: info)
    #[arg(long = "log-level", alias = "log_level", value_name = "LEVEL")]
    log_level: Option<LevelFilter>,

    /// Usage category to query (default: 住家用, ALL disables the filter)
    #[arg(long, value_name = "USAGE")]
    usage: Option<String>,

    /// Valuation window in months (default: 24)
    #[arg(long = "window-months", value_name = "MONTHS")]
    window_months: Option<u32>,

    /// Wider window tried when the valuation window is empty, 0 disables it (default: 60)
    #[arg(long = "fallback-months", value_name = "MONTHS")]
    fallback_months: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Row counts, date range and district coverage
    Health {
        #[arg(long, default_value = NEW_TAIPEI)]
        city: String,
    },
    /// Regions with transactions, busiest first
    Regions {
        #[arg(long)]
        city: Option<String>,
    },
    /// Average prices per month
    Monthly {
        #[arg(long)]
        city: String,
        #[arg(long, default_value = ALL)]
        district: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        start: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        end: Option<NaiveDate>,
    },
    /// Average prices per year
    Yearly {
        #[arg(long)]
        city: String,
        #[arg(long, default_value = ALL)]
        district: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        start: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        end: Option<NaiveDate>,
    },
    /// Estimate the price of a property
    Valuation {
        #[arg(long)]
        city: String,
        #[arg(long)]
        district: String,
        #[arg(long = "area-m2", value_name = "M2")]
        area_m2: f64,
        #[arg(long = "age-years", value_name = "YEARS")]
        age_years: Option<f64>,
        /// Use the raw median discounted by building age instead of the adjusted median
        #[arg(long)]
        raw: bool,
        /// Overrides the top-level --window-months
        #[arg(long = "window-months", value_name = "MONTHS")]
        window_months: Option<u32>,
        /// Overrides the top-level --fallback-months
        #[arg(long = "fallback-months", value_name = "MONTHS")]
        fallback_months: Option<u32>,
        #[arg(long = "as-of", value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,
    },
    /// Raw district spellings and what they normalized to
    Audit {
        #[arg(long, default_value_t = 200)]
        limit: usize,
    },
    /// Run a JSON batch file of monthly, yearly and valuation queries
    Batch {
        #[arg(long, value_name = "PATH")]
        file: String,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let config = Configuration {
        sql_path: Some(args.sql.clone()),
        table: args.table.clone(),
        usage: args.usage.clone(),
        window_months: args.window_months,
        fallback_months: args.fallback_months,
        concurrent_threads: args.workers,
        log_level: args.log_level,
    };

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .init();

    let rt = Builder::new_multi_thread()
        .worker_threads(config.ingest_options().workers)
        .enable_all()
        .build()?;

    rt.block_on(run(args.command, config))
}

async fn run(command: Command, config: Configuration) -> io::Result<()> {
    let path = config.sql_path.clone().unwrap_or_default();
    let document = load_dump(&path).await.map_err(ingest_error)?;

    let ingestor = Ingestor::new(config.ingest_options());

    #[cfg(feature = "enable_parallelism")]
    let outcome = ingestor.ingest_parallel(Arc::from(document)).await;

    #[cfg(not(feature = "enable_parallelism"))]
    let outcome = ingestor.ingest(&document);

    if outcome.report.statements == 0 {
        error!("No INSERT statement found in {}", path);
        return Err(ingest_error(IngestError::MalformedDocument));
    }

    let table = Arc::new(outcome.table);

    match command {
        Command::Health { city } => print_json(&table.health(&city)),
        Command::Regions { city } => {
            let mut filter = QueryFilter::new().usage(config.usage());
            filter.city = city;
            print_json(&table.list_regions(&filter))
        }
        Command::Monthly {
            city,
            district,
            start,
            end,
        } => {
            let filter = query_filter(&config, city, district, start, end);
            print_json(&table.monthly_stats(&filter).map_err(query_error)?)
        }
        Command::Yearly {
            city,
            district,
            start,
            end,
        } => {
            let filter = query_filter(&config, city, district, start, end);
            print_json(&table.yearly_stats(&filter).map_err(query_error)?)
        }
        Command::Valuation {
            city,
            district,
            area_m2,
            age_years,
            raw,
            window_months,
            fallback_months,
            as_of,
        } => {
            let request = ValuationRequest {
                usage: config.usage().to_string(),
                age_years,
                use_adjusted_baseline: !raw,
                window_months: window_months.unwrap_or(config.window_months()),
                fallback_months: fallback_months.unwrap_or(config.fallback_months()),
                as_of,
                ..ValuationRequest::new(city, district, area_m2)
            };
            print_json(&table.valuation(&request).map_err(query_error)?.rounded())
        }
        Command::Audit { limit } => print_json(&table.district_audit(limit)),
        Command::Batch { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let request: BatchRequest = serde_json::from_str(&text)?;
            run_batch_file(table, request.with_defaults(&config)).await
        }
    }
}

async fn run_batch_file(table: Arc<Table>, request: BatchRequest) -> io::Result<()> {
    let mut report = run_batch(table, request).await;
    for entry in report.valuation.iter_mut() {
        entry.result = entry.result.as_ref().map(|r| r.rounded());
    }
    print_json(&report)
}

fn query_filter(
    config: &Configuration,
    city: String,
    district: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> QueryFilter {
    QueryFilter {
        city: Some(city),
        district: Some(district),
        usage: Some(config.usage().to_string()),
        start_date: start,
        end_date: end,
    }
}

fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ingest_error(e: IngestError) -> io::Error {
    match e {
        IngestError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

fn query_error(e: QueryError) -> io::Error {
    io::Error::other(e)
}
