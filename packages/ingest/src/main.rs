#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the address tools.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use address_map_address_models::AddressField;
use address_map_analysis_models::{
    AnalysisParams, DEFAULT_BIN_WIDTH_KM, DEFAULT_DISTANCE_THRESHOLD_KM,
    DEFAULT_REFERENCE_ADDRESS,
};
use address_map_database::{lock, queries};
use address_map_geocoder::libpostal::LibpostalParser;
use address_map_geocoder::nominatim::NominatimGeocoder;
use address_map_ingest::display::{format_detail, format_queries, format_report};
use address_map_ingest::progress::LogProgress;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "address_map_ingest", about = "Address geocoding and analysis tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode, parse and store a single address
    Submit {
        /// Free-text address (e.g., "Ferhadija 12, Sarajevo")
        address: String,
    },
    /// Import addresses from a text file, one per line
    Import {
        /// Path to the address file
        file: PathBuf,
        /// Delay between geocoder requests in milliseconds (defaults to the
        /// service's configured rate limit)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// List stored entries, newest first
    List,
    /// Show one stored entry with its parsed components
    Show {
        /// Entry ID
        id: i64,
    },
    /// Delete a stored entry
    Delete {
        /// Entry ID
        id: i64,
    },
    /// Print field frequencies and distance statistics
    Analyze {
        /// Address the distances are measured from
        #[arg(long, default_value = DEFAULT_REFERENCE_ADDRESS)]
        reference: String,
        /// Entries at or under this distance (km) count as close
        #[arg(long, default_value_t = DEFAULT_DISTANCE_THRESHOLD_KM)]
        threshold: f64,
        /// Histogram bin width in km
        #[arg(long, default_value_t = DEFAULT_BIN_WIDTH_KM)]
        bin_width: f64,
        /// Comma-separated fields to tabulate (e.g., "city,road")
        #[arg(long, value_delimiter = ',')]
        fields: Vec<AddressField>,
    },
    /// Retry geocoding for entries without coordinates
    Geocode,
    /// Parse entries that have not been parsed yet
    Parse,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return address_map_ingest::interactive::run(&LogProgress::shared).await;
    };

    let db = Mutex::new(address_map_database::open_default()?);
    let start = Instant::now();

    match command {
        Commands::Submit { address } => {
            let geocoder = NominatimGeocoder::from_registry()?;
            let parser = LibpostalParser::from_registry()?;
            let detail =
                address_map_ingest::submit_address(&db, &geocoder, &parser, &address).await?;
            print!("{}", format_detail(&detail));
        }
        Commands::Import { file, delay_ms } => {
            let lines = address_map_ingest::read_addresses(&file)?;
            let geocoder = NominatimGeocoder::from_registry()?;
            let parser = LibpostalParser::from_registry()?;
            let delay = delay_ms.map_or_else(|| geocoder.rate_limit(), Duration::from_millis);

            let summary = address_map_ingest::import_addresses(
                &db,
                &geocoder,
                &parser,
                &lines,
                LogProgress::shared("Import"),
                delay,
            )
            .await?;

            log::info!(
                "Import complete: {} submitted, {} geocoded, {} parsed, {} skipped in {:.1}s",
                summary.submitted,
                summary.geocoded,
                summary.parsed,
                summary.skipped,
                start.elapsed().as_secs_f64()
            );
        }
        Commands::List => {
            let rows = queries::list_queries(&*lock(&db)?)?;
            print!("{}", format_queries(&rows));
        }
        Commands::Show { id } => {
            let detail = queries::get_query(&*lock(&db)?, id)?
                .ok_or_else(|| format!("No entry with ID {id}"))?;
            print!("{}", format_detail(&detail));
        }
        Commands::Delete { id } => {
            if !queries::delete_query(&*lock(&db)?, id)? {
                return Err(format!("No entry with ID {id}").into());
            }
            println!("Deleted entry {id}.");
        }
        Commands::Analyze {
            reference,
            threshold,
            bin_width,
            fields,
        } => {
            let mut params = AnalysisParams {
                threshold_km: threshold,
                bin_width_km: bin_width,
                ..AnalysisParams::default()
            };
            if !fields.is_empty() {
                params.fields = fields;
            }

            let geocoder = NominatimGeocoder::from_registry()?;
            let report =
                address_map_ingest::analyze_stored(&db, &geocoder, &reference, &params).await?;
            print!("{}", format_report(&reference, &report));
        }
        Commands::Geocode => {
            let geocoder = NominatimGeocoder::from_registry()?;
            let delay = geocoder.rate_limit();
            address_map_ingest::geocode_missing(
                &db,
                &geocoder,
                LogProgress::shared("Geocode"),
                delay,
            )
            .await?;
        }
        Commands::Parse => {
            let parser = LibpostalParser::from_registry()?;
            address_map_ingest::parse_unprocessed(&db, &parser, LogProgress::shared("Parse"))
                .await?;
        }
    }

    Ok(())
}
