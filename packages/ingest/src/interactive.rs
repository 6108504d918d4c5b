#![allow(clippy::module_name_repetitions)]

//! Interactive TUI for the address tools.
//!
//! Provides a menu-driven interface using `dialoguer` for submitting,
//! importing, inspecting and analyzing addresses without memorizing CLI
//! flags.

use std::path::PathBuf;
use std::sync::Mutex;

use address_map_analysis_models::{
    AnalysisParams, DEFAULT_BIN_WIDTH_KM, DEFAULT_DISTANCE_THRESHOLD_KM,
    DEFAULT_REFERENCE_ADDRESS,
};
use address_map_database::{Connection, lock, queries};
use address_map_geocoder::libpostal::LibpostalParser;
use address_map_geocoder::nominatim::NominatimGeocoder;
use dialoguer::{Confirm, Input, Select};

use crate::display::{format_detail, format_queries, format_report};
use crate::progress::ProgressFactory;

/// Top-level actions available in the interactive menu.
enum IngestAction {
    SubmitAddress,
    ImportFile,
    ListEntries,
    ShowEntry,
    DeleteEntry,
    PrintAnalysis,
    GeocodeMissing,
    ParseUnprocessed,
}

impl IngestAction {
    const ALL: &[Self] = &[
        Self::SubmitAddress,
        Self::ImportFile,
        Self::ListEntries,
        Self::ShowEntry,
        Self::DeleteEntry,
        Self::PrintAnalysis,
        Self::GeocodeMissing,
        Self::ParseUnprocessed,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::SubmitAddress => "Add address",
            Self::ImportFile => "Import addresses from file",
            Self::ListEntries => "List entries",
            Self::ShowEntry => "Show entry",
            Self::DeleteEntry => "Delete entry",
            Self::PrintAnalysis => "Print analysis",
            Self::GeocodeMissing => "Geocode entries missing coordinates",
            Self::ParseUnprocessed => "Parse unprocessed entries",
        }
    }
}

/// Runs the interactive menu, prompting the user to select and configure
/// an operation.
///
/// `progress` builds the reporter used by bulk operations.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, a service client
/// cannot be built, or the selected operation fails.
pub async fn run(progress: ProgressFactory<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Mutex::new(address_map_database::open_default()?);

    let labels: Vec<&str> = IngestAction::ALL.iter().map(IngestAction::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match IngestAction::ALL[idx] {
        IngestAction::SubmitAddress => submit(&db).await?,
        IngestAction::ImportFile => import_file(&db, progress).await?,
        IngestAction::ListEntries => {
            let rows = queries::list_queries(&*lock(&db)?)?;
            if rows.is_empty() {
                println!("No entries stored.");
            } else {
                print!("{}", format_queries(&rows));
            }
        }
        IngestAction::ShowEntry => {
            let id = prompt_id("Entry ID")?;
            let detail = queries::get_query(&*lock(&db)?, id)?;
            match detail {
                Some(detail) => print!("{}", format_detail(&detail)),
                None => println!("No entry with ID {id}."),
            }
        }
        IngestAction::DeleteEntry => delete(&db)?,
        IngestAction::PrintAnalysis => print_analysis(&db).await?,
        IngestAction::GeocodeMissing => {
            let geocoder = NominatimGeocoder::from_registry()?;
            let delay = geocoder.rate_limit();
            let count =
                crate::geocode_missing(&db, &geocoder, progress("Geocoding"), delay).await?;
            println!("Geocoded {count} entr(ies).");
        }
        IngestAction::ParseUnprocessed => {
            let parser = LibpostalParser::from_registry()?;
            let count = crate::parse_unprocessed(&db, &parser, progress("Parsing")).await?;
            println!("Parsed {count} entr(ies).");
        }
    }

    Ok(())
}

async fn submit(db: &Mutex<Connection>) -> Result<(), Box<dyn std::error::Error>> {
    let address: String = Input::new().with_prompt("Address").interact_text()?;

    let geocoder = NominatimGeocoder::from_registry()?;
    let parser = LibpostalParser::from_registry()?;
    let detail = crate::submit_address(db, &geocoder, &parser, &address).await?;

    print!("{}", format_detail(&detail));
    Ok(())
}

async fn import_file(
    db: &Mutex<Connection>,
    progress: ProgressFactory<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path: String = Input::new()
        .with_prompt("Path to address file (one address per line)")
        .interact_text()?;
    let lines = crate::read_addresses(&PathBuf::from(path.trim()))?;

    let geocoder = NominatimGeocoder::from_registry()?;
    let parser = LibpostalParser::from_registry()?;
    let delay = geocoder.rate_limit();

    let summary = crate::import_addresses(
        db,
        &geocoder,
        &parser,
        &lines,
        progress("Importing"),
        delay,
    )
    .await?;

    println!(
        "Imported {} address(es): {} geocoded, {} parsed, {} blank line(s) skipped.",
        summary.submitted, summary.geocoded, summary.parsed, summary.skipped
    );
    Ok(())
}

fn delete(db: &Mutex<Connection>) -> Result<(), Box<dyn std::error::Error>> {
    let id = prompt_id("Entry ID to delete")?;
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete entry {id}?"))
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(());
    }

    if queries::delete_query(&*lock(db)?, id)? {
        println!("Deleted entry {id}.");
    } else {
        println!("No entry with ID {id}.");
    }
    Ok(())
}

async fn print_analysis(db: &Mutex<Connection>) -> Result<(), Box<dyn std::error::Error>> {
    let reference: String = Input::new()
        .with_prompt("Reference address")
        .default(DEFAULT_REFERENCE_ADDRESS.to_string())
        .interact_text()?;
    let threshold_km: f64 = Input::new()
        .with_prompt("Distance threshold (km)")
        .default(DEFAULT_DISTANCE_THRESHOLD_KM)
        .interact_text()?;
    let bin_width_km: f64 = Input::new()
        .with_prompt("Histogram bin width (km)")
        .default(DEFAULT_BIN_WIDTH_KM)
        .interact_text()?;

    let params = AnalysisParams {
        threshold_km,
        bin_width_km,
        ..AnalysisParams::default()
    };

    let geocoder = NominatimGeocoder::from_registry()?;
    let report = crate::analyze_stored(db, &geocoder, &reference, &params).await?;

    print!("{}", format_report(&reference, &report));
    Ok(())
}

fn prompt_id(prompt: &str) -> Result<i64, dialoguer::Error> {
    Input::new().with_prompt(prompt).interact_text()
}
