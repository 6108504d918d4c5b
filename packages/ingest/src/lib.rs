#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address submission pipeline.
//!
//! A submitted address is stored first, then geocoded and parsed. Neither
//! collaborator failing aborts the submission: the entry simply stays
//! without coordinates or unprocessed, and [`geocode_missing`] /
//! [`parse_unprocessed`] can backfill it later.
//!
//! The database connection is shared behind a [`Mutex`]. The lock is only
//! taken around synchronous storage calls, never across an `.await`.

pub mod display;
pub mod interactive;
pub mod progress;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use address_map_address_models::{AddressRecord, ParsedAddress};
use address_map_analysis::AnalysisError;
use address_map_analysis_models::{AnalysisParams, AnalysisReport, ReferencePoint};
use address_map_database::{Connection, DbError, lock, queries};
use address_map_database_models::QueryDetail;
use address_map_geocoder::{AddressParser, Geocoder};

use crate::progress::ProgressCallback;

/// Errors from the submission pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The address was empty after trimming.
    #[error("Address must not be empty")]
    EmptyAddress,

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Invalid analysis parameters.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Reading an import file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome counts of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Addresses stored.
    pub submitted: u64,
    /// Stored addresses that received coordinates.
    pub geocoded: u64,
    /// Stored addresses that were parsed.
    pub parsed: u64,
    /// Blank lines skipped.
    pub skipped: u64,
}

/// Stores `raw`, geocodes it and parses it.
///
/// Geocoding and parsing failures are logged and leave the entry without
/// coordinates or unprocessed respectively.
///
/// # Errors
///
/// Returns [`IngestError::EmptyAddress`] for blank input, or
/// [`IngestError::Db`] if storage fails.
pub async fn submit_address(
    db: &Mutex<Connection>,
    geocoder: &dyn Geocoder,
    parser: &dyn AddressParser,
    raw: &str,
) -> Result<QueryDetail, IngestError> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(IngestError::EmptyAddress);
    }

    let mut query = {
        let conn = lock(db)?;
        queries::insert_query(&conn, address)?
    };
    log::info!("Submitted address {}: {address:?}", query.id);

    if geocode_one(db, geocoder, query.id, address).await? {
        let conn = lock(db)?;
        if let Some(stored) = queries::get_query(&conn, query.id)? {
            query = stored.query;
        }
    }

    let components = parse_one(db, parser, query.id, address).await?;
    query.processed = components.is_some();

    Ok(QueryDetail { query, components })
}

/// Geocodes one stored query. Returns whether coordinates were stored.
async fn geocode_one(
    db: &Mutex<Connection>,
    geocoder: &dyn Geocoder,
    id: i64,
    address: &str,
) -> Result<bool, IngestError> {
    let result = match geocoder.geocode(address).await {
        Ok(Some(result)) => result,
        Ok(None) => {
            log::warn!("No geocoding result for {address:?}");
            return Ok(false);
        }
        Err(e) => {
            log::warn!("Geocoding {address:?} failed: {e}");
            return Ok(false);
        }
    };

    let coordinates = result.coordinates();
    if !coordinates.is_valid() {
        log::warn!(
            "Geocoder returned out-of-range position ({}, {}) for {address:?}",
            result.latitude,
            result.longitude
        );
        return Ok(false);
    }

    let conn = lock(db)?;
    Ok(queries::set_geocode(
        &conn,
        id,
        coordinates,
        result.display_name.as_deref(),
    )?)
}

/// Parses one stored query. Returns the components if they were stored.
async fn parse_one(
    db: &Mutex<Connection>,
    parser: &dyn AddressParser,
    id: i64,
    address: &str,
) -> Result<Option<ParsedAddress>, IngestError> {
    let parsed = match parser.parse(address).await {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Parsing {address:?} failed: {e}");
            return Ok(None);
        }
    };

    let conn = lock(db)?;
    Ok(queries::insert_parsed(&conn, id, &parsed)?.then_some(parsed))
}

/// Submits each non-blank line of `lines` in order.
///
/// Sleeps `delay` between consecutive submissions so bulk imports respect
/// the geocoder's rate limit.
///
/// # Errors
///
/// Returns [`IngestError::Db`] if storage fails; per-address geocoding and
/// parsing failures are only counted.
pub async fn import_addresses(
    db: &Mutex<Connection>,
    geocoder: &dyn Geocoder,
    parser: &dyn AddressParser,
    lines: &[String],
    progress: Arc<dyn ProgressCallback>,
    delay: Duration,
) -> Result<ImportSummary, IngestError> {
    let addresses: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut summary = ImportSummary {
        skipped: (lines.len() - addresses.len()) as u64,
        ..ImportSummary::default()
    };

    progress.set_total(addresses.len() as u64);
    log::info!(
        "Importing {} address(es) ({} blank line(s) skipped)",
        addresses.len(),
        summary.skipped
    );

    for (i, address) in addresses.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        progress.set_message((*address).to_string());
        let detail = submit_address(db, geocoder, parser, address).await?;

        summary.submitted += 1;
        if detail.query.is_geocoded() {
            summary.geocoded += 1;
        }
        if detail.components.is_some() {
            summary.parsed += 1;
        }
        progress.inc(1);
    }

    progress.finish(format!(
        "Imported {} address(es), {} geocoded, {} parsed",
        summary.submitted, summary.geocoded, summary.parsed
    ));

    Ok(summary)
}

/// Retries geocoding for every stored query that has no coordinates.
///
/// Returns the number of queries that received coordinates.
///
/// # Errors
///
/// Returns [`IngestError::Db`] if storage fails.
pub async fn geocode_missing(
    db: &Mutex<Connection>,
    geocoder: &dyn Geocoder,
    progress: Arc<dyn ProgressCallback>,
    delay: Duration,
) -> Result<u64, IngestError> {
    let pending = {
        let conn = lock(db)?;
        queries::list_ungeocoded(&conn)?
    };

    if pending.is_empty() {
        log::info!("No un-geocoded addresses found");
        return Ok(0);
    }

    progress.set_total(pending.len() as u64);
    let mut geocoded = 0u64;

    for (i, query) in pending.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        progress.set_message(query.address.clone());
        if geocode_one(db, geocoder, query.id, &query.address).await? {
            geocoded += 1;
        }
        progress.inc(1);
    }

    progress.finish(format!("Geocoded {geocoded}/{}", pending.len()));
    log::info!("Geocoded {geocoded} of {} pending address(es)", pending.len());
    Ok(geocoded)
}

/// Parses every stored query that has not been processed yet.
///
/// Returns the number of queries that were parsed.
///
/// # Errors
///
/// Returns [`IngestError::Db`] if storage fails.
pub async fn parse_unprocessed(
    db: &Mutex<Connection>,
    parser: &dyn AddressParser,
    progress: Arc<dyn ProgressCallback>,
) -> Result<u64, IngestError> {
    let pending = {
        let conn = lock(db)?;
        queries::list_unprocessed(&conn)?
    };

    if pending.is_empty() {
        log::info!("No unprocessed addresses found");
        return Ok(0);
    }

    progress.set_total(pending.len() as u64);
    let mut parsed = 0u64;

    for query in &pending {
        progress.set_message(query.address.clone());
        if parse_one(db, parser, query.id, &query.address)
            .await?
            .is_some()
        {
            parsed += 1;
        }
        progress.inc(1);
    }

    progress.finish(format!("Parsed {parsed}/{}", pending.len()));
    log::info!("Parsed {parsed} of {} pending address(es)", pending.len());
    Ok(parsed)
}

/// Geocodes the reference address.
///
/// Any failure, including an empty result, falls back to
/// [`ReferencePoint::fallback`].
pub async fn resolve_reference(geocoder: &dyn Geocoder, address: &str) -> ReferencePoint {
    match geocoder.geocode(address).await {
        Ok(Some(result)) if result.coordinates().is_valid() => {
            log::debug!(
                "Reference {address:?} resolved to ({}, {})",
                result.latitude,
                result.longitude
            );
            ReferencePoint::geocoded(result.coordinates(), result.display_name)
        }
        Ok(_) => {
            log::warn!("No usable geocoding result for reference {address:?}, using fallback");
            ReferencePoint::fallback()
        }
        Err(e) => {
            log::warn!("Geocoding reference {address:?} failed ({e}), using fallback");
            ReferencePoint::fallback()
        }
    }
}

/// Loads every stored record, resolves the reference and runs the
/// analysis.
///
/// The threshold and bin width are checked before anything is loaded or
/// geocoded.
///
/// # Errors
///
/// Returns [`IngestError::Db`] if loading fails or
/// [`IngestError::Analysis`] if `params` are invalid.
pub async fn analyze_stored(
    db: &Mutex<Connection>,
    geocoder: &dyn Geocoder,
    reference_address: &str,
    params: &AnalysisParams,
) -> Result<AnalysisReport, IngestError> {
    address_map_analysis::validate_params(params)?;

    let records: Vec<AddressRecord> = {
        let conn = lock(db)?;
        queries::load_records(&conn)?
    };

    let reference = resolve_reference(geocoder, reference_address).await;
    Ok(address_map_analysis::analyze(&records, &reference, params)?)
}

/// Reads an import file, one address per line.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the file cannot be read.
pub fn read_addresses(path: &Path) -> Result<Vec<String>, IngestError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.lines().map(str::to_string).collect())
}
