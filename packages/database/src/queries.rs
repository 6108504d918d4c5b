//! Query storage and retrieval.
//!
//! `queries` holds one row per submitted address. Coordinates are stored as
//! `"lon, lat"` text and re-parsed on read; rows whose text is malformed
//! come back without coordinates. `parsed_addresses` holds one column per
//! [`AddressField`], keyed by `query_id`.

use std::fmt::Write as _;
use std::sync::LazyLock;

use address_map_address_models::{AddressField, AddressRecord, Coordinates, ParsedAddress};
use address_map_database_models::{QueryDetail, QueryRow};
use chrono::{DateTime, Utc};
use duckdb::Connection;

use crate::DbError;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Quoted, comma-separated component column list in [`AddressField::ALL`]
/// order.
static FIELD_COLUMNS: LazyLock<String> = LazyLock::new(|| {
    AddressField::ALL
        .iter()
        .map(|f| format!("\"{}\"", f.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
});

const QUERY_COLUMNS: &str = "id, address, display_name, coordinates, processed, created_at";

pub(crate) fn create_schema(conn: &Connection) -> Result<(), DbError> {
    let mut field_ddl = String::new();
    for field in AddressField::ALL {
        let _ = writeln!(field_ddl, "            \"{}\" TEXT,", field.as_ref());
    }

    conn.execute_batch(&format!(
        "CREATE SEQUENCE IF NOT EXISTS queries_id_seq START 1;

        CREATE TABLE IF NOT EXISTS queries (
            id BIGINT PRIMARY KEY DEFAULT nextval('queries_id_seq'),
            address TEXT NOT NULL,
            display_name TEXT,
            coordinates TEXT,
            processed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS parsed_addresses (
            query_id BIGINT PRIMARY KEY,
{field_ddl}            created_at TEXT NOT NULL
        );"
    ))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Stores a newly submitted address and returns the stored row.
///
/// The row starts without coordinates and unprocessed.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_query(conn: &Connection, address: &str) -> Result<QueryRow, DbError> {
    let created_at = Utc::now();
    let id: i64 = conn.query_row(
        "INSERT INTO queries (address, processed, created_at) VALUES (?, FALSE, ?) RETURNING id",
        duckdb::params![address, created_at.to_rfc3339()],
        |row| row.get(0),
    )?;

    log::debug!("Stored query {id}: {address:?}");

    Ok(QueryRow {
        id,
        address: address.to_string(),
        display_name: None,
        coordinates: None,
        processed: false,
        created_at,
    })
}

/// Records the geocoding result for a query.
///
/// Returns whether the query exists.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub fn set_geocode(
    conn: &Connection,
    id: i64,
    coordinates: Coordinates,
    display_name: Option<&str>,
) -> Result<bool, DbError> {
    let rows = conn.execute(
        "UPDATE queries SET coordinates = ?, display_name = ? WHERE id = ?",
        duckdb::params![coordinates.to_lon_lat_string(), display_name, id],
    )?;
    Ok(rows > 0)
}

/// Stores (or replaces) the parsed components of a query and marks it
/// processed.
///
/// Both writes happen in one transaction, so a failed upsert leaves the
/// query unprocessed. Returns whether the query exists; nothing is written
/// if it doesn't.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn insert_parsed(conn: &Connection, id: i64, parsed: &ParsedAddress) -> Result<bool, DbError> {
    let placeholders = vec!["?"; AddressField::ALL.len() + 2].join(", ");
    let updates = AddressField::ALL
        .iter()
        .map(|f| format!("\"{0}\" = EXCLUDED.\"{0}\"", f.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO parsed_addresses (query_id, {columns}, created_at) VALUES ({placeholders})
         ON CONFLICT (query_id) DO UPDATE SET {updates}, created_at = EXCLUDED.created_at",
        columns = &*FIELD_COLUMNS,
    );

    in_transaction(conn, |conn| {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM queries WHERE id = ?",
            duckdb::params![id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Ok(false);
        }

        let mut stmt = conn.prepare(&sql)?;
        stmt.raw_bind_parameter(1, id)?;
        for (i, field) in AddressField::ALL.iter().enumerate() {
            stmt.raw_bind_parameter(i + 2, parsed.get(*field))?;
        }
        stmt.raw_bind_parameter(AddressField::ALL.len() + 2, Utc::now().to_rfc3339())?;
        stmt.raw_execute()?;

        conn.execute(
            "UPDATE queries SET processed = TRUE WHERE id = ?",
            duckdb::params![id],
        )?;

        Ok(true)
    })
}

/// Deletes a query and its parsed components in one transaction.
///
/// Returns whether the query existed.
///
/// # Errors
///
/// Returns [`DbError`] if either delete fails; neither is applied then.
pub fn delete_query(conn: &Connection, id: i64) -> Result<bool, DbError> {
    let rows = in_transaction(conn, |conn| {
        conn.execute(
            "DELETE FROM parsed_addresses WHERE query_id = ?",
            duckdb::params![id],
        )?;
        Ok(conn.execute("DELETE FROM queries WHERE id = ?", duckdb::params![id])?)
    })?;

    if rows > 0 {
        log::info!("Deleted query {id}");
    }

    Ok(rows > 0)
}

/// Runs `f` between `BEGIN TRANSACTION` and `COMMIT`, rolling back if it
/// fails.
fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, DbError>,
) -> Result<T, DbError> {
    conn.execute_batch("BEGIN TRANSACTION")?;

    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::warn!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// A `queries` row before its text columns are decoded.
struct RawQuery {
    id: i64,
    address: String,
    display_name: Option<String>,
    coordinates: Option<String>,
    processed: bool,
    created_at: String,
}

impl RawQuery {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            address: row.get(1)?,
            display_name: row.get(2)?,
            coordinates: row.get(3)?,
            processed: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn decode(self) -> Result<QueryRow, DbError> {
        let created_at = parse_timestamp(&self.created_at).ok_or_else(|| DbError::Conversion {
            message: format!(
                "Invalid created_at {:?} for query {}",
                self.created_at, self.id
            ),
        })?;

        let coordinates = self.coordinates.as_deref().and_then(|text| {
            let parsed = Coordinates::parse_lon_lat(text);
            if parsed.is_none() {
                log::warn!("Query {} has malformed coordinates {text:?}", self.id);
            }
            parsed
        });

        Ok(QueryRow {
            id: self.id,
            address: self.address,
            display_name: self.display_name,
            coordinates,
            processed: self.processed,
            created_at,
        })
    }
}

/// Reads component columns starting at `offset`, in [`AddressField::ALL`]
/// order.
fn components_from_row(row: &duckdb::Row<'_>, offset: usize) -> duckdb::Result<ParsedAddress> {
    let mut parsed = ParsedAddress::new();
    for (i, field) in AddressField::ALL.iter().enumerate() {
        let value: Option<String> = row.get(offset + i)?;
        if let Some(value) = value {
            parsed.insert(*field, value);
        }
    }
    Ok(parsed)
}

fn select_queries(conn: &Connection, filter: &str) -> Result<Vec<QueryRow>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUERY_COLUMNS} FROM queries {filter} ORDER BY id DESC"
    ))?;
    let raw = stmt
        .query_map([], RawQuery::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(RawQuery::decode).collect()
}

/// Returns all stored queries, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn list_queries(conn: &Connection) -> Result<Vec<QueryRow>, DbError> {
    select_queries(conn, "")
}

/// Returns queries that have no stored coordinates, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn list_ungeocoded(conn: &Connection) -> Result<Vec<QueryRow>, DbError> {
    select_queries(conn, "WHERE coordinates IS NULL")
}

/// Returns queries that have not been parsed yet, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn list_unprocessed(conn: &Connection) -> Result<Vec<QueryRow>, DbError> {
    select_queries(conn, "WHERE NOT processed")
}

/// Returns the number of stored queries.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count_queries(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM queries", [], |row| row.get(0))?;
    #[allow(clippy::cast_sign_loss)]
    Ok(count as u64)
}

/// Returns a single query with its parsed components, or `None` if no such
/// query exists.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be decoded.
pub fn get_query(conn: &Connection, id: i64) -> Result<Option<QueryDetail>, DbError> {
    let raw = match conn.query_row(
        &format!("SELECT {QUERY_COLUMNS} FROM queries WHERE id = ?"),
        duckdb::params![id],
        RawQuery::from_row,
    ) {
        Ok(raw) => raw,
        Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(DbError::DuckDb(e)),
    };
    let query = raw.decode()?;

    let components = match conn.query_row(
        &format!(
            "SELECT {} FROM parsed_addresses WHERE query_id = ?",
            &*FIELD_COLUMNS
        ),
        duckdb::params![id],
        |row| components_from_row(row, 0),
    ) {
        Ok(parsed) => Some(parsed),
        Err(duckdb::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(DbError::DuckDb(e)),
    };

    Ok(Some(QueryDetail { query, components }))
}

/// Selects every stored query joined with its parsed components.
fn select_details(conn: &Connection, order: &str) -> Result<Vec<QueryDetail>, DbError> {
    let prefixed = AddressField::ALL
        .iter()
        .map(|f| format!("p.\"{}\"", f.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT q.id, q.address, q.display_name, q.coordinates, q.processed, q.created_at,
                p.query_id, {prefixed}
         FROM queries q
         LEFT JOIN parsed_addresses p ON p.query_id = q.id
         ORDER BY q.id {order}"
    ))?;

    let rows = stmt
        .query_map([], |row| {
            let raw = RawQuery::from_row(row)?;
            let parsed_id: Option<i64> = row.get(6)?;
            let components = match parsed_id {
                Some(_) => Some(components_from_row(row, 7)?),
                None => None,
            };
            Ok((raw, components))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(raw, components)| {
            Ok(QueryDetail {
                query: raw.decode()?,
                components,
            })
        })
        .collect()
}

/// Returns all stored queries with their parsed components, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn list_query_details(conn: &Connection) -> Result<Vec<QueryDetail>, DbError> {
    select_details(conn, "DESC")
}

/// Loads every stored query joined with its parsed components, oldest
/// first, as analysis input.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub fn load_records(conn: &Connection) -> Result<Vec<AddressRecord>, DbError> {
    let records: Vec<AddressRecord> = select_details(conn, "ASC")?
        .into_iter()
        .map(AddressRecord::from)
        .collect();

    log::debug!("Loaded {} address records", records.len());
    Ok(records)
}

/// Parses a stored timestamp.
///
/// Rows written by this crate use RFC 3339. `DuckDB`'s own text cast
/// (`2024-01-15 10:30:00[.fff][+00]`) is accepted too, for rows inserted
/// by hand.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    use chrono::NaiveDateTime;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    log::warn!("Failed to parse timestamp: {s:?}");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Connection {
        crate::open_in_memory().unwrap()
    }

    fn parsed(pairs: &[(AddressField, &str)]) -> ParsedAddress {
        pairs
            .iter()
            .map(|(f, v)| (*f, (*v).to_string()))
            .collect()
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let conn = db();
        let first = insert_query(&conn, "Ferhadija 12").unwrap();
        let second = insert_query(&conn, "Maršala Tita 5").unwrap();

        assert!(second.id > first.id);
        assert!(!first.processed);
        assert!(first.coordinates.is_none());
        assert_eq!(count_queries(&conn).unwrap(), 2);
    }

    #[test]
    fn list_is_newest_first() {
        let conn = db();
        let a = insert_query(&conn, "a").unwrap();
        let b = insert_query(&conn, "b").unwrap();
        let c = insert_query(&conn, "c").unwrap();

        let ids: Vec<i64> = list_queries(&conn).unwrap().iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn stored_timestamp_round_trips() {
        let conn = db();
        let stored = insert_query(&conn, "Ferhadija 12").unwrap();
        let listed = list_queries(&conn).unwrap();
        assert_eq!(listed[0].created_at, stored.created_at);
    }

    #[test]
    fn set_geocode_stores_lon_lat_text() {
        let conn = db();
        let q = insert_query(&conn, "Baščaršija").unwrap();

        assert!(set_geocode(&conn, q.id, Coordinates::new(18.431, 43.859), Some("Baščaršija")).unwrap());

        let text: String = conn
            .query_row(
                "SELECT coordinates FROM queries WHERE id = ?",
                duckdb::params![q.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(text, "18.431, 43.859");

        let detail = get_query(&conn, q.id).unwrap().unwrap();
        assert_eq!(detail.query.coordinates, Some(Coordinates::new(18.431, 43.859)));
        assert_eq!(detail.query.display_name.as_deref(), Some("Baščaršija"));
        assert!(list_ungeocoded(&conn).unwrap().is_empty());
    }

    #[test]
    fn set_geocode_unknown_id_reports_missing() {
        let conn = db();
        assert!(!set_geocode(&conn, 42, Coordinates::new(18.0, 43.0), None).unwrap());
    }

    #[test]
    fn insert_parsed_marks_processed() {
        let conn = db();
        let q = insert_query(&conn, "Ferhadija 12, Sarajevo").unwrap();
        assert_eq!(list_unprocessed(&conn).unwrap().len(), 1);

        let components = parsed(&[
            (AddressField::Road, "ferhadija"),
            (AddressField::HouseNumber, "12"),
            (AddressField::City, "sarajevo"),
        ]);
        assert!(insert_parsed(&conn, q.id, &components).unwrap());

        let detail = get_query(&conn, q.id).unwrap().unwrap();
        assert!(detail.query.processed);
        assert_eq!(detail.components, Some(components));
        assert!(list_unprocessed(&conn).unwrap().is_empty());
    }

    #[test]
    fn insert_parsed_replaces_previous_components() {
        let conn = db();
        let q = insert_query(&conn, "Mostar").unwrap();
        insert_parsed(&conn, q.id, &parsed(&[(AddressField::City, "sarajevo")])).unwrap();
        insert_parsed(&conn, q.id, &parsed(&[(AddressField::City, "mostar")])).unwrap();

        let detail = get_query(&conn, q.id).unwrap().unwrap();
        let components = detail.components.unwrap();
        assert_eq!(components.get(AddressField::City), Some("mostar"));
        assert_eq!(components.len(), 1);
    }

    #[test]
    fn insert_parsed_unknown_id_writes_nothing() {
        let conn = db();
        assert!(!insert_parsed(&conn, 9, &parsed(&[(AddressField::City, "x")])).unwrap());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM parsed_addresses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn get_missing_query_is_none() {
        let conn = db();
        assert!(get_query(&conn, 1).unwrap().is_none());
    }

    #[test]
    fn delete_removes_query_and_components() {
        let conn = db();
        let q = insert_query(&conn, "Ferhadija 12").unwrap();
        insert_parsed(&conn, q.id, &parsed(&[(AddressField::Road, "ferhadija")])).unwrap();

        assert!(delete_query(&conn, q.id).unwrap());
        assert!(get_query(&conn, q.id).unwrap().is_none());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM parsed_addresses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        assert!(!delete_query(&conn, q.id).unwrap());
    }

    #[test]
    fn failed_parse_write_leaves_query_unprocessed() {
        let conn = db();
        let q = insert_query(&conn, "Ferhadija 12").unwrap();
        conn.execute_batch("DROP TABLE parsed_addresses").unwrap();

        assert!(insert_parsed(&conn, q.id, &parsed(&[(AddressField::Road, "ferhadija")])).is_err());

        let processed: bool = conn
            .query_row(
                "SELECT processed FROM queries WHERE id = ?",
                duckdb::params![q.id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!processed);
        let pending = list_unprocessed(&conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, q.id);
    }

    #[test]
    fn failed_delete_keeps_components() {
        let conn = db();
        let q = insert_query(&conn, "Ferhadija 12").unwrap();
        insert_parsed(&conn, q.id, &parsed(&[(AddressField::Road, "ferhadija")])).unwrap();
        conn.execute_batch("CREATE TABLE notes (query_id BIGINT REFERENCES queries(id))")
            .unwrap();
        conn.execute("INSERT INTO notes VALUES (?)", duckdb::params![q.id])
            .unwrap();

        assert!(delete_query(&conn, q.id).is_err());

        let detail = get_query(&conn, q.id).unwrap().unwrap();
        assert_eq!(
            detail.components.unwrap().get(AddressField::Road),
            Some("ferhadija")
        );
    }

    #[test]
    fn load_records_joins_components() {
        let conn = db();
        let parsed_q = insert_query(&conn, "Ferhadija 12").unwrap();
        let bare_q = insert_query(&conn, "somewhere").unwrap();
        set_geocode(&conn, parsed_q.id, Coordinates::new(18.4291, 43.859), None).unwrap();
        insert_parsed(&conn, parsed_q.id, &parsed(&[(AddressField::Country, "bih")])).unwrap();

        let records = load_records(&conn).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, parsed_q.id);
        assert_eq!(records[0].field_value(AddressField::Country), Some("bih"));
        assert_eq!(records[0].coordinates, Some(Coordinates::new(18.4291, 43.859)));
        assert_eq!(records[1].id, bare_q.id);
        assert!(records[1].components.is_none());
        assert!(records[1].coordinates.is_none());
    }

    #[test]
    fn details_are_newest_first_with_components() {
        let conn = db();
        let older = insert_query(&conn, "older").unwrap();
        let newer = insert_query(&conn, "newer").unwrap();
        insert_parsed(&conn, older.id, &parsed(&[(AddressField::Road, "ferhadija")])).unwrap();

        let details = list_query_details(&conn).unwrap();
        assert_eq!(details[0].query.id, newer.id);
        assert!(details[0].components.is_none());
        assert_eq!(details[1].query.id, older.id);
        assert_eq!(
            details[1].components.as_ref().unwrap().get(AddressField::Road),
            Some("ferhadija")
        );
    }

    #[test]
    fn malformed_coordinates_load_as_none() {
        let conn = db();
        let q = insert_query(&conn, "broken").unwrap();
        conn.execute(
            "UPDATE queries SET coordinates = 'not a point' WHERE id = ?",
            duckdb::params![q.id],
        )
        .unwrap();

        let records = load_records(&conn).unwrap();
        assert!(records[0].coordinates.is_none());
        assert_eq!(list_ungeocoded(&conn).unwrap().len(), 0);
    }

    #[test]
    fn parses_duckdb_text_timestamps() {
        assert!(parse_timestamp("2024-01-15T10:30:00+00:00").is_some());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_some());
        assert!(parse_timestamp("2024-01-15 10:30:00.123").is_some());
        assert!(parse_timestamp("2024-01-15 10:30:00+00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
