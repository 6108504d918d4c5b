#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Row types for stored address queries.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the `DuckDB` database. They are distinct from the API response types in
//! `address_map_server_models` and the analysis input type
//! [`AddressRecord`].

use address_map_address_models::{AddressRecord, Coordinates, ParsedAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A submitted address as stored in the `queries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    /// Storage identifier.
    pub id: i64,
    /// The raw free-text address as submitted.
    pub address: String,
    /// Display name returned by the geocoder.
    pub display_name: Option<String>,
    /// Geocoded position. `None` if geocoding failed or the stored text is
    /// malformed.
    pub coordinates: Option<Coordinates>,
    /// Whether the address has been run through the parser.
    pub processed: bool,
    /// When the address was submitted.
    pub created_at: DateTime<Utc>,
}

impl QueryRow {
    /// Whether geocoding produced a usable position.
    #[must_use]
    pub const fn is_geocoded(&self) -> bool {
        self.coordinates.is_some()
    }

    /// Converts the row into an analysis record with the given components.
    #[must_use]
    pub fn into_record(self, components: Option<ParsedAddress>) -> AddressRecord {
        AddressRecord {
            id: self.id,
            address: self.address,
            display_name: self.display_name,
            coordinates: self.coordinates,
            components,
        }
    }
}

/// A stored query together with its parsed components, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDetail {
    /// The stored query.
    pub query: QueryRow,
    /// Parsed components. `None` until the address has been parsed.
    pub components: Option<ParsedAddress>,
}

impl From<QueryDetail> for AddressRecord {
    fn from(detail: QueryDetail) -> Self {
        detail.query.into_record(detail.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use address_map_address_models::AddressField;

    fn row() -> QueryRow {
        QueryRow {
            id: 7,
            address: "Ferhadija 12, Sarajevo".to_string(),
            display_name: Some("Ferhadija, Stari Grad, Sarajevo".to_string()),
            coordinates: Some(Coordinates::new(18.4291, 43.8590)),
            processed: true,
            created_at: DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn detail_converts_into_record() {
        let components: ParsedAddress = [(AddressField::City, "sarajevo".to_string())]
            .into_iter()
            .collect();
        let record: AddressRecord = QueryDetail {
            query: row(),
            components: Some(components),
        }
        .into();

        assert_eq!(record.id, 7);
        assert_eq!(record.field_value(AddressField::City), Some("sarajevo"));
        assert_eq!(record.coordinates, Some(Coordinates::new(18.4291, 43.8590)));
    }

    #[test]
    fn missing_coordinates_are_not_geocoded() {
        let row = QueryRow {
            coordinates: None,
            ..row()
        };
        assert!(!row.is_geocoded());
    }
}
