#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Address component taxonomy and record types.
//!
//! This crate defines the canonical set of address components produced by
//! the address parser, the coordinate pair produced by the geocoder, and
//! the [`AddressRecord`] view that the analysis engine consumes. Nothing
//! here performs I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A named structural component of a parsed address.
///
/// Mirrors the label set emitted by libpostal's address parser.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddressField {
    /// Venue name (e.g. "Brooklyn Academy of Music").
    House,
    /// Category query (e.g. "restaurants").
    Category,
    /// Phrases like "in", "near" attached to a category query.
    Near,
    /// External house number.
    HouseNumber,
    /// Street name.
    Road,
    /// Apartment, unit, office, lot.
    Unit,
    /// Floor or level.
    Level,
    /// Staircase number.
    Staircase,
    /// Building entrance.
    Entrance,
    /// Post office box.
    PoBox,
    /// Postal code.
    Postcode,
    /// Unofficial neighborhood name.
    Suburb,
    /// Borough or administrative city district.
    CityDistrict,
    /// Any human settlement.
    City,
    /// Named island.
    Island,
    /// Second-level administrative division (county).
    StateDistrict,
    /// First-level administrative division.
    State,
    /// Informal sub-country region.
    CountryRegion,
    /// Sovereign nation or dependent territory.
    Country,
    /// Continent or large region (e.g. "Caribbean").
    WorldRegion,
}

impl AddressField {
    /// Every address field, in parser label order.
    pub const ALL: &'static [Self] = &[
        Self::House,
        Self::Category,
        Self::Near,
        Self::HouseNumber,
        Self::Road,
        Self::Unit,
        Self::Level,
        Self::Staircase,
        Self::Entrance,
        Self::PoBox,
        Self::Postcode,
        Self::Suburb,
        Self::CityDistrict,
        Self::City,
        Self::Island,
        Self::StateDistrict,
        Self::State,
        Self::CountryRegion,
        Self::Country,
        Self::WorldRegion,
    ];

    /// Fields included in the frequency analysis when the caller does not
    /// ask for a specific set.
    pub const ANALYZED: &'static [Self] = &[
        Self::City,
        Self::Road,
        Self::Country,
        Self::State,
        Self::Postcode,
        Self::Suburb,
        Self::CityDistrict,
    ];

    /// Field the dashboard charts first.
    pub const DEFAULT_CHART: Self = Self::Country;
}

/// Components parsed from a free-text address.
///
/// Keyed by [`AddressField`]; a field missing from the map is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedAddress {
    components: BTreeMap<AddressField, String>,
}

impl ParsedAddress {
    /// Creates an empty set of components.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            components: BTreeMap::new(),
        }
    }

    /// Sets the value for `field`, replacing any previous value.
    pub fn insert(&mut self, field: AddressField, value: impl Into<String>) {
        self.components.insert(field, value.into());
    }

    /// Returns the value for `field`.
    ///
    /// Empty and whitespace-only values are reported as unset.
    #[must_use]
    pub fn get(&self, field: AddressField) -> Option<&str> {
        self.components
            .get(&field)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Iterates over the stored components in field order.
    pub fn iter(&self) -> impl Iterator<Item = (AddressField, &str)> {
        self.components.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Number of stored components (including empty ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether no component is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromIterator<(AddressField, String)> for ParsedAddress {
    fn from_iter<T: IntoIterator<Item = (AddressField, String)>>(iter: T) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair from longitude and latitude.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Parses the stored `"lon, lat"` text form.
    ///
    /// Returns `None` unless the input is exactly two comma-separated
    /// finite numbers within WGS84 bounds.
    #[must_use]
    pub fn parse_lon_lat(s: &str) -> Option<Self> {
        let mut parts = s.split(',');
        let lon = parts.next()?.trim().parse::<f64>().ok()?;
        let lat = parts.next()?.trim().parse::<f64>().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let coords = Self::new(lon, lat);
        coords.is_valid().then_some(coords)
    }

    /// Renders the `"lon, lat"` text form used for storage.
    #[must_use]
    pub fn to_lon_lat_string(&self) -> String {
        format!("{}, {}", self.longitude, self.latitude)
    }

    /// Whether both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// A stored address submission as seen by the analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    /// Storage identifier.
    pub id: i64,
    /// The raw free-text address as submitted.
    pub address: String,
    /// Display name returned by the geocoder.
    pub display_name: Option<String>,
    /// Geocoded position, if geocoding succeeded.
    pub coordinates: Option<Coordinates>,
    /// Parsed components, if parsing succeeded.
    pub components: Option<ParsedAddress>,
}

impl AddressRecord {
    /// Returns the parsed value for `field`, treating unparsed records and
    /// empty values as unset.
    #[must_use]
    pub fn field_value(&self, field: AddressField) -> Option<&str> {
        self.components.as_ref().and_then(|c| c.get(field))
    }
}
