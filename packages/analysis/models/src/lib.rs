#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the address analysis engine.
//!
//! Defines the frequency tables, distance histogram, map points, and
//! reference point that make up an [`AnalysisReport`]. These types are
//! serialized directly into the `/api/analysis` response.

use std::collections::BTreeMap;

use address_map_address_models::{AddressField, Coordinates};
use serde::{Deserialize, Serialize};

/// Reference address used when the caller does not supply one.
pub const DEFAULT_REFERENCE_ADDRESS: &str = "hitna pomoc sarajevo";

/// Distance threshold (km) used when the caller does not supply one.
pub const DEFAULT_DISTANCE_THRESHOLD_KM: f64 = 2.0;

/// Histogram bin width (km) used when the caller does not supply one.
pub const DEFAULT_BIN_WIDTH_KM: f64 = 1.0;

/// Latitude of the fallback reference point (Sarajevo city centre).
pub const FALLBACK_LATITUDE: f64 = 43.8563;

/// Longitude of the fallback reference point (Sarajevo city centre).
pub const FALLBACK_LONGITUDE: f64 = 18.4131;

/// Value distribution of a single address field across all records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyTable {
    /// Observed value -> occurrence count. Unknown values are excluded.
    pub values: BTreeMap<String, u64>,
    /// Number of records examined.
    pub total: u64,
    /// Number of records with no value for the field.
    pub unknown_count: u64,
    /// `unknown_count / total` as a percentage, rounded to 2 decimals.
    pub unknown_percentage: f64,
}

impl FrequencyTable {
    /// Builds a table from its counts, deriving the unknown percentage.
    #[must_use]
    pub fn new(values: BTreeMap<String, u64>, total: u64, unknown_count: u64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let unknown_percentage = if total == 0 {
            0.0
        } else {
            round_to(unknown_count as f64 / total as f64 * 100.0, 2)
        };

        Self {
            values,
            total,
            unknown_count,
            unknown_percentage,
        }
    }

    /// A table for an empty record set.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), 0, 0)
    }

    /// Sum of the known value counts.
    #[must_use]
    pub fn known_count(&self) -> u64 {
        self.values.values().sum()
    }
}

/// A single fixed-width distance interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    /// Display label for the half-open range, e.g. `"0-1 km"`.
    pub label: String,
    /// Inclusive lower bound in km.
    pub start_km: f64,
    /// Exclusive upper bound in km.
    pub end_km: f64,
    /// Number of distances in this bin.
    pub count: u64,
}

/// Distances from the reference point, grouped into fixed-width bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceHistogram {
    /// Width of every bin in km.
    pub bin_width_km: f64,
    /// Bins ordered by distance, starting at 0.
    pub bins: Vec<HistogramBin>,
}

impl DistanceHistogram {
    /// Sum of all bin counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// A located record as plotted on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointSummary {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Geocoder display name.
    pub display_name: Option<String>,
    /// Raw submitted address.
    pub address: String,
    /// Distance to the reference point in km, rounded to 3 decimals.
    pub distance: f64,
}

/// Where the reference point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// The reference address was geocoded successfully.
    Geocoded,
    /// Geocoding failed; the fixed fallback point was used.
    Fallback,
}

/// The point all distances are measured from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// How the point was resolved.
    pub source: ReferenceSource,
    /// Geocoder display name, when geocoded.
    pub display_name: Option<String>,
}

impl ReferencePoint {
    /// The fixed fallback point used when reference geocoding fails.
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            lat: FALLBACK_LATITUDE,
            lon: FALLBACK_LONGITUDE,
            source: ReferenceSource::Fallback,
            display_name: None,
        }
    }

    /// A reference point resolved by the geocoder.
    #[must_use]
    pub fn geocoded(coordinates: Coordinates, display_name: Option<String>) -> Self {
        Self {
            lat: coordinates.latitude,
            lon: coordinates.longitude,
            source: ReferenceSource::Geocoded,
            display_name,
        }
    }

    /// The point as a coordinate pair.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lon, self.lat)
    }
}

/// Tunables for a single analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    /// Records at or under this distance (km) are "close".
    pub threshold_km: f64,
    /// Histogram bin width in km.
    pub bin_width_km: f64,
    /// Fields to build frequency tables for.
    pub fields: Vec<AddressField>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            threshold_km: DEFAULT_DISTANCE_THRESHOLD_KM,
            bin_width_km: DEFAULT_BIN_WIDTH_KM,
            fields: AddressField::ANALYZED.to_vec(),
        }
    }
}

/// Everything the dashboard needs for one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Reference point actually used.
    pub reference: ReferencePoint,
    /// Threshold applied for `close_points`, in km.
    pub distance_threshold: f64,
    /// Number of records examined.
    pub total_records: u64,
    /// Number of records with usable coordinates.
    pub located_records: u64,
    /// Per-field frequency tables.
    pub field_frequency: BTreeMap<AddressField, FrequencyTable>,
    /// Every located record with its distance.
    pub all_points: Vec<PointSummary>,
    /// Located records within the threshold.
    pub close_points: Vec<PointSummary>,
    /// Distribution of distances.
    pub histogram: DistanceHistogram,
}

/// Rounds `value` to `decimals` decimal places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
