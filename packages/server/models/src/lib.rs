#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the address map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

use address_map_address_models::{AddressField, ParsedAddress};
use address_map_analysis_models::AnalysisReport;
use address_map_database_models::{QueryDetail, QueryRow};
use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value, feature::Id};
use serde::{Deserialize, Serialize};

/// A stored address entry as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiQuery {
    /// Entry ID.
    pub id: i64,
    /// The address as submitted.
    pub address: String,
    /// Place name returned by the geocoder.
    pub display_name: Option<String>,
    /// Longitude, if geocoded.
    pub longitude: Option<f64>,
    /// Latitude, if geocoded.
    pub latitude: Option<f64>,
    /// Whether the address has been parsed.
    pub processed: bool,
    /// When the address was submitted (ISO 8601).
    pub created_at: DateTime<Utc>,
    /// Parsed components keyed by field name, if parsed.
    pub components: Option<ParsedAddress>,
}

impl From<QueryDetail> for ApiQuery {
    fn from(detail: QueryDetail) -> Self {
        let QueryDetail { query, components } = detail;
        Self {
            id: query.id,
            address: query.address,
            display_name: query.display_name,
            longitude: query.coordinates.map(|c| c.longitude),
            latitude: query.coordinates.map(|c| c.latitude),
            processed: query.processed,
            created_at: query.created_at,
            components,
        }
    }
}

/// Request body for submitting an address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAddressRequest {
    /// Free-text address.
    pub address: String,
}

/// Query parameters for the analysis endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQueryParams {
    /// Address distances are measured from.
    pub reference_address: Option<String>,
    /// Entries at or under this distance (km) count as close.
    pub distance_threshold: Option<f64>,
    /// Histogram bin width in km.
    pub bin_width: Option<f64>,
    /// Comma-separated field names to tabulate.
    pub fields: Option<String>,
}

/// Analysis response: the report plus the inputs that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAnalysis {
    /// The computed report.
    #[serde(flatten)]
    pub report: AnalysisReport,
    /// Reference address as requested.
    pub reference_address: String,
    /// Histogram bin width used, in km.
    pub bin_width: f64,
    /// Fields that were tabulated.
    pub fields: Vec<AddressField>,
    /// Every field a client may request.
    pub fields_available: Vec<AddressField>,
    /// Field a dashboard should chart first.
    pub default_field: AddressField,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with every non-success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Builds a `GeoJSON` `FeatureCollection` with one point per geocoded row.
///
/// Each feature carries the entry ID and `displayName` / `query`
/// properties. Rows without coordinates are left out.
#[must_use]
pub fn points_collection<'a>(rows: impl IntoIterator<Item = &'a QueryRow>) -> FeatureCollection {
    let features = rows
        .into_iter()
        .filter_map(|row| {
            let coords = row.coordinates?;

            let mut properties = JsonObject::new();
            properties.insert(
                "displayName".to_string(),
                row.display_name
                    .as_ref()
                    .map_or(serde_json::Value::Null, |n| n.clone().into()),
            );
            properties.insert("query".to_string(), row.address.clone().into());

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    coords.longitude,
                    coords.latitude,
                ]))),
                id: Some(Id::Number(row.id.into())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use address_map_address_models::Coordinates;
    use chrono::TimeZone;

    use super::*;

    fn row(id: i64, coordinates: Option<Coordinates>) -> QueryRow {
        QueryRow {
            id,
            address: format!("Ferhadija {id}"),
            display_name: Some("Ferhadija, Sarajevo".to_string()),
            coordinates,
            processed: false,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn api_query_serializes_camel_case() {
        let mut components = ParsedAddress::new();
        components.insert(AddressField::HouseNumber, "12");
        let api = ApiQuery::from(QueryDetail {
            query: row(3, Some(Coordinates::new(18.43, 43.86))),
            components: Some(components),
        });

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["displayName"], "Ferhadija, Sarajevo");
        assert_eq!(json["longitude"], 18.43);
        assert_eq!(json["latitude"], 43.86);
        assert_eq!(json["components"]["house_number"], "12");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn points_skip_ungeocoded_rows() {
        let rows = [
            row(1, Some(Coordinates::new(18.43, 43.86))),
            row(2, None),
        ];
        let collection = points_collection(&rows);
        assert_eq!(collection.features.len(), 1);

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        let feature = &json["features"][0];
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"][0], 18.43);
        assert_eq!(feature["geometry"]["coordinates"][1], 43.86);
        assert_eq!(feature["properties"]["query"], "Ferhadija 1");
        assert_eq!(feature["properties"]["displayName"], "Ferhadija, Sarajevo");
        assert_eq!(feature["id"], 1);
    }

    #[test]
    fn analysis_params_accept_camel_case() {
        let params: AnalysisQueryParams = serde_json::from_str(
            r#"{"referenceAddress":"Baščaršija","distanceThreshold":1.5,"binWidth":0.5,"fields":"city,road"}"#,
        )
        .unwrap();
        assert_eq!(params.reference_address.as_deref(), Some("Baščaršija"));
        assert_eq!(params.distance_threshold, Some(1.5));
        assert_eq!(params.bin_width, Some(0.5));
        assert_eq!(params.fields.as_deref(), Some("city,road"));
    }
}
