#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding and address-parsing clients for submitted addresses.
//!
//! Two external services are involved, each configured via a TOML file in
//! `services/`:
//!
//! 1. **Nominatim / OpenStreetMap**: free-form search restricted to a
//!    bounding box, 1 req/sec on the public instance. Implements
//!    [`Geocoder`].
//! 2. **libpostal** (REST wrapper): splits a free-text address into
//!    labeled components. Implements [`AddressParser`].
//!
//! Both sit behind traits so the pipeline and server can run against
//! in-process fakes.

pub mod address;
pub mod libpostal;
pub mod nominatim;
pub mod service_registry;

use address_map_address_models::{Coordinates, ParsedAddress};
use async_trait::async_trait;
use thiserror::Error;

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The canonical place name returned by the geocoder.
    pub display_name: Option<String>,
}

impl GeocodedAddress {
    /// The result position as a coordinate pair.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.longitude, self.latitude)
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (connection, timeout, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Geocoder returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// No usable service configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

/// Errors from address-parsing operations.
#[derive(Debug, Error)]
pub enum ParseError {
    /// HTTP request failed (connection, timeout, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Parser returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// No usable service configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

/// Resolves a free-text address to a position.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocodes `address`.
    ///
    /// Returns `Ok(None)` when the service found nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response handling fails.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// Splits a free-text address into labeled components.
#[async_trait]
pub trait AddressParser: Send + Sync {
    /// Parses `address`. Components the parser did not find are unset.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the request or response handling fails.
    async fn parse(&self, address: &str) -> Result<ParsedAddress, ParseError>;
}
