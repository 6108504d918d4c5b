//! Nominatim / OpenStreetMap geocoder client.
//!
//! Searches are free-form (`q=`) and restricted to the configured
//! `viewbox`. Nominatim's public instance allows **1 request per second**;
//! callers that geocode in bulk should sleep [`NominatimGeocoder::rate_limit`]
//! between calls.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;

use crate::address::prepare_query;
use crate::service_registry::{NominatimConfig, nominatim_config};
use crate::{GeocodeError, GeocodedAddress, Geocoder};

/// [`Geocoder`] backed by a Nominatim search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    config: NominatimConfig,
}

impl NominatimGeocoder {
    /// Builds a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: NominatimConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Builds a client from the embedded service registry.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if no Nominatim service is enabled,
    /// or [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_registry() -> Result<Self, GeocodeError> {
        let config = nominatim_config().ok_or_else(|| GeocodeError::Config {
            message: "No enabled Nominatim service".to_string(),
        })?;
        Self::new(config)
    }

    /// Minimum delay between consecutive requests.
    #[must_use]
    pub const fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.config.rate_limit_ms)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let prepared = prepare_query(address);
        let Some(query) = prepared.as_query() else {
            return Ok(None);
        };
        geocode_freeform(&self.client, &self.config, query).await
    }
}

/// Builds the query string parameters for a free-form search.
#[must_use]
pub fn search_params<'a>(config: &'a NominatimConfig, query: &'a str) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![
        ("q", query),
        ("format", "json"),
        ("addressdetails", "1"),
        ("limit", "1"),
    ];
    if let Some(viewbox) = config.viewbox.as_deref() {
        params.push(("viewbox", viewbox));
        if config.bounded {
            params.push(("bounded", "1"));
        }
    }
    params
}

/// Geocodes a free-form query using Nominatim.
///
/// The caller is responsible for rate limiting (see `rate_limit_ms` in the
/// service TOML configuration).
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    config: &NominatimConfig,
    query: &str,
) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let mut req = client
        .get(&config.base_url)
        .query(&search_params(config, query));

    if let Some(lang) = config.accept_language.as_deref() {
        req = req.header(reqwest::header::ACCEPT_LANGUAGE, lang);
    }

    let resp = req.send().await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    if !resp.status().is_success() {
        return Err(GeocodeError::Status {
            status: resp.status().as_u16(),
        });
    }

    let body: serde_json::Value = resp.json().await?;
    let result = parse_response(&body)?;

    if result.is_none() {
        log::debug!("Nominatim found no match for {query:?}");
    }

    Ok(result)
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        display_name,
    }))
}
