//! libpostal address parser client.
//!
//! Talks to a libpostal REST wrapper (e.g. `libpostal-rest`), which
//! exposes `POST /parser` taking `{"query": "..."}` and returning a list of
//! `{"label": "...", "value": "..."}` pairs in input order.
//!
//! See <https://github.com/openvenues/libpostal#parser-labels>

use std::time::Duration;

use address_map_address_models::{AddressField, ParsedAddress};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::service_registry::{LibpostalConfig, libpostal_config};
use crate::{AddressParser, ParseError};

#[derive(Serialize)]
struct ParserRequest<'a> {
    query: &'a str,
}

/// One labeled span of the input as returned by libpostal.
#[derive(Debug, Clone, Deserialize)]
pub struct LabeledComponent {
    /// Parser label (e.g. `"house_number"`).
    pub label: String,
    /// The matched span of the input.
    pub value: String,
}

/// [`AddressParser`] backed by a libpostal REST service.
#[derive(Debug, Clone)]
pub struct LibpostalParser {
    client: reqwest::Client,
    endpoint: String,
}

impl LibpostalParser {
    /// Builds a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &LibpostalConfig) -> Result<Self, ParseError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let endpoint = format!("{}/parser", config.base_url.trim_end_matches('/'));
        Ok(Self { client, endpoint })
    }

    /// Builds a client from the embedded service registry.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Config`] if no libpostal service is enabled,
    /// or [`ParseError::Http`] if the HTTP client cannot be built.
    pub fn from_registry() -> Result<Self, ParseError> {
        let config = libpostal_config().ok_or_else(|| ParseError::Config {
            message: "No enabled libpostal service".to_string(),
        })?;
        Self::new(&config)
    }
}

#[async_trait]
impl AddressParser for LibpostalParser {
    async fn parse(&self, address: &str) -> Result<ParsedAddress, ParseError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(ParsedAddress::new());
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&ParserRequest { query: address })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ParseError::Status {
                status: resp.status().as_u16(),
            });
        }

        let labeled: Vec<LabeledComponent> = resp.json().await?;
        Ok(components_from_labels(labeled))
    }
}

/// Folds libpostal's labeled spans into a [`ParsedAddress`].
///
/// Labels outside the known [`AddressField`] set are skipped. When a label
/// repeats, the last span wins.
#[must_use]
pub fn components_from_labels(labeled: Vec<LabeledComponent>) -> ParsedAddress {
    let mut parsed = ParsedAddress::new();
    for LabeledComponent { label, value } in labeled {
        match label.parse::<AddressField>() {
            Ok(field) => parsed.insert(field, value),
            Err(_) => log::debug!("Skipping unknown libpostal label {label:?}"),
        }
    }
    parsed
}
