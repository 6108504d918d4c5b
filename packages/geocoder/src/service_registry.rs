//! Compile-time registry of geocoding and parsing service configurations.
//!
//! Each external service is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`], [`enabled_services`], and the typed accessors
//! [`nominatim_config`] / [`libpostal_config`].
//!
//! The base URL of each service can be overridden at runtime with the
//! `NOMINATIM_URL` and `LIBPOSTAL_URL` environment variables.

use serde::Deserialize;

/// An external service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    /// Unique identifier (e.g., `"nominatim"`, `"libpostal"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ordering hint; lower values are listed first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` free-form search.
    Nominatim(NominatimConfig),
    /// libpostal REST address parser.
    Libpostal(LibpostalConfig),
}

/// Settings for the Nominatim geocoder.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimConfig {
    /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub base_url: String,
    /// Bounding box `west,south,east,north` that results are restricted to.
    pub viewbox: Option<String>,
    /// Whether results outside `viewbox` are discarded.
    #[serde(default)]
    pub bounded: bool,
    /// `User-Agent` header (required by the public instance's usage policy).
    pub user_agent: String,
    /// `Accept-Language` header controlling display name language.
    pub accept_language: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum delay between requests in milliseconds.
    #[serde(default)]
    pub rate_limit_ms: u64,
}

/// Settings for the libpostal REST parser.
#[derive(Debug, Clone, Deserialize)]
pub struct LibpostalConfig {
    /// Service root (e.g., `"http://localhost:8081"`).
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    10
}

impl ServiceDefinition {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim(cfg) => &cfg.base_url,
            ProviderConfig::Libpostal(cfg) => &cfg.base_url,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("libpostal", include_str!("../services/libpostal.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<ServiceDefinition> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<ServiceDefinition> {
    let mut services: Vec<ServiceDefinition> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Returns the Nominatim configuration, applying the `NOMINATIM_URL`
/// override.
#[must_use]
pub fn nominatim_config() -> Option<NominatimConfig> {
    let mut cfg = enabled_services()
        .into_iter()
        .find_map(|s| match s.provider {
            ProviderConfig::Nominatim(cfg) => Some(cfg),
            ProviderConfig::Libpostal(_) => None,
        })?;

    if let Some(url) = env_override("NOMINATIM_URL") {
        cfg.base_url = url;
    }
    Some(cfg)
}

/// Returns the libpostal configuration, applying the `LIBPOSTAL_URL`
/// override.
#[must_use]
pub fn libpostal_config() -> Option<LibpostalConfig> {
    let mut cfg = enabled_services()
        .into_iter()
        .find_map(|s| match s.provider {
            ProviderConfig::Libpostal(cfg) => Some(cfg),
            ProviderConfig::Nominatim(_) => None,
        })?;

    if let Some(url) = env_override("LIBPOSTAL_URL") {
        cfg.base_url = url;
    }
    Some(cfg)
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(
                !svc.base_url().is_empty(),
                "Service {} has empty base_url",
                svc.id
            );
        }
    }

    #[test]
    fn enabled_services_sorted_by_priority() {
        let services = enabled_services();
        for window in services.windows(2) {
            assert!(
                window[0].priority <= window[1].priority,
                "Services not sorted by priority: {} ({}) > {} ({})",
                window[0].id,
                window[0].priority,
                window[1].id,
                window[1].priority
            );
        }
    }

    #[test]
    fn nominatim_is_bounded_to_sarajevo() {
        let svc = all_services()
            .into_iter()
            .find(|s| s.id == "nominatim")
            .unwrap();
        let ProviderConfig::Nominatim(cfg) = svc.provider else {
            panic!("nominatim service has wrong provider type");
        };
        assert_eq!(
            cfg.viewbox.as_deref(),
            Some("18.248778,43.749099,18.473310,43.903187")
        );
        assert!(cfg.bounded);
        assert_eq!(cfg.user_agent, "Address-Data");
        assert_eq!(cfg.timeout_secs, 10);
    }
}
