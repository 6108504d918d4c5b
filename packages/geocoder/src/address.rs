//! Free-text address preparation for geocoding.
//!
//! Users submit addresses in whatever shape they like:
//! - Plain text: `"Ferhadija 12, Sarajevo"`
//! - Padded or multi-spaced: `"  Titova   5 "`
//! - A pasted map coordinate in `lat, lon` order: `"43.8563, 18.4131"`
//!
//! This module normalizes these into the query string sent to Nominatim.

use regex::Regex;
use std::sync::LazyLock;

/// Regex for a `lat, lon` coordinate pair pasted as the address.
static GEOMETRY_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?\d*\.\d+,\s*[-+]?\d*\.\d+$").expect("valid regex")
});

/// Regex for runs of whitespace inside an address.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Result of preparing a free-text address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedQuery {
    /// Free text, whitespace-normalized.
    Text(String),
    /// A coordinate pair, rewritten into the `lon,lat` order Nominatim
    /// expects for a free-form point query.
    Point(String),
    /// Nothing left to geocode.
    Empty,
}

impl PreparedQuery {
    /// The query string to send, if any.
    #[must_use]
    pub fn as_query(&self) -> Option<&str> {
        match self {
            Self::Text(q) | Self::Point(q) => Some(q),
            Self::Empty => None,
        }
    }
}

/// Whether `query` is a bare `lat, lon` coordinate pair.
#[must_use]
pub fn is_geometry_point(query: &str) -> bool {
    GEOMETRY_POINT_RE.is_match(query)
}

/// Normalizes a submitted address into a geocoder query.
#[must_use]
pub fn prepare_query(raw: &str) -> PreparedQuery {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PreparedQuery::Empty;
    }

    if is_geometry_point(trimmed) {
        let mut parts = trimmed.split(',').map(str::trim);
        if let (Some(lat), Some(lon)) = (parts.next(), parts.next()) {
            return PreparedQuery::Point(format!("{lon},{lat}"));
        }
    }

    PreparedQuery::Text(WHITESPACE_RE.replace_all(trimmed, " ").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_address() {
        assert_eq!(
            prepare_query("Ferhadija 12, Sarajevo"),
            PreparedQuery::Text("Ferhadija 12, Sarajevo".to_string())
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(
            prepare_query("  Titova   5\tSarajevo "),
            PreparedQuery::Text("Titova 5 Sarajevo".to_string())
        );
    }

    #[test]
    fn swaps_lat_lon_point() {
        assert_eq!(
            prepare_query("43.8563, 18.4131"),
            PreparedQuery::Point("18.4131,43.8563".to_string())
        );
    }

    #[test]
    fn swaps_signed_point_without_space() {
        assert_eq!(
            prepare_query(" -33.8688,+151.2093 "),
            PreparedQuery::Point("+151.2093,-33.8688".to_string())
        );
    }

    #[test]
    fn integer_pair_is_not_a_point() {
        assert!(!is_geometry_point("43, 18"));
        assert_eq!(
            prepare_query("43, 18"),
            PreparedQuery::Text("43, 18".to_string())
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(prepare_query("   "), PreparedQuery::Empty);
        assert_eq!(PreparedQuery::Empty.as_query(), None);
    }
}
