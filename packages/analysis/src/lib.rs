#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geo-analysis aggregator for stored address records.
//!
//! Given a reference point and the full set of records, [`analyze`]
//! computes per-field frequency tables, the haversine distance from every
//! located record to the reference, the subset of records within a
//! distance threshold, and a fixed-width histogram of those distances.
//!
//! Everything here is pure: no I/O, no shared state, and the input
//! records are never modified.

pub mod distance;
pub mod frequency;
pub mod histogram;

use address_map_address_models::AddressRecord;
use address_map_analysis_models::{
    AnalysisParams, AnalysisReport, PointSummary, ReferencePoint, round_to,
};
use thiserror::Error;

pub use distance::haversine_km;
pub use frequency::{field_frequencies, field_frequency};
pub use histogram::distance_histogram;

/// Errors from invalid analysis parameters.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Threshold was negative or not a finite number.
    #[error("Invalid distance threshold: {value} (expected a non-negative number)")]
    InvalidThreshold {
        /// The rejected value.
        value: f64,
    },

    /// Bin width was zero, negative, or not a finite number.
    #[error("Invalid bin width: {value} (expected a positive number)")]
    InvalidBinWidth {
        /// The rejected value.
        value: f64,
    },

    /// The histogram would need an unreasonable number of bins.
    #[error("Bin width {bin_width_km} km is too small for a maximum distance of {max_distance_km} km")]
    TooManyBins {
        /// Largest observed distance.
        max_distance_km: f64,
        /// Requested bin width.
        bin_width_km: f64,
    },
}

/// Checks the threshold and bin width without looking at any records.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidThreshold`] or
/// [`AnalysisError::InvalidBinWidth`].
pub fn validate_params(params: &AnalysisParams) -> Result<(), AnalysisError> {
    if !params.threshold_km.is_finite() || params.threshold_km < 0.0 {
        return Err(AnalysisError::InvalidThreshold {
            value: params.threshold_km,
        });
    }
    if !params.bin_width_km.is_finite() || params.bin_width_km <= 0.0 {
        return Err(AnalysisError::InvalidBinWidth {
            value: params.bin_width_km,
        });
    }
    Ok(())
}

/// Runs the full analysis over `records` relative to `reference`.
///
/// Records without usable coordinates are counted in the frequency
/// tables but excluded from every distance-based output. Thresholding and
/// binning use the exact distance; only the reported per-point distance is
/// rounded.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the threshold or bin width is invalid, or
/// if the histogram would need more than [`histogram::MAX_BINS`] bins.
pub fn analyze(
    records: &[AddressRecord],
    reference: &ReferencePoint,
    params: &AnalysisParams,
) -> Result<AnalysisReport, AnalysisError> {
    validate_params(params)?;

    let field_frequency = field_frequencies(records, &params.fields);

    let origin = reference.coordinates();
    let mut distances = Vec::new();
    let mut all_points = Vec::new();
    let mut close_points = Vec::new();

    for record in records {
        let Some(coords) = record.coordinates.filter(|c| c.is_valid()) else {
            continue;
        };

        let dist = haversine_km(origin, coords);
        distances.push(dist);

        let point = PointSummary {
            lat: coords.latitude,
            lon: coords.longitude,
            display_name: record.display_name.clone(),
            address: record.address.clone(),
            distance: round_to(dist, 3),
        };

        if dist <= params.threshold_km {
            close_points.push(point.clone());
        }
        all_points.push(point);
    }

    let histogram = distance_histogram(&distances, params.bin_width_km)?;

    log::debug!(
        "Analyzed {} records ({} located, {} within {} km)",
        records.len(),
        all_points.len(),
        close_points.len(),
        params.threshold_km
    );

    Ok(AnalysisReport {
        reference: reference.clone(),
        distance_threshold: params.threshold_km,
        total_records: records.len() as u64,
        located_records: all_points.len() as u64,
        field_frequency,
        all_points,
        close_points,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use address_map_address_models::{AddressField, Coordinates, ParsedAddress};
    use address_map_analysis_models::FrequencyTable;

    use super::*;

    fn record(id: i64, coords: Option<(f64, f64)>, city: Option<&str>) -> AddressRecord {
        let mut components = ParsedAddress::new();
        if let Some(city) = city {
            components.insert(AddressField::City, city);
        }
        AddressRecord {
            id,
            address: format!("address {id}"),
            display_name: Some(format!("display {id}")),
            coordinates: coords.map(|(lon, lat)| Coordinates::new(lon, lat)),
            components: Some(components),
        }
    }

    #[test]
    fn empty_record_set() {
        let report = analyze(&[], &ReferencePoint::fallback(), &AnalysisParams::default()).unwrap();

        assert_eq!(report.total_records, 0);
        assert_eq!(report.located_records, 0);
        assert!(report.all_points.is_empty());
        assert!(report.close_points.is_empty());
        assert_eq!(report.histogram.bins.len(), 1);
        assert_eq!(report.histogram.bins[0].label, "0-1 km");
        assert_eq!(report.histogram.bins[0].count, 0);
        assert_eq!(report.field_frequency.len(), AddressField::ANALYZED.len());
        for table in report.field_frequency.values() {
            assert_eq!(table, &FrequencyTable::empty());
        }
    }

    #[test]
    fn record_at_reference_is_close_with_zero_threshold() {
        let reference = ReferencePoint::fallback();
        let records = vec![record(1, Some((18.4131, 43.8563)), Some("sarajevo"))];
        let params = AnalysisParams {
            threshold_km: 0.0,
            ..AnalysisParams::default()
        };

        let report = analyze(&records, &reference, &params).unwrap();
        assert_eq!(report.close_points.len(), 1);
        assert!(report.close_points[0].distance.abs() < f64::EPSILON);
        assert_eq!(report.histogram.total(), 1);
    }

    #[test]
    fn unlocated_records_count_in_frequencies_only() {
        let records = vec![
            record(1, Some((18.4131, 43.8563)), Some("sarajevo")),
            record(2, None, Some("sarajevo")),
            record(3, Some((f64::NAN, 43.0)), None),
        ];

        let report =
            analyze(&records, &ReferencePoint::fallback(), &AnalysisParams::default()).unwrap();

        assert_eq!(report.total_records, 3);
        assert_eq!(report.located_records, 1);
        assert_eq!(report.all_points.len(), 1);
        assert_eq!(report.histogram.total(), 1);

        let city = &report.field_frequency[&AddressField::City];
        assert_eq!(city.total, 3);
        assert_eq!(city.unknown_count, 1);
        assert_eq!(city.values.get("sarajevo"), Some(&2));
    }

    #[test]
    fn threshold_splits_points_and_rounds_distances() {
        let reference = ReferencePoint::fallback();
        // ~1.1 km and ~75 km from the reference.
        let records = vec![
            record(1, Some((18.4131, 43.8663)), None),
            record(2, Some((17.8078, 43.3438)), None),
        ];
        let params = AnalysisParams {
            threshold_km: 2.0,
            ..AnalysisParams::default()
        };

        let report = analyze(&records, &reference, &params).unwrap();
        assert_eq!(report.all_points.len(), 2);
        assert_eq!(report.close_points.len(), 1);
        assert_eq!(report.close_points[0].address, "address 1");
        assert!((report.close_points[0].distance - 1.112).abs() < 1e-9);
        assert!((report.all_points[1].distance - 74.988).abs() < 1e-9);
        assert_eq!(report.histogram.bins.len(), 75);
        assert_eq!(report.histogram.bins[1].count, 1);
        assert_eq!(report.histogram.bins[74].count, 1);
    }

    #[test]
    fn frequency_invariant_holds_for_every_field() {
        let records = vec![
            record(1, Some((18.40, 43.85)), Some("sarajevo")),
            record(2, Some((18.41, 43.86)), Some("")),
            record(3, None, None),
            record(4, Some((18.42, 43.87)), Some("ilidza")),
        ];
        let params = AnalysisParams {
            fields: AddressField::ALL.to_vec(),
            ..AnalysisParams::default()
        };

        let report = analyze(&records, &ReferencePoint::fallback(), &params).unwrap();
        assert_eq!(report.field_frequency.len(), AddressField::ALL.len());
        for table in report.field_frequency.values() {
            assert_eq!(table.known_count() + table.unknown_count, table.total);
            assert!(!table.values.contains_key(""));
        }
    }

    #[test]
    fn rejects_negative_threshold() {
        let params = AnalysisParams {
            threshold_km: -1.0,
            ..AnalysisParams::default()
        };
        assert!(matches!(
            analyze(&[], &ReferencePoint::fallback(), &params),
            Err(AnalysisError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn threshold_and_bins_use_unrounded_distance() {
        // Both distances round to 1.000 km: ~0.99964 km and ~1.00042 km.
        let records = vec![
            record(1, Some((18.4131, 43.86529)), None),
            record(2, Some((18.4131, 43.865_297)), None),
        ];
        let params = AnalysisParams {
            threshold_km: 1.0,
            bin_width_km: 1.0,
            ..AnalysisParams::default()
        };

        let report = analyze(&records, &ReferencePoint::fallback(), &params).unwrap();

        assert!((report.all_points[0].distance - 1.0).abs() < 1e-9);
        assert!((report.all_points[1].distance - 1.0).abs() < 1e-9);
        assert_eq!(report.close_points.len(), 1);
        assert_eq!(report.close_points[0].address, "address 1");
        assert_eq!(report.histogram.bins.len(), 2);
        assert_eq!(report.histogram.bins[0].label, "0-1 km");
        assert_eq!(report.histogram.bins[0].count, 1);
        assert_eq!(report.histogram.bins[1].count, 1);
    }

    #[test]
    fn validate_params_rejects_bad_bin_width() {
        for bin_width_km in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let params = AnalysisParams {
                bin_width_km,
                ..AnalysisParams::default()
            };
            assert!(matches!(
                validate_params(&params),
                Err(AnalysisError::InvalidBinWidth { .. })
            ));
        }
        assert!(validate_params(&AnalysisParams::default()).is_ok());
    }

    #[test]
    fn too_fine_bins_for_far_points_are_rejected() {
        // Sarajevo to roughly Cape Town, ~7200 km.
        let records = vec![record(1, Some((18.4241, -33.9249)), Some("cape town"))];
        let params = AnalysisParams {
            bin_width_km: 0.05,
            ..AnalysisParams::default()
        };

        assert!(matches!(
            analyze(&records, &ReferencePoint::fallback(), &params),
            Err(AnalysisError::TooManyBins { .. })
        ));

        let coarse = AnalysisParams {
            bin_width_km: 1.0,
            ..AnalysisParams::default()
        };
        let report = analyze(&records, &ReferencePoint::fallback(), &coarse).unwrap();
        assert_eq!(report.histogram.total(), 1);
    }

    #[test]
    fn reports_the_reference_used() {
        let reference =
            ReferencePoint::geocoded(Coordinates::new(18.0, 44.0), Some("Somewhere".to_string()));
        let report = analyze(&[], &reference, &AnalysisParams::default()).unwrap();
        assert_eq!(report.reference, reference);
    }
}
