//! Fixed-width distance histogram.
//!
//! Bins run from 0 up to the largest observed distance. The bin count is
//! `floor(max / width) + 1`, so a distance exactly equal to the maximum
//! always has a bin; the index is still clamped to the last bin to absorb
//! floating-point edge cases.

use address_map_analysis_models::{DistanceHistogram, HistogramBin, round_to};

use crate::AnalysisError;

/// Upper bound on the number of bins a single histogram may allocate.
pub const MAX_BINS: usize = 100_000;

/// Groups `distances` (km) into bins of `bin_width_km`.
///
/// An empty input yields a single zero-count bin.
///
/// # Errors
///
/// * [`AnalysisError::InvalidBinWidth`] if the width is not a positive,
///   finite number.
/// * [`AnalysisError::TooManyBins`] if the distances and width would need
///   more than [`MAX_BINS`] bins.
pub fn distance_histogram(
    distances: &[f64],
    bin_width_km: f64,
) -> Result<DistanceHistogram, AnalysisError> {
    if !bin_width_km.is_finite() || bin_width_km <= 0.0 {
        return Err(AnalysisError::InvalidBinWidth {
            value: bin_width_km,
        });
    }

    let max_dist = distances.iter().copied().fold(0.0_f64, f64::max);
    let span = (max_dist / bin_width_km).floor();

    #[allow(clippy::cast_precision_loss)]
    let max_bins = MAX_BINS as f64;
    if span >= max_bins {
        return Err(AnalysisError::TooManyBins {
            max_distance_km: max_dist,
            bin_width_km,
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_bins = span as usize + 1;

    let mut counts = vec![0u64; num_bins];
    for d in distances {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = ((d / bin_width_km).floor() as usize).min(num_bins - 1);
        counts[idx] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            #[allow(clippy::cast_precision_loss)]
            let start_km = round_to(i as f64 * bin_width_km, 6);
            #[allow(clippy::cast_precision_loss)]
            let end_km = round_to((i + 1) as f64 * bin_width_km, 6);
            HistogramBin {
                label: format!("{start_km}-{end_km} km"),
                start_km,
                end_km,
                count,
            }
        })
        .collect();

    Ok(DistanceHistogram {
        bin_width_km,
        bins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(h: &DistanceHistogram) -> Vec<&str> {
        h.bins.iter().map(|b| b.label.as_str()).collect()
    }

    fn counts(h: &DistanceHistogram) -> Vec<u64> {
        h.bins.iter().map(|b| b.count).collect()
    }

    #[test]
    fn max_distance_lands_in_last_bin() {
        let h = distance_histogram(&[0.5, 1.2, 1.9, 3.0], 1.0).unwrap();
        assert_eq!(labels(&h), vec!["0-1 km", "1-2 km", "2-3 km", "3-4 km"]);
        assert_eq!(counts(&h), vec![1, 2, 0, 1]);
        assert_eq!(h.total(), 4);
    }

    #[test]
    fn empty_input_is_single_zero_bin() {
        let h = distance_histogram(&[], 1.0).unwrap();
        assert_eq!(labels(&h), vec!["0-1 km"]);
        assert_eq!(counts(&h), vec![0]);
    }

    #[test]
    fn all_zero_distances_are_counted() {
        let h = distance_histogram(&[0.0, 0.0], 1.0).unwrap();
        assert_eq!(counts(&h), vec![2]);
    }

    #[test]
    fn fractional_bin_width_labels() {
        let h = distance_histogram(&[0.1, 0.35, 0.7], 0.25).unwrap();
        assert_eq!(
            labels(&h),
            vec!["0-0.25 km", "0.25-0.5 km", "0.5-0.75 km"]
        );
        assert_eq!(counts(&h), vec![1, 1, 1]);
    }

    #[test]
    fn repeating_decimal_bin_width_labels_are_rounded() {
        let h = distance_histogram(&[0.35], 0.1).unwrap();
        assert_eq!(h.bins[3].label, "0.3-0.4 km");
        assert_eq!(h.total(), 1);
    }

    #[test]
    fn sum_of_bins_matches_input_length() {
        let distances: Vec<f64> = (0..250).map(|i| f64::from(i) * 0.137).collect();
        let h = distance_histogram(&distances, 2.0).unwrap();
        assert_eq!(h.total(), 250);
    }

    #[test]
    fn rejects_non_positive_bin_width() {
        assert!(matches!(
            distance_histogram(&[1.0], 0.0),
            Err(AnalysisError::InvalidBinWidth { .. })
        ));
        assert!(matches!(
            distance_histogram(&[1.0], -1.0),
            Err(AnalysisError::InvalidBinWidth { .. })
        ));
        assert!(matches!(
            distance_histogram(&[1.0], f64::NAN),
            Err(AnalysisError::InvalidBinWidth { .. })
        ));
    }

    #[test]
    fn rejects_excessive_bin_count() {
        assert!(matches!(
            distance_histogram(&[20_000.0], 0.000_001),
            Err(AnalysisError::TooManyBins { .. })
        ));
    }
}
