//! Plain-text rendering of stored entries and analysis reports for the
//! terminal.

use std::fmt::Write as _;

use address_map_analysis_models::{AnalysisReport, ReferenceSource};
use address_map_database_models::{QueryDetail, QueryRow};

/// Widest bar drawn in the histogram.
const MAX_BAR_WIDTH: u64 = 40;

/// Formats stored entries as a table, one per line.
#[must_use]
pub fn format_queries(rows: &[QueryRow]) -> String {
    let mut out = format!(
        "{:<6} {:<10} {:<24} ADDRESS\n{}\n",
        "ID",
        "PARSED",
        "COORDINATES (LON, LAT)",
        "-".repeat(72)
    );
    for row in rows {
        let coords = row
            .coordinates
            .map_or_else(|| "-".to_string(), |c| c.to_lon_lat_string());
        let _ = writeln!(
            out,
            "{:<6} {:<10} {:<24} {}",
            row.id,
            if row.processed { "yes" } else { "no" },
            coords,
            row.address
        );
    }
    out
}

/// Formats a single entry with its parsed components.
#[must_use]
pub fn format_detail(detail: &QueryDetail) -> String {
    let query = &detail.query;
    let mut out = format!("#{} {}\n", query.id, query.address);
    let _ = writeln!(
        out,
        "  submitted:   {}",
        query.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        out,
        "  coordinates: {}",
        query
            .coordinates
            .map_or_else(|| "not geocoded".to_string(), |c| c.to_lon_lat_string())
    );
    if let Some(name) = &query.display_name {
        let _ = writeln!(out, "  place:       {name}");
    }

    match &detail.components {
        Some(components) if !components.is_empty() => {
            let _ = writeln!(out, "  components:");
            for (field, value) in components.iter() {
                let _ = writeln!(out, "    {:<15} {value}", field.as_ref());
            }
        }
        Some(_) => {
            let _ = writeln!(out, "  components:  none found");
        }
        None => {
            let _ = writeln!(out, "  components:  not parsed");
        }
    }
    out
}

/// Formats an analysis report: reference, counts, per-field frequencies
/// and the distance histogram.
#[must_use]
pub fn format_report(reference_address: &str, report: &AnalysisReport) -> String {
    let reference = &report.reference;
    let source = match reference.source {
        ReferenceSource::Geocoded => "geocoded",
        ReferenceSource::Fallback => "fallback",
    };

    let mut out = format!(
        "Reference: {reference_address:?} -> {:.5}, {:.5} ({source})\n",
        reference.lat, reference.lon
    );
    let _ = writeln!(
        out,
        "Records:   {} total, {} located, {} within {} km",
        report.total_records,
        report.located_records,
        report.close_points.len(),
        report.distance_threshold
    );

    for (field, table) in &report.field_frequency {
        let _ = writeln!(
            out,
            "\n{} ({} unknown, {:.2}%)",
            field.as_ref(),
            table.unknown_count,
            table.unknown_percentage
        );
        let mut values: Vec<(&String, &u64)> = table.values.iter().collect();
        values.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (value, count) in values {
            let _ = writeln!(out, "  {value:<32} {count}");
        }
    }

    let histogram = &report.histogram;
    let peak = histogram.bins.iter().map(|b| b.count).max().unwrap_or(0);
    let _ = writeln!(
        out,
        "\nDistance histogram ({} km bins)",
        histogram.bin_width_km
    );
    for bin in &histogram.bins {
        let width = if peak == 0 {
            0
        } else {
            bin.count * MAX_BAR_WIDTH / peak
        };
        let _ = writeln!(
            out,
            "  {:<16} {:<40} {}",
            bin.label,
            "#".repeat(usize::try_from(width).unwrap_or(0)),
            bin.count
        );
    }

    out
}
