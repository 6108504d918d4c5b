//! Per-field value frequency counting.

use std::collections::BTreeMap;

use address_map_address_models::{AddressField, AddressRecord};
use address_map_analysis_models::FrequencyTable;

/// Counts the values of `field` across `records`.
///
/// Records without components, and records whose value is empty, are
/// counted as unknown and excluded from the emitted value map.
#[must_use]
pub fn field_frequency(records: &[AddressRecord], field: AddressField) -> FrequencyTable {
    let mut values: BTreeMap<String, u64> = BTreeMap::new();
    let mut total = 0u64;
    let mut unknown_count = 0u64;

    for record in records {
        total += 1;
        match record.field_value(field) {
            Some(value) => *values.entry(value.to_string()).or_insert(0) += 1,
            None => unknown_count += 1,
        }
    }

    FrequencyTable::new(values, total, unknown_count)
}

/// Builds a frequency table for every field in `fields`.
///
/// Duplicate fields collapse into a single entry.
#[must_use]
pub fn field_frequencies(
    records: &[AddressRecord],
    fields: &[AddressField],
) -> BTreeMap<AddressField, FrequencyTable> {
    fields
        .iter()
        .map(|field| (*field, field_frequency(records, *field)))
        .collect()
}
