//! License diffing between two snapshots of the same database.

use std::collections::{BTreeMap, HashMap};

use ercole_common::types::{License, LicenseType};

/// License types for the base database editions. Activating one of them is
/// always a new license, never a new option, whatever the catalog says.
pub const BASE_EDITION_LICENSE_TYPE_IDS: [&str; 2] = [
    // Oracle Database Enterprise Edition
    "A90611",
    // Oracle Database Standard Edition 2
    "B90878",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffFeature {
    Activated,
    Deactivated,
    Unchanged,
}

/// Classification of every license type seen in either list, keyed by
/// license-type id. Ordered so that alerts come out deterministically.
pub type LicenseDiff = BTreeMap<String, DiffFeature>;

/// Compares two license lists by license-type id.
///
/// Entries without an id are ignored: they cannot be matched across
/// snapshots. A license type missing from `new` counts as zero.
pub fn diff_licenses(old: &[License], new: &[License]) -> LicenseDiff {
    let old_counts = counts_by_id(old);
    let new_counts = counts_by_id(new);

    let mut diff = LicenseDiff::new();
    for (id, new_count) in &new_counts {
        let old_count = old_counts.get(id).copied().unwrap_or(0.0);
        diff.insert((*id).to_string(), classify(old_count, *new_count));
    }
    for (id, old_count) in &old_counts {
        if !new_counts.contains_key(id) {
            diff.insert((*id).to_string(), classify(*old_count, 0.0));
        }
    }
    diff
}

fn counts_by_id(licenses: &[License]) -> HashMap<&str, f64> {
    let mut counts = HashMap::new();
    for license in licenses.iter().filter(|l| !l.license_type_id.is_empty()) {
        *counts.entry(license.license_type_id.as_str()).or_insert(0.0) += license.count;
    }
    counts
}

fn classify(old_count: f64, new_count: f64) -> DiffFeature {
    match (old_count > 0.0, new_count > 0.0) {
        (false, true) => DiffFeature::Activated,
        (true, false) => DiffFeature::Deactivated,
        _ => DiffFeature::Unchanged,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationKind {
    License,
    Option,
}

pub fn activation_kind(license_type: &LicenseType) -> ActivationKind {
    if license_type.option && !BASE_EDITION_LICENSE_TYPE_IDS.contains(&license_type.id.as_str()) {
        ActivationKind::Option
    } else {
        ActivationKind::License
    }
}
