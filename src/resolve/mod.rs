//! Conflict resolver — baseline election and reuse-violation annotation
//!
//! Rows sharing a fingerprint are the same function body observed in
//! different projects. The earliest version in each group is taken as the
//! license baseline (the presumed origin); every later occurrence is
//! evaluated against it through the compatibility tables. Unknown licenses
//! never fail — they degrade to the explicit `Undetermined` annotation so
//! license scanning falls back to a manual-review flag.

use crate::license::LicenseTables;
use crate::records::FlatRow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

/// Resolver behavior switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Historical behavior (the default, `false`): every violation
    /// overwrites the `Source_project_version` column for the *entire*
    /// result set, so the last-processed violating group's baseline version
    /// lands on every row. Set `true` to scope the annotation to the
    /// violating row instead.
    ///
    /// The unscoped write looks unintentional in the original pipeline but
    /// is preserved as the default pending a maintainer decision.
    #[serde(default)]
    pub scoped_version_annotation: bool,
}

/// Annotated rows plus the violation tally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// All input rows, ordered by (fingerprint, version)
    pub rows: Vec<FlatRow>,
    /// Number of `"<x> incompatible with <y>"` annotations produced
    pub incompatibility_count: usize,
}

/// Annotate reuse violations across a flat row table.
///
/// Grouping, ordering, and baseline election are deterministic in the row
/// *values*: shuffling the input never changes which row becomes a group's
/// baseline.
pub fn resolve(rows: Vec<FlatRow>, tables: &LicenseTables, opts: &ResolverOptions) -> Resolution {
    let mut groups: BTreeMap<String, Vec<FlatRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.fingerprint.clone()).or_default().push(row);
    }

    let mut out = Vec::new();
    let mut count = 0;
    // Legacy unscoped annotation: remember the last violating group's
    // baseline version and stamp it on every row at the end.
    let mut unscoped_version: Option<String> = None;

    for (_, mut group) in groups {
        group.sort_by(baseline_order);

        let baseline_license = tables.normalize(&group[0].license).to_string();
        let baseline_known = tables.is_known(&baseline_license);
        let baseline_project = group[0].project_id.clone();
        let baseline_version = group[0].version.clone();

        // The baseline row itself is never annotated.
        for row in group.iter_mut().skip(1) {
            let license = tables.normalize(&row.license).to_string();
            if !baseline_known || !tables.is_known(&license) {
                row.violation = "Undetermined".to_string();
            } else if !tables.is_reuse_allowed(&baseline_license, &license) {
                row.violation = format!("{license} incompatible with {baseline_license}");
                row.source_project = baseline_project.clone();
                if opts.scoped_version_annotation {
                    row.source_project_version = baseline_version.clone();
                } else {
                    unscoped_version = Some(baseline_version.clone());
                }
                count += 1;
            }
        }

        out.extend(group);
    }

    if let Some(version) = unscoped_version {
        for row in &mut out {
            row.source_project_version = version.clone();
        }
    }

    info!("total incompatibilities: {count}");
    Resolution {
        rows: out,
        incompatibility_count: count,
    }
}

/// Version-ascending order with a deterministic tie-break, so baseline
/// election is a function of row values alone.
fn baseline_order(a: &FlatRow, b: &FlatRow) -> Ordering {
    version_cmp(&a.version, &b.version)
        .then_with(|| a.project_id.cmp(&b.project_id))
        .then_with(|| a.file_location.cmp(&b.file_location))
}

/// Numeric (epoch-millis) comparison when both tokens parse, else lexical.
fn version_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
