//! License compatibility tables — alias normalization + reuse matrix
//!
//! Two pure, side-effect-free lookups drive conflict resolution:
//!
//! - `normalize` maps a scanner- or API-reported license string onto its
//!   canonical id (identity for anything unknown — unknowns degrade to the
//!   resolver's `Undetermined` branch, they never error)
//! - `is_reuse_allowed` answers the asymmetric question "may code under
//!   `source` be incorporated into a work distributed under `target`";
//!   absent entries mean *not allowed*
//!
//! Both tables are data, not code: the built-in defaults cover the known
//! license set, and a project can swap in its own taxonomy from TOML without
//! touching parser or resolver logic.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The small fixed license set this crate can classify
pub const KNOWN_LICENSES: &[&str] = &[
    "MIT",
    "Apache-2.0",
    "BSD-3-Clause",
    "MPL-2.0",
    "GPLv3",
    "LGPL-3.0",
];

/// Loadable normalization + compatibility data.
///
/// TOML shape:
///
/// ```toml
/// known = ["MIT", "GPLv3"]
///
/// [aliases]
/// "GPL-3.0" = "GPLv3"
///
/// [matrix.GPLv3]
/// MIT = true
/// GPLv3 = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseTables {
    /// Canonical ids the resolver can classify; anything else is
    /// `Undetermined`
    #[serde(default)]
    pub known: BTreeSet<String>,
    /// Alias → canonical id. Alias targets must themselves be canonical,
    /// which is what makes `normalize` idempotent.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// `matrix[target][source]` — reuse permission, asymmetric
    #[serde(default)]
    pub matrix: HashMap<String, HashMap<String, bool>>,
}

impl LicenseTables {
    /// The built-in table over [`KNOWN_LICENSES`].
    pub fn builtin() -> Self {
        let known: BTreeSet<String> = KNOWN_LICENSES.iter().map(|s| s.to_string()).collect();

        let aliases: HashMap<String, String> = [
            ("GPL-3.0", "GPLv3"),
            ("GPL-3.0-only", "GPLv3"),
            ("GPL-3.0-or-later", "GPLv3"),
            ("GPL3", "GPLv3"),
            ("LGPLv3", "LGPL-3.0"),
            ("LGPL-3.0-only", "LGPL-3.0"),
            ("LGPL-3.0-or-later", "LGPL-3.0"),
            ("Apache 2.0", "Apache-2.0"),
            ("Apache License 2.0", "Apache-2.0"),
            ("Apache", "Apache-2.0"),
            ("MIT License", "MIT"),
            ("Expat", "MIT"),
            ("BSD", "BSD-3-Clause"),
            ("BSD 3-Clause", "BSD-3-Clause"),
            ("New BSD", "BSD-3-Clause"),
            ("MPL", "MPL-2.0"),
            ("Mozilla Public License 2.0", "MPL-2.0"),
        ]
        .into_iter()
        .map(|(a, c)| (a.to_string(), c.to_string()))
        .collect();

        // Allowed sources per target. Permissive targets cannot absorb
        // copyleft code; GPLv3 can absorb everything in the known set;
        // LGPL-3.0 can absorb everything except GPLv3.
        const PERMISSIVE_SOURCES: &[&str] = &["MIT", "BSD-3-Clause", "Apache-2.0", "MPL-2.0"];
        let mut matrix: HashMap<String, HashMap<String, bool>> = HashMap::new();
        for target in ["MIT", "BSD-3-Clause", "Apache-2.0", "MPL-2.0"] {
            matrix.insert(target.to_string(), allowed_row(PERMISSIVE_SOURCES));
        }
        matrix.insert(
            "LGPL-3.0".to_string(),
            allowed_row(&["MIT", "BSD-3-Clause", "Apache-2.0", "MPL-2.0", "LGPL-3.0"]),
        );
        matrix.insert("GPLv3".to_string(), allowed_row(KNOWN_LICENSES));

        Self {
            known,
            aliases,
            matrix,
        }
    }

    /// Load a replacement taxonomy from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Canonicalize a license string. Unknown strings pass through
    /// unchanged.
    pub fn normalize<'a>(&'a self, license: &'a str) -> &'a str {
        self.aliases.get(license).map(String::as_str).unwrap_or(license)
    }

    /// Is `license` inside the classifiable set (after normalization)?
    pub fn is_known(&self, license: &str) -> bool {
        self.known.contains(self.normalize(license))
    }

    /// May code under `source` be incorporated into a work distributed
    /// under `target`? Absent entries are "not allowed".
    pub fn is_reuse_allowed(&self, target: &str, source: &str) -> bool {
        self.matrix
            .get(target)
            .and_then(|row| row.get(source))
            .copied()
            .unwrap_or(false)
    }
}

impl Default for LicenseTables {
    fn default() -> Self {
        Self::builtin()
    }
}

fn allowed_row(sources: &[&str]) -> HashMap<String, bool> {
    sources.iter().map(|s| (s.to_string(), true)).collect()
}

static BUILTIN: Lazy<LicenseTables> = Lazy::new(LicenseTables::builtin);

/// Normalize against the built-in tables.
pub fn normalize(license: &str) -> &str {
    BUILTIN.normalize(license)
}

/// Reuse permission against the built-in tables.
pub fn is_reuse_allowed(target: &str, source: &str) -> bool {
    BUILTIN.is_reuse_allowed(target, source)
}
