//! Match transcript model — hash groups, match records, source enrichment
//!
//! The external fingerprint scanner reports its findings as a flat,
//! line-oriented transcript. This module holds the structured form that
//! transcript is parsed into (`MatchGroup` → primary + variants) and the
//! post-parse source enrichment pass. The parse itself lives in [`parser`].

pub mod parser;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ─── Locations and Records ──────────────────────────────────────────

/// Where a matched function occurrence lives inside its repository.
///
/// Both fields stay as raw transcript strings; an unparseable match line
/// yields empty file/line rather than aborting the scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File path as reported by the scanner (usually `./`-prefixed)
    pub file: String,
    /// 1-based starting line, as text
    pub line: String,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: line.into(),
        }
    }

    /// `<file>:<line>` form used in the flat row table
    pub fn display_string(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// One occurrence of a fingerprint — either the group's primary (the query
/// project's own code) or a variant (prior art the scanner already labeled).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Scanner-encoded label: comma-separated fields carrying method name
    /// and provenance. Primaries are position-encoded, variants key-encoded;
    /// decoding happens in `records`.
    pub label: String,
    /// File/line inside the occurrence's repository
    pub location: SourceLocation,
    /// Blob URL for this occurrence. Variants receive theirs from a
    /// following `URL:` line; the primary's synthesized URL lives at the
    /// head of the group's `found_in` list instead.
    pub url: Option<String>,
    /// Lazily fetched function body; `None` until enriched or on fetch
    /// failure
    pub source_code: Option<String>,
}

impl MatchRecord {
    pub fn new(label: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            label: label.into(),
            location,
            url: None,
            source_code: None,
        }
    }
}

// ─── Match Groups ───────────────────────────────────────────────────

/// All occurrences sharing one content fingerprint.
///
/// Opened when a `Hash` header line appears in the transcript, closed by the
/// next header or end of input. A malformed block can leave `primary` unset;
/// the group is still emitted so the output carries exactly one group per
/// header, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGroup {
    /// Opaque content-hash identifying one logical function body
    pub fingerprint: String,
    /// First occurrence reported under this hash (the query project's code)
    pub primary: Option<MatchRecord>,
    /// Locator URLs for the primary: its synthesized blob URL first, then
    /// any overflow `URL:` lines that did not belong to a variant
    pub found_in: Vec<String>,
    /// Subsequent occurrences under the same hash, in report order
    pub variants: Vec<MatchRecord>,
}

impl MatchGroup {
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            ..Self::default()
        }
    }
}

// ─── Source Enrichment ──────────────────────────────────────────────

/// Capability for retrieving a function body from a locator URL.
///
/// Implementations must tolerate failure: any network/anchor problem is
/// `None`, never an error. The HTTP implementation lives in `fetch`.
pub trait SourceFetcher: Sync {
    fn fetch_source(&self, url: &str) -> Option<String>;
}

/// Fetch source text for every record that has a locator.
///
/// The primary is fetched via the head of `found_in`; variants via their own
/// URL. Each fetch writes only to its own record's `source_code`, so groups
/// are enriched in parallel. Records without a locator, and failed fetches,
/// keep `source_code = None`.
pub fn enrich_sources(groups: &mut [MatchGroup], fetcher: &dyn SourceFetcher) {
    groups.par_iter_mut().for_each(|group| {
        if let Some(primary) = group.primary.as_mut() {
            if let Some(url) = group.found_in.first() {
                primary.source_code = fetcher.fetch_source(url);
            }
        }
        for variant in &mut group.variants {
            if let Some(url) = variant.url.as_deref() {
                variant.source_code = fetcher.fetch_source(url);
            }
        }
    });
}
