//! Record materializer — MatchGroups → flat annotated-table rows
//!
//! Projects the parser's hierarchy into one denormalized `FlatRow` per
//! (fingerprint, occurrence) pair. The scanner labels the two occurrence
//! kinds differently, and that asymmetry is part of the grammar, not an
//! accident to clean up:
//!
//! - **primary** labels are position-encoded (`"<method>,found in project
//!   <id>"`) — the primary is the query project's own code, so its license
//!   and version come from the repository metadata collaborator, not from
//!   the label
//! - **variant** labels are key-encoded (`"method: <m>, project: <id>,
//!   version: <v>, license: <l>"`) — prior art the scanner already labeled
//!   with full provenance
//!
//! Both branches live behind [`decode_label`] so a future format
//! unification stays a local change.

use crate::transcript::MatchGroup;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Sentinel for function bodies that could not be (or were not) fetched
pub const CODE_UNAVAILABLE: &str = "Code not available";

// ─── Flat Rows ──────────────────────────────────────────────────────

/// One occurrence of a fingerprint, denormalized for reporting.
///
/// The three annotation columns stay empty until the conflict resolver
/// runs; nothing else mutates a row after materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRow {
    #[serde(rename = "Hash")]
    pub fingerprint: String,
    #[serde(rename = "Project ID")]
    pub project_id: String,
    /// Sortable version token — epoch-millis string, release tag, or a
    /// "No …" sentinel
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "License")]
    pub license: String,
    #[serde(rename = "Method Name")]
    pub method_name: String,
    /// `<file>:<line>` inside the occurrence's repository
    #[serde(rename = "File Location")]
    pub file_location: String,
    /// Function body, or [`CODE_UNAVAILABLE`]
    #[serde(rename = "Function Code")]
    pub function_code: String,
    /// Primary: the group's `found_in` list joined by `"; "`.
    /// Variant: its own locator URL, or empty.
    #[serde(rename = "Repository URL")]
    pub repository_url: String,
    /// Is this the project under test?
    #[serde(rename = "Query Project")]
    pub query_project: bool,
    #[serde(rename = "Violation")]
    pub violation: String,
    #[serde(rename = "Source_project")]
    pub source_project: String,
    #[serde(rename = "Source_project_version")]
    pub source_project_version: String,
}

// ─── Collaborator Contract ──────────────────────────────────────────

/// Repository metadata for the project under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    /// SPDX id, or `"Not Found"`
    pub license: String,
    /// Latest release tag, or `"No Releases Found"`
    pub release: String,
    /// Sortable version token: release (else latest commit) date as epoch
    /// millis, or `"No Commits Found"`
    pub version: String,
}

/// Metadata lookup keyed by repository URL. The HTTP implementation lives
/// in `fetch`; tests inject fixtures.
pub trait RepoInfoProvider {
    fn repo_info(&self, repo_url: &str) -> RepoInfo;
}

// ─── Label Decoding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Primary,
    Variant,
}

/// Decoded provenance fields of a match label.
///
/// Primaries carry no version/license of their own — those belong to the
/// hosting repository and are resolved through [`RepoInfoProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLabel {
    pub method_name: String,
    pub project_id: String,
    pub version: Option<String>,
    pub license: Option<String>,
}

/// Decode a scanner label. The two arms mirror the scanner's asymmetric
/// labeling convention; see the module docs.
pub fn decode_label(label: &str, kind: LabelKind) -> Result<DecodedLabel, String> {
    match kind {
        LabelKind::Primary => decode_primary(label),
        LabelKind::Variant => decode_variant(label),
    }
}

/// Position-encoded: method name is comma-field 0; the project id is
/// comma-field 1, space-token index 3.
fn decode_primary(label: &str) -> Result<DecodedLabel, String> {
    let mut fields = label.split(',');
    let method_name = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| format!("primary label has no method field: {label:?}"))?;
    let provenance = fields
        .next()
        .ok_or_else(|| format!("primary label has no provenance field: {label:?}"))?;
    let project_id = provenance
        .split(' ')
        .nth(3)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| format!("primary label provenance too short: {label:?}"))?;
    Ok(DecodedLabel {
        method_name: method_name.to_string(),
        project_id: project_id.to_string(),
        version: None,
        license: None,
    })
}

/// Key-encoded: each comma field is `key: value`, looked up by key.
fn decode_variant(label: &str) -> Result<DecodedLabel, String> {
    let mut method = None;
    let mut project = None;
    let mut version = None;
    let mut license = None;

    for field in label.split(',') {
        let Some((key, value)) = field.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "method" => method = Some(value),
            "project" => project = Some(value),
            "version" => version = Some(value),
            "license" => license = Some(value),
            _ => {}
        }
    }

    let method_name =
        method.ok_or_else(|| format!("variant label missing method: {label:?}"))?;
    let project_id =
        project.ok_or_else(|| format!("variant label missing project: {label:?}"))?;
    let version = version.ok_or_else(|| format!("variant label missing version: {label:?}"))?;
    let license = license.ok_or_else(|| format!("variant label missing license: {label:?}"))?;

    Ok(DecodedLabel {
        method_name,
        project_id,
        version: Some(version),
        license: Some(license),
    })
}

// ─── Materialization ────────────────────────────────────────────────

/// Result of flattening a parse: the row table plus the detected identity
/// of the query project (needed by the caller to persist scan state).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeOutput {
    pub rows: Vec<FlatRow>,
    /// Id/version decoded from the first successfully materialized primary
    pub query_project_id: Option<String>,
    pub query_project_version: Option<String>,
}

/// Flatten match groups into the row table.
///
/// Repository metadata is fetched once per call and reused for every
/// primary row. A group whose primary or variant label fails to decode is
/// skipped whole, with a diagnostic; later groups still materialize.
pub fn materialize(
    groups: &[MatchGroup],
    repo_url: &str,
    provider: &dyn RepoInfoProvider,
) -> MaterializeOutput {
    let info = provider.repo_info(repo_url);
    let mut out = MaterializeOutput::default();

    for group in groups {
        match materialize_group(group, repo_url, &info) {
            Ok(group_rows) => {
                if out.query_project_id.is_none() {
                    if let Some(first) = group_rows.first() {
                        out.query_project_id = Some(first.project_id.clone());
                        out.query_project_version = Some(first.version.clone());
                    }
                }
                out.rows.extend(group_rows);
            }
            Err(reason) => {
                warn!(fingerprint = %group.fingerprint, "skipping group: {reason}");
            }
        }
    }

    out
}

fn materialize_group(
    group: &MatchGroup,
    _repo_url: &str,
    info: &RepoInfo,
) -> Result<Vec<FlatRow>, String> {
    let primary = group
        .primary
        .as_ref()
        .ok_or_else(|| "no primary occurrence".to_string())?;
    let decoded = decode_label(&primary.label, LabelKind::Primary)?;

    let mut rows = vec![FlatRow {
        fingerprint: group.fingerprint.clone(),
        project_id: decoded.project_id,
        version: info.version.clone(),
        license: info.license.clone(),
        method_name: decoded.method_name,
        file_location: primary.location.display_string(),
        function_code: primary
            .source_code
            .clone()
            .unwrap_or_else(|| CODE_UNAVAILABLE.to_string()),
        repository_url: group.found_in.join("; "),
        query_project: true,
        ..FlatRow::default()
    }];

    for variant in &group.variants {
        let decoded = decode_label(&variant.label, LabelKind::Variant)?;
        rows.push(FlatRow {
            fingerprint: group.fingerprint.clone(),
            project_id: decoded.project_id,
            version: decoded.version.unwrap_or_default(),
            license: decoded.license.unwrap_or_default(),
            method_name: decoded.method_name,
            file_location: variant.location.display_string(),
            function_code: variant
                .source_code
                .clone()
                .unwrap_or_else(|| CODE_UNAVAILABLE.to_string()),
            repository_url: variant.url.clone().unwrap_or_default(),
            query_project: false,
            ..FlatRow::default()
        });
    }

    Ok(rows)
}
