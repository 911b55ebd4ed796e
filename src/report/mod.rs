//! Report generation — CSV artifact and cross-project summary
//!
//! Transforms the resolver's annotated row table into the artifacts the
//! surrounding system consumes: a per-repository CSV of all occurrences
//! with their violation annotations, and a plain-text summary of projects
//! that accumulate matches across many fingerprints.

pub mod csv;
pub mod summary;

pub use csv::{csv_file_name, render_matches_csv, write_matches_csv, CSV_COLUMNS};
pub use summary::{render_summary, summarize, ProjectSummary};

use crate::records::FlatRow;
use crate::CloneguardResult;
use std::path::Path;

/// Output format for the annotated table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// The 12-column annotated match table
    Csv,
    /// Cross-project frequency/violation summary (plain text)
    Summary,
}

/// Render a report to a string
pub fn render_report(rows: &[FlatRow], format: ReportFormat) -> CloneguardResult<String> {
    match format {
        ReportFormat::Csv => render_matches_csv(rows),
        ReportFormat::Summary => Ok(render_summary(&summarize(rows))),
    }
}

/// Write a report in the specified format
pub fn write_report(rows: &[FlatRow], format: ReportFormat, output: &Path) -> CloneguardResult<()> {
    let content = render_report(rows, format)?;
    std::fs::write(output, content)?;
    Ok(())
}
