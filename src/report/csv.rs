//! CSV writer for the annotated match table

use crate::records::FlatRow;
use crate::CloneguardResult;
use std::path::Path;

/// Column order of the report surface. Consumers key on these names.
pub const CSV_COLUMNS: [&str; 12] = [
    "Hash",
    "Project ID",
    "Version",
    "License",
    "Method Name",
    "File Location",
    "Function Code",
    "Repository URL",
    "Query Project",
    "Violation",
    "Source_project",
    "Source_project_version",
];

/// Artifact filename: `<owner>_<repo>_matches_<project_id>.csv`.
pub fn csv_file_name(repo_url: &str, project_id: &str) -> String {
    let tail = repo_url
        .split_once(".com/")
        .map(|(_, tail)| tail)
        .unwrap_or(repo_url)
        .trim_start_matches("https://")
        .trim_end_matches('/');
    format!("{}_matches_{project_id}.csv", tail.replace('/', "_"))
}

/// Render the table as CSV text (header + one record per row).
pub fn render_matches_csv(rows: &[FlatRow]) -> CloneguardResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for row in rows {
        writer.write_record(row_record(row))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| crate::CloneguardError::ReportError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| crate::CloneguardError::ReportError(e.to_string()))
}

/// Write the table to `output`.
pub fn write_matches_csv(rows: &[FlatRow], output: &Path) -> CloneguardResult<()> {
    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(CSV_COLUMNS)?;
    for row in rows {
        writer.write_record(row_record(row))?;
    }
    writer.flush()?;
    Ok(())
}

fn row_record(row: &FlatRow) -> [&str; 12] {
    [
        &row.fingerprint,
        &row.project_id,
        &row.version,
        &row.license,
        &row.method_name,
        &row.file_location,
        &row.function_code,
        &row.repository_url,
        if row.query_project { "Yes" } else { "No" },
        &row.violation,
        &row.source_project,
        &row.source_project_version,
    ]
}
