//! Cross-project summary — which projects keep showing up
//!
//! Aggregates annotated rows by project id: how many distinct fingerprints
//! each project shares with the corpus, and how many of those carry a real
//! violation (an `Undetermined` annotation is a manual-review flag, not a
//! violation). Projects matching on a single fingerprint are noise and are
//! left out.

use crate::records::FlatRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate view of one project across all fingerprint groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_id: String,
    /// Repository URL of the project's first-seen row (may be empty for
    /// variants without a locator)
    pub repository_url: String,
    /// Distinct fingerprints, first-seen order
    pub fingerprints: Vec<String>,
    /// Subset of `fingerprints` carrying a real violation
    pub violation_fingerprints: Vec<String>,
    /// Distinct violation annotations observed
    pub violations: Vec<String>,
}

impl ProjectSummary {
    pub fn fingerprint_count(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn violation_count(&self) -> usize {
        self.violation_fingerprints.len()
    }
}

fn is_real_violation(annotation: &str) -> bool {
    !annotation.is_empty() && annotation != "Undetermined"
}

/// Aggregate rows per project, keeping only projects that share more than
/// one fingerprint with the corpus. Sorted by fingerprint count descending
/// (ties by project id).
pub fn summarize(rows: &[FlatRow]) -> Vec<ProjectSummary> {
    let mut by_project: BTreeMap<&str, ProjectSummary> = BTreeMap::new();

    for row in rows {
        let entry = by_project
            .entry(row.project_id.as_str())
            .or_insert_with(|| ProjectSummary {
                project_id: row.project_id.clone(),
                repository_url: row.repository_url.clone(),
                ..ProjectSummary::default()
            });
        if !entry.fingerprints.contains(&row.fingerprint) {
            entry.fingerprints.push(row.fingerprint.clone());
        }
        if is_real_violation(&row.violation) {
            if !entry.violation_fingerprints.contains(&row.fingerprint) {
                entry.violation_fingerprints.push(row.fingerprint.clone());
            }
            if !entry.violations.contains(&row.violation) {
                entry.violations.push(row.violation.clone());
            }
        }
    }

    let mut summaries: Vec<ProjectSummary> = by_project
        .into_values()
        .filter(|s| s.fingerprint_count() > 1)
        .collect();
    // BTreeMap iteration gives the id-ascending tie order; stable sort
    // keeps it within equal counts.
    summaries.sort_by(|a, b| b.fingerprint_count().cmp(&a.fingerprint_count()));
    summaries
}

/// Render the summary as a plain-text report.
pub fn render_summary(summaries: &[ProjectSummary]) -> String {
    let mut out = String::new();
    out.push_str("Projects with Multiple Shared Fingerprints\n");
    out.push_str("==========================================\n\n");

    if summaries.is_empty() {
        out.push_str("No project shares more than one fingerprint.\n");
        return out;
    }

    for summary in summaries {
        out.push_str(&format!("Project ID: {}\n", summary.project_id));
        if !summary.repository_url.is_empty() {
            out.push_str(&format!("Repository: {}\n", summary.repository_url));
        }
        out.push_str(&format!(
            "Shared fingerprints: {}\n",
            summary.fingerprint_count()
        ));
        out.push_str(&format!("  {}\n", summary.fingerprints.join(", ")));
        if summary.violation_count() > 0 {
            out.push_str(&format!(
                "Fingerprints with violations: {}\n",
                summary.violation_count()
            ));
            for violation in &summary.violations {
                out.push_str(&format!("  - {violation}\n"));
            }
        }
        out.push_str(&format!("{}\n", "-".repeat(50)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fingerprint: &str, project: &str, violation: &str) -> FlatRow {
        FlatRow {
            fingerprint: fingerprint.to_string(),
            project_id: project.to_string(),
            violation: violation.to_string(),
            repository_url: format!("https://x/{project}"),
            ..FlatRow::default()
        }
    }

    #[test]
    fn single_fingerprint_projects_are_filtered_out() {
        let rows = vec![
            row("h1", "a", ""),
            row("h2", "a", ""),
            row("h1", "lonely", ""),
        ];
        let summaries = summarize(&rows);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].project_id, "a");
    }

    #[test]
    fn sorted_by_fingerprint_count_descending() {
        let rows = vec![
            row("h1", "small", ""),
            row("h2", "small", ""),
            row("h1", "big", ""),
            row("h2", "big", ""),
            row("h3", "big", ""),
        ];
        let summaries = summarize(&rows);
        let ids: Vec<&str> = summaries.iter().map(|s| s.project_id.as_str()).collect();
        assert_eq!(ids, vec!["big", "small"]);
    }

    #[test]
    fn undetermined_is_not_counted_as_violation() {
        let rows = vec![
            row("h1", "a", "Undetermined"),
            row("h2", "a", "GPLv3 incompatible with MIT"),
            row("h3", "a", ""),
        ];
        let summaries = summarize(&rows);
        assert_eq!(summaries[0].violation_count(), 1);
        assert_eq!(
            summaries[0].violations,
            vec!["GPLv3 incompatible with MIT".to_string()]
        );
    }

    #[test]
    fn duplicate_fingerprints_counted_once() {
        let rows = vec![row("h1", "a", ""), row("h1", "a", ""), row("h2", "a", "")];
        let summaries = summarize(&rows);
        assert_eq!(summaries[0].fingerprint_count(), 2);
    }

    #[test]
    fn rendered_report_names_projects_and_violations() {
        let rows = vec![
            row("h1", "a", "GPLv3 incompatible with MIT"),
            row("h2", "a", ""),
        ];
        let text = render_summary(&summarize(&rows));
        assert!(text.contains("Project ID: a"));
        assert!(text.contains("Shared fingerprints: 2"));
        assert!(text.contains("- GPLv3 incompatible with MIT"));
    }

    #[test]
    fn empty_input_renders_placeholder() {
        let text = render_summary(&summarize(&[]));
        assert!(text.contains("No project shares"));
    }
}
