//! Miner pipeline — per-repository orchestration
//!
//! Drives one repository through the full chain:
//! scan → parse → (optional) source enrichment → materialize → resolve →
//! CSV artifact → worklist writeback. Per the failure policy, nothing on
//! this path is fatal for the run: a repository that fails any stage is
//! skipped and the loop moves to the next one.

use crate::license::LicenseTables;
use crate::records::{self, FlatRow, RepoInfoProvider};
use crate::report;
use crate::resolve::{self, ResolverOptions};
use crate::scanner::MatchScanner;
use crate::transcript::{self, SourceFetcher};
use crate::worklist::Worklist;
use crate::CloneguardResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ─── Configuration ─────────────────────────────────────────────────

/// Miner configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Fetch function bodies for every occurrence (slow; one HTTP request
    /// per locator)
    #[serde(default)]
    pub fetch_source: bool,

    /// Directory CSV artifacts are written to
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Scanner argv with a `{repo_url}` placeholder; `None` uses the
    /// built-in scanner command
    #[serde(default)]
    pub scanner_argv: Option<Vec<String>>,

    /// API token for repository metadata lookups (falls back to the
    /// `GITHUB_TOKEN` environment variable)
    #[serde(default)]
    pub github_token: Option<String>,

    /// Bounded retry count for source fetches
    #[serde(default = "default_retries")]
    pub fetch_retries: u32,

    /// Scope the violation version annotation to the violating row instead
    /// of the legacy result-set-wide overwrite
    #[serde(default)]
    pub scoped_version_annotation: bool,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_retries() -> u32 {
    crate::fetch::DEFAULT_RETRIES
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            fetch_source: false,
            results_dir: default_results_dir(),
            scanner_argv: None,
            github_token: None,
            fetch_retries: default_retries(),
            scoped_version_annotation: false,
        }
    }
}

impl MinerConfig {
    /// Load configuration from a TOML file.
    pub fn from_path(path: &Path) -> CloneguardResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            scoped_version_annotation: self.scoped_version_annotation,
        }
    }

    /// Build the scanner this configuration names (the built-in command
    /// when `scanner_argv` is absent or malformed).
    pub fn build_scanner(&self) -> crate::scanner::CliScanner {
        self.scanner_argv
            .as_deref()
            .and_then(crate::scanner::CliScanner::from_argv)
            .unwrap_or_default()
    }

    pub fn build_source_fetcher(&self) -> crate::fetch::HttpSourceFetcher {
        crate::fetch::HttpSourceFetcher::with_retries(self.fetch_retries)
    }

    pub fn build_repo_info_provider(&self) -> crate::fetch::GithubRepoInfoProvider {
        crate::fetch::GithubRepoInfoProvider::new(self.github_token.clone())
    }
}

// ─── Outcomes ───────────────────────────────────────────────────────

/// What one repository's scan produced.
#[derive(Debug, Clone, Default)]
pub struct RepoOutcome {
    pub repo_url: String,
    /// Identity of the query project, decoded from its first primary row
    pub project_id: Option<String>,
    pub project_version: Option<String>,
    pub rows: Vec<FlatRow>,
    pub incompatibility_count: usize,
    /// Where the CSV artifact landed, when one was written
    pub report_path: Option<PathBuf>,
}

/// Tally for a full worklist run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: usize,
    /// Repositories that produced no transcript, no matches, or no rows
    pub skipped: usize,
    pub incompatibilities: usize,
}

// ─── Miner ──────────────────────────────────────────────────────────

/// The orchestrator. Collaborators are injected so the whole pipeline runs
/// against fixtures in tests — no scanner binary, no network.
pub struct Miner<'a> {
    config: MinerConfig,
    tables: LicenseTables,
    scanner: &'a dyn MatchScanner,
    source_fetcher: &'a dyn SourceFetcher,
    repo_info: &'a dyn RepoInfoProvider,
}

impl<'a> Miner<'a> {
    pub fn new(
        config: MinerConfig,
        scanner: &'a dyn MatchScanner,
        source_fetcher: &'a dyn SourceFetcher,
        repo_info: &'a dyn RepoInfoProvider,
    ) -> Self {
        Self {
            config,
            tables: LicenseTables::builtin(),
            scanner,
            source_fetcher,
            repo_info,
        }
    }

    /// Swap in a custom license taxonomy.
    pub fn with_tables(mut self, tables: LicenseTables) -> Self {
        self.tables = tables;
        self
    }

    /// Process one repository end to end.
    ///
    /// `Ok(None)` means a clean skip: the scanner produced nothing, or the
    /// transcript held no materializable matches. `Err` is reserved for
    /// artifact I/O problems.
    pub fn process_repo(&self, repo_url: &str) -> CloneguardResult<Option<RepoOutcome>> {
        let Some(output) = self.scanner.scan(repo_url) else {
            info!("no scanner output for {repo_url}");
            return Ok(None);
        };

        let mut groups = transcript::parser::parse(&output, repo_url);
        if groups.is_empty() {
            info!("no matches found in {repo_url}");
            return Ok(None);
        }

        if self.config.fetch_source {
            transcript::enrich_sources(&mut groups, self.source_fetcher);
        }

        let materialized = records::materialize(&groups, repo_url, self.repo_info);
        if materialized.rows.is_empty() {
            info!("no materializable rows for {repo_url}");
            return Ok(None);
        }

        let resolution = resolve::resolve(
            materialized.rows,
            &self.tables,
            &self.config.resolver_options(),
        );

        let report_path = self.write_artifact(
            repo_url,
            materialized.query_project_id.as_deref(),
            &resolution.rows,
        )?;

        Ok(Some(RepoOutcome {
            repo_url: repo_url.to_string(),
            project_id: materialized.query_project_id,
            project_version: materialized.query_project_version,
            rows: resolution.rows,
            incompatibility_count: resolution.incompatibility_count,
            report_path,
        }))
    }

    /// Drain a worklist: process every active repository, writing back the
    /// detected identity and clearing the flag. Failures skip the
    /// repository, never the run.
    pub fn run(&self, worklist: &mut dyn Worklist) -> CloneguardResult<RunStats> {
        let mut stats = RunStats::default();

        for task in worklist.pending()? {
            info!("processing {}", task.repo_url);
            match self.process_repo(&task.repo_url) {
                Ok(Some(outcome)) => {
                    stats.processed += 1;
                    stats.incompatibilities += outcome.incompatibility_count;
                    worklist.complete(
                        &task.id,
                        outcome.project_id.as_deref(),
                        outcome.project_version.as_deref(),
                    )?;
                }
                Ok(None) => {
                    stats.skipped += 1;
                    worklist.complete(&task.id, None, None)?;
                }
                Err(e) => {
                    // Artifact trouble for one repository; move on.
                    warn!("failed to process {}: {e}", task.repo_url);
                    stats.skipped += 1;
                }
            }
        }

        info!(
            "run complete: {} processed, {} skipped, {} incompatibilities",
            stats.processed, stats.skipped, stats.incompatibilities
        );
        Ok(stats)
    }

    fn write_artifact(
        &self,
        repo_url: &str,
        project_id: Option<&str>,
        rows: &[FlatRow],
    ) -> CloneguardResult<Option<PathBuf>> {
        std::fs::create_dir_all(&self.config.results_dir)?;
        let name = report::csv_file_name(repo_url, project_id.unwrap_or("unknown"));
        let path = self.config.results_dir.join(name);
        report::write_matches_csv(rows, &path)?;
        info!("results saved to {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RepoInfo;
    use crate::worklist::{MemoryWorklist, RepoTask};
    use std::collections::HashMap;

    struct FixtureScanner(HashMap<String, String>);

    impl MatchScanner for FixtureScanner {
        fn scan(&self, repo_url: &str) -> Option<String> {
            self.0.get(repo_url).cloned()
        }
    }

    struct NoFetch;

    impl SourceFetcher for NoFetch {
        fn fetch_source(&self, _url: &str) -> Option<String> {
            None
        }
    }

    struct FixedInfo(RepoInfo);

    impl RepoInfoProvider for FixedInfo {
        fn repo_info(&self, _repo_url: &str) -> RepoInfo {
            self.0.clone()
        }
    }

    const REPO: &str = "https://github.com/o/r";

    fn transcript_with_violation() -> String {
        "Hash abc123\n\
         * Method foo,found in project 42 in file ./src/a.c, line 10\n\
         * Method method: bar, project: 7, version: 1800000000000, license: GPLv3 in file ./b.c, line 5\n\
         URL: https://github.com/p/q/blob/main/b.c#L5\n"
            .to_string()
    }

    fn miner_config(dir: &Path) -> MinerConfig {
        MinerConfig {
            results_dir: dir.to_path_buf(),
            ..MinerConfig::default()
        }
    }

    #[test]
    fn processes_repo_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = FixtureScanner(
            [(REPO.to_string(), transcript_with_violation())]
                .into_iter()
                .collect(),
        );
        let info = FixedInfo(RepoInfo {
            license: "MIT".to_string(),
            release: "v1.0".to_string(),
            version: "1700000000000".to_string(),
        });
        let miner = Miner::new(miner_config(dir.path()), &scanner, &NoFetch, &info);

        let outcome = miner.process_repo(REPO).unwrap().expect("outcome");
        assert_eq!(outcome.project_id.as_deref(), Some("42"));
        assert_eq!(outcome.incompatibility_count, 1);
        assert_eq!(outcome.rows.len(), 2);

        let path = outcome.report_path.expect("csv written");
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("GPLv3 incompatible with MIT"));
    }

    #[test]
    fn missing_scanner_output_is_a_clean_skip() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = FixtureScanner(HashMap::new());
        let info = FixedInfo(RepoInfo {
            license: "MIT".to_string(),
            release: "v1".to_string(),
            version: "1".to_string(),
        });
        let miner = Miner::new(miner_config(dir.path()), &scanner, &NoFetch, &info);
        assert!(miner.process_repo(REPO).unwrap().is_none());
    }

    #[test]
    fn run_drains_worklist_and_writes_back_identity() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = FixtureScanner(
            [(REPO.to_string(), transcript_with_violation())]
                .into_iter()
                .collect(),
        );
        let info = FixedInfo(RepoInfo {
            license: "MIT".to_string(),
            release: "v1.0".to_string(),
            version: "1700000000000".to_string(),
        });
        let miner = Miner::new(miner_config(dir.path()), &scanner, &NoFetch, &info);

        let mut worklist = MemoryWorklist::new(vec![
            RepoTask::new("1", REPO),
            RepoTask::new("2", "https://github.com/o/empty"),
        ]);
        let stats = miner.run(&mut worklist).unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.incompatibilities, 1);

        let tasks = worklist.tasks();
        assert!(!tasks[0].active);
        assert_eq!(tasks[0].project_id.as_deref(), Some("42"));
        assert!(!tasks[1].active);
        assert!(tasks[1].project_id.is_none());
    }

    #[test]
    fn config_defaults_from_empty_toml() {
        let config: MinerConfig = toml::from_str("").unwrap();
        assert!(!config.fetch_source);
        assert_eq!(config.results_dir, PathBuf::from("results"));
        assert_eq!(config.fetch_retries, crate::fetch::DEFAULT_RETRIES);
        assert!(!config.scoped_version_annotation);
    }

    #[test]
    fn config_overrides_parse() {
        let config: MinerConfig = toml::from_str(
            r#"
fetch_source = true
results_dir = "out"
scanner_argv = ["scanner", "check", "{repo_url}"]
scoped_version_annotation = true
"#,
        )
        .unwrap();
        assert!(config.fetch_source);
        assert_eq!(config.results_dir, PathBuf::from("out"));
        assert!(config.scoped_version_annotation);

        let scanner = config.build_scanner();
        assert_eq!(scanner.program, "scanner");
        assert_eq!(scanner.leading_args, vec!["check"]);
        assert!(scanner.trailing_args.is_empty());
    }
}
