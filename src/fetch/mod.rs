//! HTTP collaborators — function source retrieval and repository metadata
//!
//! Everything here is latency-bound and failure-tolerant by contract:
//! fetches are retried a bounded number of times, time out per request, and
//! degrade to `None` / sentinel values. Nothing in this module can abort a
//! parse or a pipeline run.

use crate::records::{RepoInfo, RepoInfoProvider};
use crate::transcript::SourceFetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Pause between retry attempts
const RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Default bounded retry count for source fetches
pub const DEFAULT_RETRIES: u32 = 3;
/// Safety cutoff for the brace scan
const MAX_FUNCTION_LINES: usize = 1000;

static GITHUB_REPO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https://github\.com/([^/]+)/([^/]+)").expect("github repo pattern"));

// ─── Locator Plumbing ───────────────────────────────────────────────

/// Rewrite a GitHub blob URL to its raw-content form.
pub fn raw_content_url(url: &str) -> String {
    url.replace("github.com", "raw.githubusercontent.com")
        .replace("/blob/", "/")
        .replace('\\', "/")
}

/// Extract the 1-based starting line from a `#L<start>` anchor
/// (`#L20-L30` ranges use the start).
pub fn line_anchor(url: &str) -> Option<usize> {
    let (_, anchor) = url.rsplit_once("#L")?;
    let start = anchor.split('-').next()?;
    start.parse().ok()
}

// ─── Function Body Extraction ───────────────────────────────────────

/// Carve the function starting at `start_line` out of a file's text.
///
/// Finds the opening brace, then tracks brace depth line by line until it
/// returns to zero and the following non-blank lines are not
/// `else`/`catch`/`finally` continuations. Bails out after
/// [`MAX_FUNCTION_LINES`] lines. Returns `None` when the anchor is past the
/// end of the file.
pub fn extract_function_body(text: &str, start_line: usize) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if start_line == 0 || start_line > lines.len() {
        warn!("line {start_line} out of range ({} lines)", lines.len());
        return None;
    }

    let mut body: Vec<&str> = Vec::new();
    let mut depth: i64 = 0;
    let mut in_function = false;

    for (idx, line) in lines.iter().enumerate().skip(start_line - 1) {
        body.push(line);

        if !in_function {
            if line.contains('{') {
                in_function = true;
                depth = brace_delta(line);
                // One-line brace pair ending in ';' — an initializer, not
                // a body worth scanning further.
                if depth == 0 && line.trim_end().ends_with(';') {
                    break;
                }
            }
        } else {
            depth += brace_delta(line);
            if depth == 0 && !continues_below(&lines, idx + 1) {
                break;
            }
        }

        if body.len() > MAX_FUNCTION_LINES {
            warn!("function too long, truncating at {MAX_FUNCTION_LINES} lines");
            break;
        }
    }

    Some(body.join("\n"))
}

fn brace_delta(line: &str) -> i64 {
    let opens = line.matches('{').count() as i64;
    let closes = line.matches('}').count() as i64;
    opens - closes
}

/// Do the next few non-blank lines continue the construct (`else` / `catch`
/// / `finally`)?
fn continues_below(lines: &[&str], from: usize) -> bool {
    lines
        .iter()
        .skip(from)
        .take(3)
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .any(|l| l.starts_with("else") || l.starts_with("catch") || l.starts_with("finally"))
}

// ─── Source Fetcher ─────────────────────────────────────────────────

/// Fetches function bodies from repository blob URLs over HTTP.
pub struct HttpSourceFetcher {
    client: reqwest::blocking::Client,
    retries: u32,
}

impl HttpSourceFetcher {
    pub fn new() -> Self {
        Self::with_retries(DEFAULT_RETRIES)
    }

    pub fn with_retries(retries: u32) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { client, retries }
    }

    fn get_text(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.retries {
            match self.client.get(url).send() {
                Ok(resp) if resp.status().is_success() => match resp.text() {
                    Ok(text) => return Some(text),
                    Err(e) => warn!("failed to read response body from {url}: {e}"),
                },
                Ok(resp) => warn!("HTTP {} for {url}", resp.status()),
                Err(e) => warn!("request error for {url}: {e}"),
            }
            if attempt < self.retries {
                std::thread::sleep(RETRY_BACKOFF);
            }
        }
        None
    }
}

impl Default for HttpSourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFetcher for HttpSourceFetcher {
    fn fetch_source(&self, url: &str) -> Option<String> {
        let Some(start) = line_anchor(url) else {
            warn!("no line anchor in locator {url}");
            return None;
        };
        let raw = raw_content_url(url);
        debug!("fetching source from {raw}");
        let text = self.get_text(&raw)?;
        extract_function_body(&text, start)
    }
}

// ─── Repository Metadata ────────────────────────────────────────────

/// Repository metadata lookup against the GitHub REST API.
///
/// All failure modes collapse to sentinel strings, matching the
/// collaborator contract: `"Not Found"` / `"No Releases Found"` /
/// `"No Commits Found"`, or the `"Invalid GitHub URL"` triple for URLs this
/// provider cannot address.
pub struct GithubRepoInfoProvider {
    client: reqwest::blocking::Client,
    token: Option<String>,
}

impl GithubRepoInfoProvider {
    pub fn new(token: Option<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("cloneguard")
            .build()
            .expect("failed to build HTTP client");
        let token = token.or_else(|| std::env::var("GITHUB_TOKEN").ok());
        Self { client, token }
    }

    fn get_json(&self, url: &str) -> Result<(reqwest::StatusCode, serde_json::Value), String> {
        let mut req = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {token}"));
        }
        let resp = req.send().map_err(|e| e.to_string())?;
        let status = resp.status();
        let value = resp.json().unwrap_or(serde_json::Value::Null);
        Ok((status, value))
    }

    fn lookup(&self, owner: &str, repo: &str) -> Result<RepoInfo, String> {
        let base = format!("https://api.github.com/repos/{owner}/{repo}");

        let (_, license_json) = self.get_json(&format!("{base}/license"))?;
        let license = license_json["license"]["spdx_id"]
            .as_str()
            .unwrap_or("Not Found")
            .to_string();

        let (status, release_json) = self.get_json(&format!("{base}/releases/latest"))?;
        let (release, release_date) = if status.is_success() {
            (
                release_json["tag_name"]
                    .as_str()
                    .unwrap_or("No Releases Found")
                    .to_string(),
                release_json["published_at"].as_str().map(str::to_string),
            )
        } else {
            ("No Releases Found".to_string(), None)
        };

        let version = match release_date {
            Some(date) => iso_to_millis(&date).unwrap_or_else(|| "No Commits Found".to_string()),
            None => self.latest_commit_millis(&base)?,
        };

        Ok(RepoInfo {
            license,
            release,
            version,
        })
    }

    /// Fall back to the latest commit date when the repo has no releases.
    fn latest_commit_millis(&self, base: &str) -> Result<String, String> {
        let (status, commits) = self.get_json(&format!("{base}/commits?per_page=1&page=1"))?;
        if !status.is_success() {
            return Err(format!("HTTP {status} listing commits"));
        }
        let date = commits
            .get(0)
            .and_then(|c| c["commit"]["author"]["date"].as_str());
        Ok(date
            .and_then(iso_to_millis)
            .unwrap_or_else(|| "No Commits Found".to_string()))
    }
}

impl RepoInfoProvider for GithubRepoInfoProvider {
    fn repo_info(&self, repo_url: &str) -> RepoInfo {
        let Some(caps) = GITHUB_REPO.captures(repo_url) else {
            return RepoInfo {
                license: "Invalid GitHub URL".to_string(),
                release: "Invalid GitHub URL".to_string(),
                version: "Invalid GitHub URL".to_string(),
            };
        };
        match self.lookup(&caps[1], &caps[2]) {
            Ok(info) => info,
            Err(e) => {
                warn!("metadata lookup failed for {repo_url}: {e}");
                RepoInfo {
                    license: "Error fetching data".to_string(),
                    release: "Error fetching data".to_string(),
                    version: format!("Error: {e}"),
                }
            }
        }
    }
}

fn iso_to_millis(date: &str) -> Option<String> {
    let parsed = chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%SZ").ok()?;
    Some(parsed.and_utc().timestamp_millis().to_string())
}
