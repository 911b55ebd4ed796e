//! External scanner invocation — raw transcript capture
//!
//! The fingerprint scanner is an opaque collaborator: given a repository
//! URL it either produces a transcript in the grammar the parser expects,
//! or nothing. Modeling it as an injected capability keeps the parser and
//! resolver testable against literal transcript fixtures with no external
//! tool or network in the loop.

use std::process::Command;
use tracing::{info, warn};

/// Capability: repository URL → raw scanner transcript.
pub trait MatchScanner {
    /// Run the scan. `None` means the tool failed or produced no output;
    /// the caller skips the repository and moves on.
    fn scan(&self, repo_url: &str) -> Option<String>;
}

/// Runs the scanner as a subprocess and captures stdout.
///
/// The default command line matches the upstream miner's
/// `npm run execute -- checkupload <repo_url> -V 5`. The repository URL is
/// inserted between `leading_args` and `trailing_args`.
pub struct CliScanner {
    pub program: String,
    /// Arguments placed before the repository URL
    pub leading_args: Vec<String>,
    /// Arguments placed after the repository URL
    pub trailing_args: Vec<String>,
}

impl CliScanner {
    pub fn new() -> Self {
        Self {
            program: "npm".to_string(),
            leading_args: ["run", "execute", "--", "checkupload"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trailing_args: vec!["-V".to_string(), "5".to_string()],
        }
    }

    /// Build from a full argv where `{repo_url}` marks the URL slot.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let program = argv.first()?.clone();
        let slot = argv.iter().position(|a| a == "{repo_url}")?;
        Some(Self {
            program,
            leading_args: argv[1..slot].to_vec(),
            trailing_args: argv[slot + 1..].to_vec(),
        })
    }

    /// Check the scanner binary can be spawned at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for CliScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchScanner for CliScanner {
    fn scan(&self, repo_url: &str) -> Option<String> {
        info!("scanning {repo_url}");
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(repo_url)
            .args(&self.trailing_args)
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("failed to run scanner: {e} (is {} installed?)", self.program);
                return None;
            }
        };

        if !output.stderr.is_empty() {
            warn!(
                "scanner stderr for {repo_url}: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.is_empty() {
            warn!("scanner produced no output for {repo_url}");
            return None;
        }
        Some(stdout)
    }
}
