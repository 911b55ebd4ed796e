//! # cloneguard — Code-Clone License Provenance Miner
//!
//! Turns the textual report of a code-clone/fingerprint scanner into a
//! structured, queryable record of which functions in a target codebase match
//! functions found elsewhere, then determines whether reusing the matched
//! code would violate license terms.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Miner                                │
//! │  ┌──────────┐ ┌───────────┐ ┌───────────┐ ┌──────────────┐  │
//! │  │ Scanner  │ │ Worklist  │ │ Source /  │ │ MinerConfig  │  │
//! │  │ (CLI)    │ │ (trait)   │ │ Repo HTTP │ │ (TOML)       │  │
//! │  └────┬─────┘ └─────┬─────┘ └─────┬─────┘ └──────────────┘  │
//! │       │ raw transcript            │                          │
//! │  ┌────▼──────────────────────────────────────────────────┐  │
//! │  │ Transcript Parser (3-state machine)  → MatchGroups    │  │
//! │  └────┬──────────────────────────────────────────────────┘  │
//! │  ┌────▼──────────────────────────────────────────────────┐  │
//! │  │ Record Materializer (label decode)   → FlatRows       │  │
//! │  └────┬──────────────────────────────────────────────────┘  │
//! │  ┌────▼──────────────────────────────────────────────────┐  │
//! │  │ Conflict Resolver + Compatibility Table → annotations │  │
//! │  └────┬──────────────────────────────────────────────────┘  │
//! │  ┌────▼──────────────────────────────────────────────────┐  │
//! │  │ Report (CSV artifact, cross-project summary)          │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capabilities
//!
//! - **Transcript Parsing**: tolerant, single-pass state machine over the
//!   scanner's line-oriented output (hash groups → primary + variants)
//! - **License Compatibility**: asymmetric `[target][source]` reuse matrix
//!   with alias normalization, data-driven and TOML-loadable
//! - **Conflict Resolution**: per-fingerprint baseline election by version,
//!   violation and `Undetermined` annotation, incompatibility counting
//! - **Provenance Enrichment**: brace-tracking function body retrieval from
//!   repository blob URLs, with bounded retries and sentinel fallbacks
//! - **Repository Metadata**: license / release / timestamp lookup with
//!   graceful "Not Found" degradation
//! - **Artifacts**: 12-column annotated CSV per repository, plus a
//!   cross-project frequency/violation summary

pub mod fetch;
pub mod license;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod resolve;
pub mod scanner;
pub mod transcript;
pub mod worklist;

// Re-exports for convenience
pub use fetch::{GithubRepoInfoProvider, HttpSourceFetcher};
pub use license::LicenseTables;
pub use pipeline::{Miner, MinerConfig, RepoOutcome, RunStats};
pub use records::{materialize, FlatRow, MaterializeOutput, RepoInfo, RepoInfoProvider};
pub use report::write_matches_csv;
pub use resolve::{resolve, Resolution, ResolverOptions};
pub use scanner::{CliScanner, MatchScanner};
pub use transcript::{parser::parse, MatchGroup, MatchRecord, SourceFetcher, SourceLocation};
pub use worklist::{MemoryWorklist, RepoTask, Worklist};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloneguardError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Report error: {0}")]
    ReportError(String),

    #[error("Worklist error: {0}")]
    WorklistError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type CloneguardResult<T> = Result<T, CloneguardError>;
