//! Repository worklist — the queue of repositories awaiting a scan
//!
//! The surrounding system keeps a table of repositories with an "active"
//! flag; the miner drains the active ones and writes back what it learned
//! (the detected project id and version) while clearing the flag. The
//! storage itself lives outside this crate — relational, file-backed,
//! whatever — behind the [`Worklist`] trait. [`MemoryWorklist`] serves
//! tests and embedding.

use crate::{CloneguardError, CloneguardResult};
use serde::{Deserialize, Serialize};

/// One repository awaiting (or done with) a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTask {
    /// Storage key the writeback is addressed to
    pub id: String,
    pub repo_url: String,
    /// Still awaiting a scan?
    pub active: bool,
    /// Detected project id, filled by the writeback
    #[serde(default)]
    pub project_id: Option<String>,
    /// Detected project version, filled by the writeback
    #[serde(default)]
    pub project_version: Option<String>,
}

impl RepoTask {
    pub fn new(id: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            repo_url: repo_url.into(),
            active: true,
            project_id: None,
            project_version: None,
        }
    }
}

/// Worklist storage contract.
pub trait Worklist {
    /// Repositories still flagged active, in processing order.
    fn pending(&self) -> CloneguardResult<Vec<RepoTask>>;

    /// Record a finished scan: persist the detected identity and clear the
    /// active flag. `project_id`/`project_version` may be `None` when the
    /// scan produced no materializable primary.
    fn complete(
        &mut self,
        id: &str,
        project_id: Option<&str>,
        project_version: Option<&str>,
    ) -> CloneguardResult<()>;
}

/// In-memory worklist for tests and library embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorklist {
    tasks: Vec<RepoTask>,
}

impl MemoryWorklist {
    pub fn new(tasks: Vec<RepoTask>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[RepoTask] {
        &self.tasks
    }
}

impl Worklist for MemoryWorklist {
    fn pending(&self) -> CloneguardResult<Vec<RepoTask>> {
        Ok(self.tasks.iter().filter(|t| t.active).cloned().collect())
    }

    fn complete(
        &mut self,
        id: &str,
        project_id: Option<&str>,
        project_version: Option<&str>,
    ) -> CloneguardResult<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CloneguardError::WorklistError(format!("unknown task id {id}")))?;
        task.active = false;
        task.project_id = project_id.map(str::to_string);
        task.project_version = project_version.map(str::to_string);
        Ok(())
    }
}
