//! Capability contract for the remote environment imports run against.
//!
//! The orchestrator only depends on this trait; the Docker-backed
//! implementation lives in its own crate and tests substitute scripted
//! fakes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The execution target is unreachable. Fatal to the current run:
    /// nothing else against the same target can succeed.
    #[error("cannot reach execution target: {0}")]
    Connection(String),

    #[error("failed to create exec session: {0}")]
    CreateExec(String),

    #[error("failed to attach to exec session: {0}")]
    Attach(String),

    #[error("failed to inspect exec session: {0}")]
    Inspect(String),

    #[error("failed to download directory snapshot: {0}")]
    Transfer(String),

    #[error("malformed directory archive: {0}")]
    Archive(String),

    /// The command did not finish before the deadline. The remote
    /// process is abandoned; its termination is best-effort only.
    #[error("command did not finish within {after:?}")]
    DeadlineExceeded { after: Duration },
}

impl EnvironmentError {
    /// Whether the whole run should be aborted rather than just the
    /// current file. Per-session failures are recovered per file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EnvironmentError::Connection(_))
    }
}

/// A candidate file found in the remote import directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Base name, e.g. `accounts.json`.
    pub name: String,
    /// Absolute path inside the execution target.
    pub path: String,
    /// Extension including the dot, empty when the name has none.
    pub extension: String,
}

/// Captured result of one command invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Forwarded verbatim; interpretation happens upstream.
    pub exit_code: i64,
}

#[async_trait]
pub trait ImportEnvironment: Send + Sync {
    /// Snapshot the contents of `dir` (non-recursive, directories
    /// excluded), filtered by `extension` when non-empty. The returned
    /// order is the processing order and must be stable for a fixed
    /// snapshot.
    async fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> Result<Vec<DiscoveredFile>, EnvironmentError>;

    /// Run `cmd` inside the target with both output streams captured,
    /// waiting until it terminates or `deadline` elapses.
    async fn exec(
        &self,
        cmd: Vec<String>,
        deadline: Duration,
    ) -> Result<ExecOutput, EnvironmentError>;
}
