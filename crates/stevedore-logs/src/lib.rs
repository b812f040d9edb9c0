//! Flat-file store for per-failure log artifacts.
//!
//! Artifacts are keyed by a collision-resistant random identifier and
//! written once as `{id}.log`; retention is left to an external policy.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LogStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid log identifier {0:?}")]
    InvalidId(String),

    #[error("log {0} not found")]
    NotFound(String),
}

pub struct LogStore {
    root: PathBuf,
}

impl LogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist `content` under a fresh identifier and return it.
    pub async fn store(&self, content: &str) -> Result<String, LogStoreError> {
        fs::create_dir_all(&self.root).await?;
        let id = Uuid::new_v4().to_string();
        let path = self.artifact_path(&id);
        fs::write(&path, content).await?;
        debug!(id = %id, path = %path.display(), "stored log artifact");
        Ok(id)
    }

    /// Read an artifact back by identifier.
    pub async fn read(&self, id: &str) -> Result<String, LogStoreError> {
        if !is_valid_id(id) {
            return Err(LogStoreError::InvalidId(id.to_string()));
        }
        match fs::read_to_string(self.artifact_path(id)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(LogStoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn artifact_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.log"))
    }
}

/// Identifiers are plain path segments; anything else could escape the
/// store directory.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
