//! Core building blocks shared across the stevedore crates:
//! environment configuration, the remote-environment capability contract,
//! and the process-wide run status.

pub mod config;
pub mod environment;
pub mod status;

pub use config::{ConfigError, ImportConfig};
pub use environment::{DiscoveredFile, EnvironmentError, ExecOutput, ImportEnvironment};
pub use status::{RunGuard, StatusBoard, StatusSnapshot};
