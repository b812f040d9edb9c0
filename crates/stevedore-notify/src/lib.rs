//! Outbound pushes: run-summary notifications and the end-of-run
//! heartbeat ping. Both are best-effort from the caller's point of view;
//! failures are surfaced as errors here and logged upstream, never
//! escalated into a run failure.

mod gotify;
mod heartbeat;

pub use gotify::GotifyNotifier;
pub use heartbeat::Heartbeat;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification endpoint returned {status}")]
    Status { status: reqwest::StatusCode },
}

/// Delivery channel for run summaries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}
