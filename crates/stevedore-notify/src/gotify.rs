//! Gotify-style push delivery.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::{Notifier, NotifyError};

#[derive(Debug, Serialize)]
struct Payload<'a> {
    title: &'a str,
    message: &'a str,
    priority: i32,
    extras: Extras,
}

#[derive(Debug, Serialize)]
struct Extras {
    #[serde(rename = "client::display")]
    display: Display,
}

#[derive(Debug, Serialize)]
struct Display {
    #[serde(rename = "contentType")]
    content_type: &'static str,
}

/// Posts run summaries to a Gotify message endpoint. Summaries are
/// markdown, so the payload carries the matching display hint.
pub struct GotifyNotifier {
    url: String,
    priority: i32,
    client: reqwest::Client,
}

impl GotifyNotifier {
    pub fn new(url: impl Into<String>, priority: i32) -> Self {
        Self {
            url: url.into(),
            priority,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for GotifyNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let payload = Payload {
            title,
            message,
            priority: self.priority,
            extras: Extras {
                display: Display {
                    content_type: "text/markdown",
                },
            },
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status {
                status: response.status(),
            });
        }

        debug!(title, "notification delivered");
        Ok(())
    }
}
