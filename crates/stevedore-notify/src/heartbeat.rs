//! Best-effort end-of-run liveness ping.

use tracing::{debug, warn};

pub struct Heartbeat {
    url: String,
    client: reqwest::Client,
}

impl Heartbeat {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Issue the GET. Failures are logged and swallowed; a missed
    /// heartbeat must never affect the run that triggered it.
    pub async fn ping(&self) {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(url = %self.url, "heartbeat delivered");
            }
            Ok(response) => {
                warn!(url = %self.url, status = %response.status(), "heartbeat rejected");
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "heartbeat failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn pings_the_configured_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Heartbeat::new(server.uri()).ping().await;
    }

    #[tokio::test]
    async fn non_success_status_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        Heartbeat::new(server.uri()).ping().await;
    }

    #[tokio::test]
    async fn transport_errors_are_swallowed() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let heartbeat = Heartbeat {
            url: "http://192.0.2.1:1/ping".to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(250))
                .build()
                .unwrap(),
        };
        heartbeat.ping().await;
    }
}
