//! Container health probe against the local status endpoint.

use std::time::Duration;

use clap::Args;
use stevedore_core::config::DEFAULT_HTTP_PORT;

#[derive(Args, Default)]
pub struct HealthcheckCommand {}

impl HealthcheckCommand {
    /// Exits the process directly: 0 on HTTP 200, 1 otherwise. Prints
    /// nothing, the exit code is the whole contract.
    pub fn execute(self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        let healthy = runtime.block_on(probe());
        std::process::exit(if healthy { 0 } else { 1 });
    }
}

async fn probe() -> bool {
    let port = std::env::var("STEVEDORE_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_HTTP_PORT);
    let url = format!("http://localhost:{port}/status");

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(&url).send().await {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(_) => false,
    }
}
