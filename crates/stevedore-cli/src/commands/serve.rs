//! The long-running service: status server, startup import, schedule.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use stevedore_core::{ImportConfig, ImportEnvironment, StatusBoard};
use stevedore_docker::DockerEnvironment;
use stevedore_import::{
    ImportScheduler, ImportService, RunSettings, DEFAULT_EXEC_DEADLINE,
};
use stevedore_logs::LogStore;
use stevedore_notify::{GotifyNotifier, Heartbeat, Notifier};
use stevedore_server::AppState;
use tracing::{error, info};

#[derive(Args, Default)]
pub struct ServeCommand {}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(run())
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ImportConfig::from_env().context("configuration error")?;
    let schedule = config.schedule()?;

    let board = Arc::new(StatusBoard::new(schedule.clone()));
    let logs = Arc::new(LogStore::new(&config.logs_dir));
    let environment: Arc<dyn ImportEnvironment> = Arc::new(
        DockerEnvironment::new(&config.container, Some(config.exec_user.clone()))
            .context("failed to connect to the container runtime")?,
    );
    let notifier: Option<Arc<dyn Notifier>> = config
        .gotify_url
        .as_ref()
        .map(|url| Arc::new(GotifyNotifier::new(url.clone(), config.gotify_priority)) as _);
    let heartbeat = config
        .heartbeat_url
        .as_ref()
        .map(|url| Heartbeat::new(url.clone()));

    let service = Arc::new(ImportService::new(
        environment,
        logs.clone(),
        board.clone(),
        notifier,
        heartbeat,
        RunSettings {
            import_dir: config.import_dir.clone(),
            base_url: config.base_url.clone(),
            exec_deadline: DEFAULT_EXEC_DEADLINE,
        },
    ));

    // The server must be observable before the startup import runs, so
    // bind first and only then continue the startup path.
    let state = Arc::new(AppState {
        board: board.clone(),
        logs,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("status endpoint available at {}/status", config.base_url);

    let mut server = tokio::spawn(async move {
        axum::serve(listener, stevedore_server::router(state)).await
    });

    if config.import_on_startup {
        if let Err(e) = service.run_once().await {
            error!(error = %e, "startup import failed");
        }
    }

    let scheduler = ImportScheduler::new(schedule, service);
    tokio::spawn(scheduler.run());

    tokio::select! {
        result = &mut server => {
            let result = result.context("status server task panicked")?;
            result.context("status server exited")?;
            anyhow::bail!("status server stopped unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            server.abort();
        }
    }

    Ok(())
}
