//! Stevedore - container data import runner
//!
//! Single entrypoint: `serve` runs the status server, the optional
//! startup import and the recurring schedule; `healthcheck` probes a
//! running instance's status endpoint for container health checks.

mod commands;

use clap::{Parser, Subcommand};
use commands::{HealthcheckCommand, ServeCommand};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "STEVEDORE_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "STEVEDORE_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the import runner and its status server (default)
    Serve(ServeCommand),
    /// Probe the status endpoint; exit 0 on HTTP 200, 1 otherwise
    Healthcheck(HealthcheckCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise run the stevedore
    // crates at the requested level and quiet the noisy dependencies.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("Invalid RUST_LOG environment variable")
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "stevedore_cli={level},\
             stevedore_core={level},\
             stevedore_docker={level},\
             stevedore_logs={level},\
             stevedore_notify={level},\
             stevedore_import={level},\
             stevedore_server={level},\
             bollard=warn,\
             h2=warn,\
             tower=warn,\
             hyper=warn,\
             reqwest=warn,\
             rustls=warn",
            level = cli.log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    match cli.command {
        Some(Commands::Healthcheck(healthcheck_cmd)) => healthcheck_cmd.execute(),
        Some(Commands::Serve(serve_cmd)) => serve_cmd.execute(),
        None => ServeCommand::default().execute(),
    }
}
