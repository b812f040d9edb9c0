//! Environment-variable configuration for the import agent.
//!
//! Every key has explicit required/default semantics and each resolved
//! value is logged at startup so a misconfigured deployment is visible
//! in the first lines of output.

use std::path::PathBuf;
use std::str::FromStr;

use cron::Schedule;
use thiserror::Error;
use tracing::info;

/// Daily at midnight, in the six-field cron dialect.
pub const DEFAULT_CRON_SCHEDULE: &str = "0 0 0 * * *";
pub const DEFAULT_GOTIFY_PRIORITY: i32 = 5;
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_LOGS_DIR: &str = "/logs";
pub const DEFAULT_EXEC_USER: &str = "www-data";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {key} is not set")]
    Missing { key: &'static str },

    #[error("invalid value {value:?} for {key}: {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// Resolved process configuration, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Name of the container the import command runs in.
    pub container: String,
    /// Directory inside the container holding the importable files.
    pub import_dir: String,
    /// Six-field cron expression driving recurring imports.
    pub cron_schedule: String,
    /// Push endpoint for run summaries; `None` disables notifications.
    pub gotify_url: Option<String>,
    pub gotify_priority: i32,
    /// End-of-run liveness GET target; `None` disables the ping.
    pub heartbeat_url: Option<String>,
    /// Run one import before the recurring schedule starts.
    pub import_on_startup: bool,
    pub http_port: u16,
    /// Directory for per-failure log artifacts.
    pub logs_dir: PathBuf,
    /// Public base URL used when rendering log links in notifications.
    pub base_url: String,
    /// User the import command is executed as inside the container.
    pub exec_user: String,
}

impl ImportConfig {
    /// Load the configuration from the process environment.
    ///
    /// Missing required keys and malformed values are both fatal; the
    /// caller is expected to exit with the error message.
    pub fn from_env() -> Result<Self, ConfigError> {
        let container = required("STEVEDORE_CONTAINER")?;
        let import_dir = required("STEVEDORE_IMPORT_DIR")?;
        let cron_schedule = string_or("STEVEDORE_CRON", DEFAULT_CRON_SCHEDULE);
        Schedule::from_str(&cron_schedule).map_err(|e| ConfigError::Invalid {
            key: "STEVEDORE_CRON",
            value: cron_schedule.clone(),
            message: e.to_string(),
        })?;

        let gotify_url = optional("STEVEDORE_GOTIFY_URL");
        let gotify_priority = parsed_or("STEVEDORE_GOTIFY_PRIORITY", DEFAULT_GOTIFY_PRIORITY)?;
        let heartbeat_url = optional("STEVEDORE_HEARTBEAT_URL");
        let import_on_startup = parsed_or("STEVEDORE_IMPORT_ON_STARTUP", false)?;
        let http_port = parsed_or("STEVEDORE_HTTP_PORT", DEFAULT_HTTP_PORT)?;
        let logs_dir = PathBuf::from(string_or("STEVEDORE_LOGS_DIR", DEFAULT_LOGS_DIR));
        let base_url = string_or(
            "STEVEDORE_BASE_URL",
            &format!("http://localhost:{}", http_port),
        );
        let exec_user = string_or("STEVEDORE_EXEC_USER", DEFAULT_EXEC_USER);

        Ok(Self {
            container,
            import_dir,
            cron_schedule,
            gotify_url,
            gotify_priority,
            heartbeat_url,
            import_on_startup,
            http_port,
            logs_dir,
            base_url,
            exec_user,
        })
    }

    /// The parsed recurring schedule. `from_env` already validated the
    /// expression, so this only fails for hand-built configurations.
    pub fn schedule(&self) -> Result<Schedule, ConfigError> {
        Schedule::from_str(&self.cron_schedule).map_err(|e| ConfigError::Invalid {
            key: "STEVEDORE_CRON",
            value: self.cron_schedule.clone(),
            message: e.to_string(),
        })
    }
}

/// Read a variable, treating empty values as unset.
fn lookup(key: &'static str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match lookup(key) {
        Some(value) => {
            info!("{}: {:?}", key, value);
            Ok(value)
        }
        None => Err(ConfigError::Missing { key }),
    }
}

fn optional(key: &'static str) -> Option<String> {
    match lookup(key) {
        Some(value) => {
            info!("{}: {:?}", key, value);
            Some(value)
        }
        None => {
            info!("{}: unset (disabled)", key);
            None
        }
    }
}

fn string_or(key: &'static str, default: &str) -> String {
    match lookup(key) {
        Some(value) => {
            info!("{}: {:?}", key, value);
            value
        }
        None => {
            info!("{}: {:?} (default)", key, default);
            default.to_string()
        }
    }
}

fn parsed_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => {
            let parsed = value.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: value.clone(),
                message: e.to_string(),
            })?;
            info!("{}: {}", key, parsed);
            Ok(parsed)
        }
        None => {
            info!("{}: {} (default)", key, default);
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global, so tests touching them
    // must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_KEYS: &[&str] = &[
        "STEVEDORE_CONTAINER",
        "STEVEDORE_IMPORT_DIR",
        "STEVEDORE_CRON",
        "STEVEDORE_GOTIFY_URL",
        "STEVEDORE_GOTIFY_PRIORITY",
        "STEVEDORE_HEARTBEAT_URL",
        "STEVEDORE_IMPORT_ON_STARTUP",
        "STEVEDORE_HTTP_PORT",
        "STEVEDORE_LOGS_DIR",
        "STEVEDORE_BASE_URL",
        "STEVEDORE_EXEC_USER",
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("STEVEDORE_CONTAINER", "app");
        std::env::set_var("STEVEDORE_IMPORT_DIR", "/import");

        let config = ImportConfig::from_env().unwrap();
        assert_eq!(config.container, "app");
        assert_eq!(config.import_dir, "/import");
        assert_eq!(config.cron_schedule, DEFAULT_CRON_SCHEDULE);
        assert_eq!(config.gotify_url, None);
        assert_eq!(config.gotify_priority, DEFAULT_GOTIFY_PRIORITY);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.base_url, "http://localhost:80");
        assert_eq!(config.exec_user, DEFAULT_EXEC_USER);
        assert!(!config.import_on_startup);
        assert!(config.schedule().is_ok());
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("STEVEDORE_IMPORT_DIR", "/import");

        let err = ImportConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                key: "STEVEDORE_CONTAINER"
            }
        ));
    }

    #[test]
    fn empty_value_counts_as_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("STEVEDORE_CONTAINER", "app");
        std::env::set_var("STEVEDORE_IMPORT_DIR", "/import");
        std::env::set_var("STEVEDORE_GOTIFY_URL", "");

        let config = ImportConfig::from_env().unwrap();
        assert_eq!(config.gotify_url, None);
    }

    #[test]
    fn malformed_values_are_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("STEVEDORE_CONTAINER", "app");
        std::env::set_var("STEVEDORE_IMPORT_DIR", "/import");
        std::env::set_var("STEVEDORE_HTTP_PORT", "not-a-port");

        let err = ImportConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "STEVEDORE_HTTP_PORT",
                ..
            }
        ));
    }

    #[test]
    fn invalid_cron_expression_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("STEVEDORE_CONTAINER", "app");
        std::env::set_var("STEVEDORE_IMPORT_DIR", "/import");
        std::env::set_var("STEVEDORE_CRON", "@midnight");

        let err = ImportConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "STEVEDORE_CRON",
                ..
            }
        ));
    }

    #[test]
    fn base_url_default_tracks_configured_port() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("STEVEDORE_CONTAINER", "app");
        std::env::set_var("STEVEDORE_IMPORT_DIR", "/import");
        std::env::set_var("STEVEDORE_HTTP_PORT", "8080");

        let config = ImportConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
    }
}
