//! The import run itself: discovery, per-file execution, aggregation,
//! notification and the end-of-run heartbeat.

use std::sync::Arc;
use std::time::Duration;

use stevedore_core::{
    DiscoveredFile, EnvironmentError, ImportEnvironment, StatusBoard,
};
use stevedore_logs::LogStore;
use stevedore_notify::{Heartbeat, Notifier};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::parser::OutputParser;
use crate::report::{FileOutcome, RunReport};

/// Upper bound on a single import command; a hung command must not block
/// the run forever.
pub const DEFAULT_EXEC_DEADLINE: Duration = Duration::from_secs(60 * 60);

const IMPORT_EXTENSION: &str = ".json";
const NOTIFICATION_TITLE: &str = "Data Imported";
const FAILURE_TITLE: &str = "Import Failed";

#[derive(Error, Debug)]
pub enum ImportError {
    /// A trigger arrived while a run was active; triggers are rejected,
    /// not queued.
    #[error("an import run is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

/// Per-service settings fixed at wiring time.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Remote directory holding the importable files.
    pub import_dir: String,
    /// Public base URL for log links in notifications.
    pub base_url: String,
    /// Deadline for each import command.
    pub exec_deadline: Duration,
}

pub struct ImportService {
    environment: Arc<dyn ImportEnvironment>,
    logs: Arc<LogStore>,
    board: Arc<StatusBoard>,
    notifier: Option<Arc<dyn Notifier>>,
    heartbeat: Option<Heartbeat>,
    parser: OutputParser,
    settings: RunSettings,
    run_lock: Mutex<()>,
}

impl ImportService {
    pub fn new(
        environment: Arc<dyn ImportEnvironment>,
        logs: Arc<LogStore>,
        board: Arc<StatusBoard>,
        notifier: Option<Arc<dyn Notifier>>,
        heartbeat: Option<Heartbeat>,
        settings: RunSettings,
    ) -> Self {
        Self {
            environment,
            logs,
            board,
            notifier,
            heartbeat,
            parser: OutputParser::new(),
            settings,
            run_lock: Mutex::new(()),
        }
    }

    /// Drive one complete run. At most one run is active at a time; the
    /// status board reflects the run on every exit path through its RAII
    /// guard.
    pub async fn run_once(&self) -> Result<RunReport, ImportError> {
        let Ok(_run) = self.run_lock.try_lock() else {
            warn!("import already running, trigger rejected");
            return Err(ImportError::AlreadyRunning);
        };
        let _status = self.board.begin_run();

        info!("starting import run");
        let result = self.execute_run().await;
        match &result {
            Ok(report) => {
                let totals = report.totals();
                info!(
                    files = report.outcomes().len(),
                    messages = totals.messages,
                    warnings = totals.warnings,
                    errors = totals.errors,
                    "import run finished"
                );
                self.ping_heartbeat().await;
            }
            Err(e) => {
                error!(error = %e, "import run aborted");
                self.notify_run_failure(e).await;
            }
        }
        result
    }

    async fn execute_run(&self) -> Result<RunReport, ImportError> {
        let files = self
            .environment
            .list_files(&self.settings.import_dir, IMPORT_EXTENSION)
            .await?;

        let mut report = RunReport::default();
        if files.is_empty() {
            info!(dir = %self.settings.import_dir, "no importable files found");
            return Ok(report);
        }

        // Uniform progress labels: zero-padded index, padded file name.
        let total = files.len();
        let index_width = total.to_string().len();
        let name_width = files.iter().map(|f| f.name.len()).max().unwrap_or(0);

        for (index, file) in files.into_iter().enumerate() {
            let label = format!(
                "[{:0index_width$}/{:0index_width$}] {:<name_width$}",
                index + 1,
                total,
                file.name,
            );
            let outcome = self.import_file(file).await?;
            match &outcome {
                FileOutcome::Imported { counts, .. } => {
                    info!(
                        "{label} ok | {} new {} warnings {} errors",
                        counts.messages, counts.warnings, counts.errors
                    );
                }
                FileOutcome::Failed { reason, log_id, .. } => match log_id {
                    Some(id) => warn!("{label} failed | {reason} (log {id})"),
                    None => warn!("{label} failed | {reason}"),
                },
            }
            report.push(outcome);
        }

        self.notify_report(&report).await;
        Ok(report)
    }

    /// Import one file. Per-file failures become `FileOutcome::Failed`
    /// and never abort the run; only a lost connection to the execution
    /// target is escalated.
    async fn import_file(&self, file: DiscoveredFile) -> Result<FileOutcome, ImportError> {
        let cmd = vec![
            "php".to_string(),
            "artisan".to_string(),
            "importer:import".to_string(),
            file.path.clone(),
        ];

        let output = match self
            .environment
            .exec(cmd, self.settings.exec_deadline)
            .await
        {
            Ok(output) => output,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                return Ok(self
                    .failed_outcome(file, e.to_string(), None, None)
                    .await);
            }
        };

        match self.parser.parse(&output.stdout) {
            Ok(counts) => Ok(FileOutcome::Imported { file, counts }),
            Err(e) => Ok(self
                .failed_outcome(
                    file,
                    e.to_string(),
                    Some(output.exit_code),
                    Some(output.stdout),
                )
                .await),
        }
    }

    /// Build a failure outcome, persisting the captured output (if any)
    /// as a log artifact. A failing store is logged and the outcome kept
    /// without a log id.
    async fn failed_outcome(
        &self,
        file: DiscoveredFile,
        reason: String,
        exit_code: Option<i64>,
        stdout: Option<String>,
    ) -> FileOutcome {
        let log_id = match stdout.filter(|s| !s.is_empty()) {
            Some(captured) => match self.logs.store(&captured).await {
                Ok(id) => Some(id),
                Err(e) => {
                    error!(file = %file.name, error = %e, "failed to store log artifact");
                    None
                }
            },
            None => None,
        };

        FileOutcome::Failed {
            file,
            reason,
            exit_code,
            log_id,
        }
    }

    async fn notify_report(&self, report: &RunReport) {
        if report.is_quiet() {
            info!("no new messages, no notification sent");
            return;
        }
        let Some(notifier) = &self.notifier else {
            return;
        };

        let message = report.summary_lines(&self.settings.base_url).join("\n");
        if let Err(e) = notifier.send(NOTIFICATION_TITLE, &message).await {
            warn!(error = %e, "failed to deliver run notification");
        }
    }

    /// Run-level failures are announced too, not only per-file ones.
    async fn notify_run_failure(&self, error: &ImportError) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let message = format!("Import run aborted: {error}");
        if let Err(e) = notifier.send(FAILURE_TITLE, &message).await {
            warn!(error = %e, "failed to deliver failure notification");
        }
    }

    async fn ping_heartbeat(&self) {
        if let Some(heartbeat) = &self.heartbeat {
            heartbeat.ping().await;
        }
    }
}
