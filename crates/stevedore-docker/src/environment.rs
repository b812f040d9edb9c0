//! Exec-and-wait plus directory snapshots against a named container.

use std::time::Duration;

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::query_parameters::DownloadFromContainerOptionsBuilder;
use bollard::Docker;
use futures::StreamExt;
use stevedore_core::{DiscoveredFile, EnvironmentError, ExecOutput, ImportEnvironment};
use tracing::debug;

use crate::archive::files_from_archive;

/// Import environment backed by the local Docker daemon, scoped to one
/// container for the process lifetime.
pub struct DockerEnvironment {
    docker: Docker,
    container: String,
    exec_user: Option<String>,
}

impl DockerEnvironment {
    pub fn new(
        container: impl Into<String>,
        exec_user: Option<String>,
    ) -> Result<Self, EnvironmentError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EnvironmentError::Connection(e.to_string()))?;
        Ok(Self::with_docker(docker, container, exec_user))
    }

    /// Create with an explicit client, e.g. one connected over TCP.
    pub fn with_docker(
        docker: Docker,
        container: impl Into<String>,
        exec_user: Option<String>,
    ) -> Self {
        Self {
            docker,
            container: container.into(),
            exec_user,
        }
    }
}

/// API-level errors keep their layer-specific variant; everything else
/// means the daemon itself is unreachable.
fn classify(err: DockerError, api: fn(String) -> EnvironmentError) -> EnvironmentError {
    match err {
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => api(format!("{status_code}: {message}")),
        other => EnvironmentError::Connection(other.to_string()),
    }
}

#[async_trait]
impl ImportEnvironment for DockerEnvironment {
    async fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> Result<Vec<DiscoveredFile>, EnvironmentError> {
        let options = DownloadFromContainerOptionsBuilder::new().path(dir).build();
        let mut stream = self
            .docker
            .download_from_container(&self.container, Some(options));

        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| classify(e, EnvironmentError::Transfer))?;
            bytes.extend_from_slice(&chunk);
        }

        let files = files_from_archive(&bytes, dir, extension)?;
        debug!(
            container = %self.container,
            dir,
            count = files.len(),
            "directory snapshot retrieved"
        );
        Ok(files)
    }

    async fn exec(
        &self,
        cmd: Vec<String>,
        deadline: Duration,
    ) -> Result<ExecOutput, EnvironmentError> {
        let exec = self
            .docker
            .create_exec(
                &self.container,
                CreateExecOptions {
                    cmd: Some(cmd),
                    user: self.exec_user.clone(),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| classify(e, EnvironmentError::CreateExec))?;

        let attached = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| classify(e, EnvironmentError::Attach))?;
        let StartExecResults::Attached { mut output, .. } = attached else {
            return Err(EnvironmentError::Attach(
                "exec session started detached".to_string(),
            ));
        };

        // Demultiplex the combined stream into separate buffers until the
        // command terminates or the deadline fires.
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let drain = async {
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        stdout.extend_from_slice(&message);
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        stderr.extend_from_slice(&message);
                    }
                    Ok(_) => {}
                    Err(e) => return Err(classify(e, EnvironmentError::Attach)),
                }
            }
            Ok(())
        };
        tokio::time::timeout(deadline, drain)
            .await
            .map_err(|_| EnvironmentError::DeadlineExceeded { after: deadline })??;

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| classify(e, EnvironmentError::Inspect))?;
        let exit_code = inspect.exit_code.unwrap_or(-1);

        debug!(container = %self.container, exit_code, "exec session finished");
        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
        })
    }
}
