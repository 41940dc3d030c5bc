//! Build Runner
//!
//! Drives `react-native run-android`, which builds the APK, installs it on
//! the attached device and starts it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{AppInstaller, BuildError};

#[cfg(windows)]
const REACT_NATIVE_CLI: &str = "react-native.cmd";
#[cfg(not(windows))]
const REACT_NATIVE_CLI: &str = "react-native";

/// Build progress derived from CLI output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMessage {
    Output(String),
    Installing(String),
    Launching,
    Warning(String),
    Completed,
    Failed(String),
}

/// Classify one line of `run-android` output
pub fn parse_run_android_output(line: &str) -> BuildMessage {
    let trimmed = line.trim();
    if let Some(apk) = trimmed.strip_prefix("Installing ") {
        BuildMessage::Installing(apk.to_string())
    } else if trimmed.starts_with("Starting the app") {
        BuildMessage::Launching
    } else if trimmed.starts_with("BUILD FAILED") {
        BuildMessage::Failed(trimmed.to_string())
    } else {
        BuildMessage::Output(trimmed.to_string())
    }
}

/// Runs the React Native CLI for a project
pub struct ReactNativeRunner {
    command: Option<PathBuf>,
    progress: Option<mpsc::Sender<BuildMessage>>,
}

impl ReactNativeRunner {
    /// Use the project-local CLI if installed, otherwise the one on PATH
    pub fn new() -> Self {
        Self {
            command: None,
            progress: None,
        }
    }

    /// Use an explicit CLI executable
    pub fn with_command(mut self, command: PathBuf) -> Self {
        self.command = Some(command);
        self
    }

    /// Forward build progress to a channel
    pub fn with_progress(mut self, tx: mpsc::Sender<BuildMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Resolve the CLI executable for a project
    pub fn cli_path(&self, project_root: &Path) -> PathBuf {
        if let Some(ref command) = self.command {
            return command.clone();
        }

        let local = project_root.join("node_modules").join(".bin").join(REACT_NATIVE_CLI);
        if local.exists() {
            local
        } else {
            PathBuf::from(REACT_NATIVE_CLI)
        }
    }

    async fn report(&self, msg: BuildMessage) {
        if let Some(ref tx) = self.progress {
            let _ = tx.send(msg).await;
        }
    }
}

impl Default for ReactNativeRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward each line of a child stream to the log and the progress channel
fn forward_lines<R>(stream: R, is_stderr: bool, tx: Option<mpsc::Sender<BuildMessage>>) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let msg = if is_stderr {
                warn!("run-android: {}", line);
                BuildMessage::Warning(line)
            } else {
                debug!("run-android: {}", line);
                parse_run_android_output(&line)
            };
            if let Some(ref tx) = tx {
                let _ = tx.send(msg).await;
            }
        }
    })
}

#[async_trait]
impl AppInstaller for ReactNativeRunner {
    async fn build_and_install(&self, project_root: &Path) -> Result<(), BuildError> {
        let cli = self.cli_path(project_root);
        info!("Building and installing {:?} with {:?} run-android", project_root, cli);

        let mut child = Command::new(&cli)
            .current_dir(project_root)
            .arg("run-android")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    BuildError::ToolchainNotFound(format!("{} not found", cli.display()))
                }
                _ => BuildError::Io(e),
            })?;

        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(forward_lines(stdout, false, self.progress.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(forward_lines(stderr, true, self.progress.clone()));
        }

        let status = child.wait().await?;
        for forwarder in forwarders {
            let _ = forwarder.await;
        }

        if !status.success() {
            let reason = format!("run-android exited with {}", status);
            self.report(BuildMessage::Failed(reason.clone())).await;
            return Err(BuildError::BuildFailed(reason));
        }

        self.report(BuildMessage::Completed).await;
        info!("App built and installed");
        Ok(())
    }
}
