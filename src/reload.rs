// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS server reload
//!
//! After a zone file is committed the DNS server has to be told to re-read it.
//! [`ZoneReloader`] is the seam for that: [`CommandReloader`] runs a fixed
//! external command (by default `sudo systemctl reload named.service`) and
//! [`crate::rndc::RndcExecutor`] runs `rndc reload <zone>`.
//!
//! The command line is fixed at startup. Nothing from a request ever reaches it,
//! and it is never handed to a shell.

use std::process::ExitStatus;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error};

use crate::metrics;

/// Default reload command
pub const DEFAULT_RELOAD_COMMAND: &str = "/usr/bin/sudo /usr/bin/systemctl reload named.service";

/// Default bound on a single reload
pub const DEFAULT_RELOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Reload errors
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Failed to execute reload command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Reload command {program} failed with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Reload command {program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Invalid reload command: {0}")]
    InvalidCommand(String),
}

/// Something that can make the DNS server pick up the committed zone
#[async_trait::async_trait]
pub trait ZoneReloader: Send + Sync {
    /// Reload the zone, returning any diagnostic output on success
    async fn reload(&self) -> Result<String, ReloadError>;

    /// Short name for logs and metrics
    fn name(&self) -> &str;
}

/// Run a program, bounded by `timeout`, and return its stdout
///
/// A non-zero exit status or a timeout is a [`ReloadError`]. The child is killed
/// if it outlives the timeout. Callers record their own metrics.
pub(crate) async fn run_bounded(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<String, ReloadError> {
    debug!("Executing command: {} {:?}", program, args);

    let start = Instant::now();
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            error!("Failed to execute {}: {}", program, e);
            return Err(ReloadError::Spawn {
                program: program.to_string(),
                source: e,
            });
        }
        Err(_) => {
            error!("Command {} timed out after {:?}", program, timeout);
            return Err(ReloadError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("Command {} failed ({}): {}", program, output.status, stderr);
        return Err(ReloadError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    debug!(
        "Command {} finished in {:.3}s: {}",
        program,
        start.elapsed().as_secs_f64(),
        stdout
    );
    Ok(stdout)
}

/// Reload by running a fixed external command
#[derive(Debug, Clone)]
pub struct CommandReloader {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) timeout: Duration,
}

impl CommandReloader {
    /// Create a reloader for `program` with `args`
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build a reloader from a whitespace separated command line
    ///
    /// The line is split on whitespace only; quoting is not interpreted.
    pub fn from_command_line(command: &str, timeout: Duration) -> Result<Self, ReloadError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ReloadError::InvalidCommand("reload command is empty".to_string()))?;
        Ok(Self::new(program, parts.collect(), timeout))
    }
}

#[async_trait::async_trait]
impl ZoneReloader for CommandReloader {
    async fn reload(&self) -> Result<String, ReloadError> {
        let start = Instant::now();
        let result = run_bounded(&self.program, &self.args, self.timeout).await;
        metrics::record_reload(self.name(), result.is_ok(), start.elapsed().as_secs_f64());
        result
    }

    fn name(&self) -> &str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line_default() {
        let reloader =
            CommandReloader::from_command_line(DEFAULT_RELOAD_COMMAND, DEFAULT_RELOAD_TIMEOUT)
                .unwrap();
        assert_eq!(reloader.program, "/usr/bin/sudo");
        assert_eq!(
            reloader.args,
            vec!["/usr/bin/systemctl", "reload", "named.service"]
        );
        assert_eq!(reloader.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_command_line_empty() {
        let result = CommandReloader::from_command_line("   ", DEFAULT_RELOAD_TIMEOUT);
        assert!(matches!(result, Err(ReloadError::InvalidCommand(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_reloader_success() {
        let reloader = CommandReloader::new(
            "/bin/echo",
            vec!["reloaded".to_string()],
            Duration::from_secs(5),
        );
        assert_eq!(reloader.reload().await.unwrap().trim(), "reloaded");
    }

    // Negative test cases

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_reloader_non_zero_exit() {
        let reloader = CommandReloader::new(
            "/bin/sh",
            vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()],
            Duration::from_secs(5),
        );

        match reloader.reload().await {
            Err(ReloadError::Failed { status, stderr, .. }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_reloader_timeout() {
        let reloader = CommandReloader::new(
            "/bin/sleep",
            vec!["5".to_string()],
            Duration::from_millis(100),
        );

        let result = reloader.reload().await;
        assert!(matches!(result, Err(ReloadError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_command_reloader_missing_program() {
        let reloader = CommandReloader::new(
            "/nonexistent/reload-named",
            Vec::new(),
            Duration::from_secs(1),
        );

        let result = reloader.reload().await;
        assert!(matches!(result, Err(ReloadError::Spawn { .. })));
    }
}
