//! Subprocess execution
//!
//! Runs a program with piped stdio and waits for it, with an optional
//! timeout. On timeout the child is killed (via `kill_on_drop`).

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use wait_timeout::ChildExt;

use super::{CommandOutput, CommandRunner};
use crate::error::{ResolveError, Result};

/// Timeout for CLI availability check
const CLI_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs real processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    working_dir: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Check if `program version` exits successfully within 5s
    pub fn is_available(&self, program: &str) -> bool {
        let mut cmd = std::process::Command::new(program);
        cmd.arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.spawn()
            .and_then(|mut child| match child.wait_timeout(CLI_CHECK_TIMEOUT)? {
                Some(status) => Ok(status.success()),
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    Ok(false)
                }
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let spawn_error = |e: std::io::Error| ResolveError::CommandExecution {
            command: display_command(program, args),
            exit_code: None,
            stdout: String::new(),
            stderr: e.to_string(),
        };

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| ResolveError::CommandTimeout {
                    command: display_command(program, args),
                    timeout: limit,
                })?
                .map_err(spawn_error)?,
            None => cmd.output().await.map_err(spawn_error)?,
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// Command line as shown in logs and errors
pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
