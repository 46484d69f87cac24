//! Local Terraform adapter
//!
//! Prepares the working directory (`init`, `validate`, `refresh`) and reads
//! outputs with `terraform output -raw <key>`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{display_command, CommandRunner, LocalOutputs, SystemRunner};
use crate::error::{ResolveError, Result};

pub const DEFAULT_TERRAFORM: &str = "terraform";

/// Run in order before any output is read; the first failure aborts
pub const PREPARE_STEPS: [&[&str]; 3] = [
    &["init", "-no-color"],
    &["validate", "-no-color"],
    &["refresh", "-no-color"],
];

/// `terraform` CLI driven through a [`CommandRunner`]
pub struct TerraformCli<R = SystemRunner> {
    runner: R,
    program: String,
    timeout: Option<Duration>,
}

impl<R: CommandRunner> TerraformCli<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: DEFAULT_TERRAFORM.to_string(),
            timeout: None,
        }
    }

    /// Use a different binary (path or name on PATH)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Per-command timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run one command, failing on non-zero exit
    async fn exec(&self, args: &[&str]) -> Result<String> {
        let command = display_command(&self.program, args);
        debug!(command = %command, "Running Terraform command");

        let output = self.runner.run(&self.program, args, self.timeout).await?;

        debug!(command = %command, stdout = %output.stdout, "Command stdout");
        if !output.stderr.is_empty() {
            debug!(command = %command, stderr = %output.stderr, "Command stderr");
        }

        if !output.is_success() {
            return Err(ResolveError::CommandExecution {
                command,
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl<R: CommandRunner> LocalOutputs for TerraformCli<R> {
    async fn prepare(&self) -> Result<()> {
        for step in PREPARE_STEPS {
            info!(command = %display_command(&self.program, step), "Preparing working directory");
            self.exec(step).await?;
        }
        Ok(())
    }

    async fn output(&self, key: &str) -> Result<String> {
        let stdout = self.exec(&["output", "-raw", key]).await?;
        Ok(stdout.trim_end().to_string())
    }
}
