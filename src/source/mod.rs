//! # Source Adapters
//!
//! Each adapter fetches raw output values from one backend:
//!
//! - [`TerraformCli`] - local state via `terraform output -raw`
//! - [`TfcClient`] - Terraform Cloud state-version outputs over HTTP
//! - [`mock`] - in-memory fakes for tests
//!
//! ## Seams
//!
//! | Trait | Production | Fake |
//! |-------|------------|------|
//! | [`CommandRunner`] | [`SystemRunner`] | [`mock::FakeRunner`] |
//! | [`LocalOutputs`] | [`TerraformCli`] | [`mock::MockLocal`] |
//! | [`RemoteOutputs`] | [`TfcClient`] | [`mock::MockRemote`] |
//!
//! The resolver only talks to [`LocalOutputs`] and [`RemoteOutputs`];
//! [`CommandRunner`] sits underneath [`TerraformCli`] so that the exact
//! command lines can be asserted in tests without a Terraform binary.

pub mod mock;
mod process;
mod terraform;
mod tfc;

pub use process::{display_command, SystemRunner};
pub use terraform::{TerraformCli, DEFAULT_TERRAFORM, PREPARE_STEPS};
pub use tfc::{extract_outputs, extract_state_version_id, parse_body, render_value, TfcClient};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// SUBPROCESS CAPABILITY
// ============================================================================

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs an external program to completion
///
/// Returns `Err` only when the process could not be started
/// (`CommandExecution` without exit code) or the timeout elapsed
/// (`CommandTimeout`). A non-zero exit is reported through
/// [`CommandOutput::exit_code`] and left to the caller.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput>;
}

// ============================================================================
// SOURCE TRAITS
// ============================================================================

/// Values read from the local working directory's state
#[async_trait]
pub trait LocalOutputs: Send + Sync {
    /// One-time preparation before any [`output`](LocalOutputs::output) call
    async fn prepare(&self) -> Result<()>;

    /// Raw value of one output, trailing whitespace removed
    async fn output(&self, key: &str) -> Result<String>;
}

/// Values read from a remote workspace
#[async_trait]
pub trait RemoteOutputs: Send + Sync {
    /// All readable outputs of the workspace's current state version
    async fn workspace_outputs(&self, workspace_id: &str) -> Result<WorkspaceOutputs>;
}

/// Output name -> rendered value for one workspace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceOutputs {
    values: HashMap<String, String>,
}

impl WorkspaceOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for WorkspaceOutputs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
