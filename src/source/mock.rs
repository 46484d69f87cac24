//! In-memory adapters for testing
//!
//! Scripted responses, no processes or network. Every fake records its calls
//! so tests can assert what was (and was not) invoked.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    display_command, CommandOutput, CommandRunner, LocalOutputs, RemoteOutputs, WorkspaceOutputs,
};
use crate::error::{ResolveError, Result};

/// Scripted outcome for one command line
#[derive(Debug, Clone)]
pub enum Scripted {
    Output(CommandOutput),
    Timeout,
    NotFound,
}

/// [`CommandRunner`] answering from a script keyed by the joined args
///
/// Unscripted commands succeed with empty stdout.
#[derive(Debug, Default)]
pub struct FakeRunner {
    script: HashMap<String, Scripted>,
    calls: Mutex<Vec<String>>,
    timeouts: Mutex<Vec<Option<Duration>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for `args` (e.g. `"output -raw vpc_id"`)
    pub fn script(mut self, args: impl Into<String>, outcome: Scripted) -> Self {
        self.script.insert(args.into(), outcome);
        self
    }

    /// Full command lines run so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Timeout passed with each call
    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.timeouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let command = display_command(program, args);
        self.calls.lock().unwrap().push(command.clone());
        self.timeouts.lock().unwrap().push(timeout);

        match self.script.get(&args.join(" ")) {
            Some(Scripted::Output(out)) => Ok(out.clone()),
            Some(Scripted::Timeout) => Err(ResolveError::CommandTimeout {
                command,
                timeout: timeout.unwrap_or_default(),
            }),
            Some(Scripted::NotFound) => Err(ResolveError::CommandExecution {
                command,
                exit_code: None,
                stdout: String::new(),
                stderr: "No such file or directory (os error 2)".to_string(),
            }),
            None => Ok(CommandOutput::success("")),
        }
    }
}

/// [`LocalOutputs`] backed by a map
#[derive(Debug, Default)]
pub struct MockLocal {
    values: HashMap<String, String>,
    fail_prepare: bool,
    prepare_calls: Mutex<usize>,
    lookups: Mutex<Vec<String>>,
}

impl MockLocal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Make [`LocalOutputs::prepare`] fail like a broken `terraform init`
    pub fn failing_prepare(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    pub fn prepare_calls(&self) -> usize {
        *self.prepare_calls.lock().unwrap()
    }

    /// Keys looked up so far
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocalOutputs for MockLocal {
    async fn prepare(&self) -> Result<()> {
        *self.prepare_calls.lock().unwrap() += 1;
        if self.fail_prepare {
            return Err(ResolveError::CommandExecution {
                command: "terraform init -no-color".to_string(),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "Error: Failed to get existing workspaces".to_string(),
            });
        }
        Ok(())
    }

    async fn output(&self, key: &str) -> Result<String> {
        self.lookups.lock().unwrap().push(key.to_string());
        match self.values.get(key) {
            Some(value) => Ok(value.clone()),
            None => Err(ResolveError::CommandExecution {
                command: display_command("terraform", &["output", "-raw", key]),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: format!("Error: Output \"{key}\" not found"),
            }),
        }
    }
}

/// [`RemoteOutputs`] backed by per-workspace maps
#[derive(Debug, Default)]
pub struct MockRemote {
    workspaces: HashMap<String, WorkspaceOutputs>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace(
        mut self,
        workspace_id: impl Into<String>,
        outputs: WorkspaceOutputs,
    ) -> Self {
        self.workspaces.insert(workspace_id.into(), outputs);
        self
    }

    /// Workspace ids fetched so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteOutputs for MockRemote {
    async fn workspace_outputs(&self, workspace_id: &str) -> Result<WorkspaceOutputs> {
        self.calls.lock().unwrap().push(workspace_id.to_string());
        self.workspaces
            .get(workspace_id)
            .cloned()
            .ok_or_else(|| ResolveError::ApiResponse {
                url: format!("mock://workspaces/{workspace_id}/current-state-version"),
                reason: "HTTP 404 Not Found, errors: not found".to_string(),
            })
    }
}
