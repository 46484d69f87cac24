//! Error types with fix suggestions
//!
//! Every variant is fatal for a run. The CLI prints the message on one line
//! followed by the fix suggestion, then exits non-zero.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ENV_API_BASE_URL, ENV_COMMAND_TIMEOUT, ENV_GITHUB_ENV};

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// An optional setting or flag is present but unusable
    #[error("Invalid {setting}: {reason}")]
    InvalidSetting { setting: String, reason: String },

    #[error("Invalid binding: {reason}")]
    InvalidBinding { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Local adapter
    // ─────────────────────────────────────────────────────────────
    #[error(
        "Command '{command}' failed ({}): {}",
        exit_status(.exit_code),
        detail(.stderr, .stdout)
    )]
    CommandExecution {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Command '{command}' timed out after {}s", .timeout.as_secs())]
    CommandTimeout { command: String, timeout: Duration },

    // ─────────────────────────────────────────────────────────────
    // Remote adapter
    // ─────────────────────────────────────────────────────────────
    #[error("API request to {url} failed: {reason}")]
    ApiTransport { url: String, reason: String },

    #[error("API returned an unusable response for {url}: {reason}")]
    ApiResponse { url: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Validation + output
    // ─────────────────────────────────────────────────────────────
    #[error("Outputs empty or missing after resolution: {}", .missing.join(", "))]
    IncompleteResolution { missing: Vec<String> },

    #[error("Failed to write outputs to {}: {source}", .path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_status(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "not started".to_string(),
    }
}

/// First non-empty captured stream, trimmed, for one-line diagnostics.
fn detail(stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if stdout.is_empty() {
        "(no output)".to_string()
    } else {
        stdout.to_string()
    }
}

impl FixSuggestion for ResolveError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ResolveError::Configuration { .. } => Some(
                "Set TFC_ORG_NAME, TFC_INFRA_WORKSPACE_ID and TFC_API_READ_TOKEN in the job's env block",
            ),
            ResolveError::InvalidSetting { setting, .. } => match setting.as_str() {
                ENV_API_BASE_URL => Some(
                    "Set TFC_API_BASE_URL to an http(s) URL such as https://app.terraform.io/api/v2, or unset it",
                ),
                ENV_COMMAND_TIMEOUT => {
                    Some("Use a positive number of seconds for TF_COMMAND_TIMEOUT or --timeout")
                }
                ENV_GITHUB_ENV => Some("Set GITHUB_ENV (provided by GitHub Actions) or drop --export-env"),
                _ => Some("Correct the value or unset it to use the default"),
            },
            ResolveError::InvalidBinding { .. } => {
                Some("Use unique names made of letters, digits and underscores (e.g. VPC_ID)")
            }
            ResolveError::CommandExecution { exit_code: None, .. } => {
                Some("Check that terraform is installed and on PATH (or pass --terraform)")
            }
            ResolveError::CommandExecution { .. } => {
                Some("Run the command locally and check the working directory's Terraform configuration")
            }
            ResolveError::CommandTimeout { .. } => {
                Some("Raise --timeout / TF_COMMAND_TIMEOUT or check for a stuck remote run")
            }
            ResolveError::ApiTransport { .. } => {
                Some("Check network access to the API and TFC_API_BASE_URL")
            }
            ResolveError::ApiResponse { .. } => {
                Some("Check TFC_API_READ_TOKEN permissions for the workspace")
            }
            ResolveError::IncompleteResolution { .. } => {
                Some("Check that outputs.tf declares these outputs and the workspace has applied state")
            }
            ResolveError::SinkWrite { .. } => Some("Check GITHUB_OUTPUT path and permissions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_resolution_lists_every_name() {
        let err = ResolveError::IncompleteResolution {
            missing: vec!["SG_ID".into(), "VPC_ID".into()],
        };
        assert_eq!(
            err.to_string(),
            "Outputs empty or missing after resolution: SG_ID, VPC_ID"
        );
    }

    #[test]
    fn command_execution_prefers_stderr() {
        let err = ResolveError::CommandExecution {
            command: "terraform init -no-color".into(),
            exit_code: Some(1),
            stdout: "Initializing...\n".into(),
            stderr: "Error: backend not configured\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "Command 'terraform init -no-color' failed (exit code 1): Error: backend not configured"
        );
    }

    #[test]
    fn command_execution_without_exit_code() {
        let err = ResolveError::CommandExecution {
            command: "terraform version".into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("not started"));
        assert!(err.to_string().contains("(no output)"));
        assert!(err.fix_suggestion().unwrap().contains("PATH"));
    }

    #[test]
    fn timeout_message_in_seconds() {
        let err = ResolveError::CommandTimeout {
            command: "terraform refresh -no-color".into(),
            timeout: Duration::from_secs(90),
        };
        assert!(err.to_string().ends_with("timed out after 90s"));
    }

    #[test]
    fn invalid_setting_suggestion_names_the_setting() {
        let base_url = ResolveError::InvalidSetting {
            setting: ENV_API_BASE_URL.into(),
            reason: "must use http or https, got 'ftp'".into(),
        };
        assert_eq!(
            base_url.to_string(),
            "Invalid TFC_API_BASE_URL: must use http or https, got 'ftp'"
        );
        assert!(base_url.fix_suggestion().unwrap().contains("TFC_API_BASE_URL"));

        let timeout = ResolveError::InvalidSetting {
            setting: ENV_COMMAND_TIMEOUT.into(),
            reason: "x".into(),
        };
        assert!(timeout.fix_suggestion().unwrap().contains("--timeout"));

        let env_file = ResolveError::InvalidSetting {
            setting: ENV_GITHUB_ENV.into(),
            reason: "x".into(),
        };
        assert!(env_file.fix_suggestion().unwrap().contains("--export-env"));

        for err in [base_url, timeout, env_file] {
            assert!(!err.fix_suggestion().unwrap().contains("TFC_API_READ_TOKEN"));
        }
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let errors = vec![
            ResolveError::Configuration { reason: "x".into() },
            ResolveError::InvalidBinding { reason: "x".into() },
            ResolveError::InvalidSetting {
                setting: "X".into(),
                reason: "x".into(),
            },
            ResolveError::ApiTransport {
                url: "u".into(),
                reason: "x".into(),
            },
            ResolveError::ApiResponse {
                url: "u".into(),
                reason: "x".into(),
            },
            ResolveError::IncompleteResolution { missing: vec![] },
            ResolveError::SinkWrite {
                path: PathBuf::from("/nope"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
        ];
        for err in errors {
            assert!(err.fix_suggestion().is_some(), "{err:?}");
        }
    }
}
