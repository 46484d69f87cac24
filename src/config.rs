//! Run configuration
//!
//! Built once at startup from the process environment (after `.env` loading)
//! and CLI overrides, then passed by reference. Required values are checked
//! here so that nothing downstream ever sees a partial configuration.
//!
//! ## Variables
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `TFC_ORG_NAME` | yes | |
//! | `TFC_INFRA_WORKSPACE_ID` | yes | |
//! | `TFC_API_READ_TOKEN` | yes | |
//! | `TFC_API_BASE_URL` | no | `https://app.terraform.io/api/v2` |
//! | `GITHUB_OUTPUT` | no | `temp_github_output.txt` |
//! | `GITHUB_ENV` | no | |
//! | `TF_COMMAND_TIMEOUT` | no | no timeout |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{ResolveError, Result};

pub const ENV_ORG_NAME: &str = "TFC_ORG_NAME";
pub const ENV_WORKSPACE_ID: &str = "TFC_INFRA_WORKSPACE_ID";
pub const ENV_API_TOKEN: &str = "TFC_API_READ_TOKEN";
pub const ENV_API_BASE_URL: &str = "TFC_API_BASE_URL";
pub const ENV_GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";
pub const ENV_GITHUB_ENV: &str = "GITHUB_ENV";
pub const ENV_COMMAND_TIMEOUT: &str = "TF_COMMAND_TIMEOUT";

/// Terraform Cloud API v2
pub const DEFAULT_API_BASE_URL: &str = "https://app.terraform.io/api/v2";

/// Used when `GITHUB_OUTPUT` is unset (local runs)
pub const FALLBACK_OUTPUT_FILE: &str = "temp_github_output.txt";

/// Validated configuration for a single run
#[derive(Clone)]
pub struct Config {
    pub organization: String,
    /// Default workspace for remote bindings
    pub workspace_id: String,
    api_token: String,
    pub api_base_url: Url,
    /// `GITHUB_OUTPUT`, if set
    pub output_path: Option<PathBuf>,
    /// `GITHUB_ENV`, if set
    pub env_path: Option<PathBuf>,
    /// Per-command timeout for local Terraform commands
    pub command_timeout: Option<Duration>,
}

impl Config {
    /// Build from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    ///
    /// Empty values count as unset. All missing required variables are
    /// reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let organization = get(ENV_ORG_NAME);
        let workspace_id = get(ENV_WORKSPACE_ID);
        let api_token = get(ENV_API_TOKEN);

        let (organization, workspace_id, api_token) = match (organization, workspace_id, api_token)
        {
            (Some(o), Some(w), Some(t)) => (o, w, t),
            (o, w, t) => {
                let missing: Vec<&str> = [
                    (ENV_ORG_NAME, o.is_none()),
                    (ENV_WORKSPACE_ID, w.is_none()),
                    (ENV_API_TOKEN, t.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(ResolveError::Configuration {
                    reason: format!("missing environment variables: {}", missing.join(", ")),
                });
            }
        };

        let api_base_url = parse_base_url(
            get(ENV_API_BASE_URL)
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL),
        )?;

        let command_timeout = match get(ENV_COMMAND_TIMEOUT) {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };

        Ok(Self {
            organization,
            workspace_id,
            api_token,
            api_base_url,
            output_path: get(ENV_GITHUB_OUTPUT).map(PathBuf::from),
            env_path: get(ENV_GITHUB_ENV).map(PathBuf::from),
            command_timeout,
        })
    }

    /// Bearer token for the API
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Override the per-command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Override the output file path
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Output file, falling back to [`FALLBACK_OUTPUT_FILE`]
    pub fn output_file(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_OUTPUT_FILE))
    }

    /// Append path segments to the API base URL
    ///
    /// Each segment is percent-encoded, so ids containing `/`, `?` or `#`
    /// stay inside their own segment.
    pub fn api_url(&self, segments: &[&str]) -> String {
        let mut url = self.api_base_url.clone();
        // http(s) base URLs always have a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }
}

// Token is never printed
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("organization", &self.organization)
            .field("workspace_id", &self.workspace_id)
            .field("api_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("output_path", &self.output_path)
            .field("env_path", &self.env_path)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |reason: String| ResolveError::InvalidSetting {
        setting: ENV_API_BASE_URL.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(format!("'{raw}' is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" if !url.cannot_be_a_base() => Ok(url),
        other => Err(invalid(format!("must use http or https, got '{other}'"))),
    }
}

/// Seconds, as accepted by `TF_COMMAND_TIMEOUT` and `--timeout`
pub fn parse_timeout(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ResolveError::InvalidSetting {
            setting: ENV_COMMAND_TIMEOUT.to_string(),
            reason: format!("expected a positive number of seconds, got '{raw}'"),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}
