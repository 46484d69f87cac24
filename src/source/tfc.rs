//! Terraform Cloud adapter
//!
//! Two-step lookup for a workspace's outputs:
//!
//! 1. `GET /workspaces/{id}/current-state-version` -> `data.id`
//! 2. `GET /state-versions/{state_version_id}/outputs` -> `data[]`, each item
//!    carrying `attributes.name` and `attributes.value`
//!
//! The API can report failures as a JSON body with an `errors` field, even
//! with a 2xx status. That body always wins over the status code.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{RemoteOutputs, WorkspaceOutputs};
use crate::config::Config;
use crate::error::{ResolveError, Result};

/// JSON:API media type used by Terraform Cloud
const JSON_API: &str = "application/vnd.api+json";
/// Default timeout for HTTP requests (30 seconds)
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest body excerpt carried in an error message
const BODY_EXCERPT: usize = 200;

/// Terraform Cloud API client
pub struct TfcClient {
    http: reqwest::Client,
    config: Config,
}

impl TfcClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("tfc-outputs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolveError::ApiTransport {
                url: config.api_base_url.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// GET a JSON:API document
    #[instrument(skip(self))]
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("Calling Terraform Cloud API");
        let transport = |e: reqwest::Error| ResolveError::ApiTransport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .http
            .get(url)
            .bearer_auth(self.config.api_token())
            .header(CONTENT_TYPE, JSON_API)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        parse_body(url, status, &body)
    }

    /// Id of the workspace's current state version
    pub async fn current_state_version_id(&self, workspace_id: &str) -> Result<String> {
        let url = self
            .config
            .api_url(&["workspaces", workspace_id, "current-state-version"]);
        let doc = self.get_json(&url).await?;
        extract_state_version_id(&url, &doc)
    }

    /// Outputs recorded in one state version
    pub async fn state_version_outputs(&self, state_version_id: &str) -> Result<WorkspaceOutputs> {
        let url = self
            .config
            .api_url(&["state-versions", state_version_id, "outputs"]);
        let doc = self.get_json(&url).await?;
        extract_outputs(&url, &doc)
    }
}

#[async_trait]
impl RemoteOutputs for TfcClient {
    async fn workspace_outputs(&self, workspace_id: &str) -> Result<WorkspaceOutputs> {
        let state_version_id = self.current_state_version_id(workspace_id).await?;
        debug!(workspace = workspace_id, state_version = %state_version_id, "Found current state version");

        let outputs = self.state_version_outputs(&state_version_id).await?;
        debug!(workspace = workspace_id, count = outputs.len(), "Fetched workspace outputs");
        Ok(outputs)
    }
}

// ============================================================================
// RESPONSE HANDLING
// ============================================================================

/// Turn a raw HTTP response into a JSON document
///
/// An `errors` field is an authoritative failure regardless of status.
/// Without one, non-2xx is a transport failure and an unparseable 2xx body is
/// a response failure.
pub fn parse_body(url: &str, status: StatusCode, body: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(doc) => {
            if let Some(errors) = doc.get("errors") {
                return Err(ResolveError::ApiResponse {
                    url: url.to_string(),
                    reason: format!("HTTP {status}, errors: {}", summarize_errors(errors)),
                });
            }
            if !status.is_success() {
                return Err(ResolveError::ApiTransport {
                    url: url.to_string(),
                    reason: format!("HTTP {status}"),
                });
            }
            Ok(doc)
        }
        Err(e) if status.is_success() => Err(ResolveError::ApiResponse {
            url: url.to_string(),
            reason: format!("invalid JSON ({e}), body: {}", excerpt(body)),
        }),
        Err(_) => Err(ResolveError::ApiTransport {
            url: url.to_string(),
            reason: format!("HTTP {status}, body: {}", excerpt(body)),
        }),
    }
}

/// `data.id` of a current-state-version document
pub fn extract_state_version_id(url: &str, doc: &Value) -> Result<String> {
    doc.pointer("/data/id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ResolveError::ApiResponse {
            url: url.to_string(),
            reason: "response has no data.id".to_string(),
        })
}

/// Name/value pairs of a state-version outputs document
///
/// Items without a string `attributes.name` or with a missing/null
/// `attributes.value` are skipped with a warning.
pub fn extract_outputs(url: &str, doc: &Value) -> Result<WorkspaceOutputs> {
    let items = doc
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ResolveError::ApiResponse {
            url: url.to_string(),
            reason: format!("'data' is missing or not a list: {}", excerpt(&doc.to_string())),
        })?;

    let mut outputs = WorkspaceOutputs::new();
    for item in items {
        let name = item.pointer("/attributes/name").and_then(Value::as_str);
        let value = item.pointer("/attributes/value").and_then(render_value);
        match (name, value) {
            (Some(name), Some(value)) => outputs.insert(name, value),
            _ => warn!(item = %item, "Output item missing expected attributes, skipping"),
        }
    }
    Ok(outputs)
}

/// Output value as published text
///
/// Strings verbatim, `null` as absent, anything else as compact JSON.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn summarize_errors(errors: &Value) -> String {
    let titles: Vec<String> = errors
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|e| {
                    let title = e.get("title").and_then(Value::as_str);
                    let detail = e.get("detail").and_then(Value::as_str);
                    match (title, detail) {
                        (Some(t), Some(d)) => Some(format!("{t}: {d}")),
                        (Some(t), None) => Some(t.to_string()),
                        (None, Some(d)) => Some(d.to_string()),
                        (None, None) => None,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    if titles.is_empty() {
        excerpt(&errors.to_string())
    } else {
        titles.join("; ")
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "(empty)".to_string();
    }
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
