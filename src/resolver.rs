//! Output resolution
//!
//! Walks a [`BindingSet`] in declaration order and turns it into a
//! [`ResolutionResult`]:
//!
//! - local preparation runs once, before the first local lookup, and only if
//!   some binding is local
//! - each remote workspace is fetched once per run and reused
//! - adapter errors abort immediately
//! - empty or absent values are collected and reported together

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use crate::binding::{BindingSet, OutputBinding, ResolutionResult, ResolvedValue, Source};
use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::source::{LocalOutputs, RemoteOutputs, WorkspaceOutputs};

pub struct Resolver<'a> {
    config: &'a Config,
    local: &'a dyn LocalOutputs,
    remote: &'a dyn RemoteOutputs,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: &'a Config,
        local: &'a dyn LocalOutputs,
        remote: &'a dyn RemoteOutputs,
    ) -> Self {
        Self {
            config,
            local,
            remote,
        }
    }

    /// Resolve every binding or fail
    #[instrument(skip_all, fields(bindings = bindings.len()))]
    pub async fn resolve(&self, bindings: &BindingSet) -> Result<ResolutionResult> {
        if bindings.has_local() {
            info!("Preparing local Terraform state");
            self.local.prepare().await?;
        }

        let mut workspaces: HashMap<String, WorkspaceOutputs> = HashMap::new();
        let mut collected = Vec::with_capacity(bindings.len());

        for binding in bindings {
            let value = match &binding.source {
                Source::Local => Some(self.local.output(&binding.lookup_key).await?),
                Source::Remote { workspace } => {
                    let workspace_id = workspace
                        .as_deref()
                        .unwrap_or(self.config.workspace_id.as_str());
                    if !workspaces.contains_key(workspace_id) {
                        info!(workspace = workspace_id, "Fetching workspace outputs");
                        let outputs = self.remote.workspace_outputs(workspace_id).await?;
                        workspaces.insert(workspace_id.to_string(), outputs);
                    }
                    workspaces
                        .get(workspace_id)
                        .and_then(|outputs| outputs.get(&binding.lookup_key))
                        .map(str::to_string)
                }
            };
            collected.push((binding, value));
        }

        validate(collected)
    }
}

/// Every value present and non-blank, or the full list of names that are not
fn validate(collected: Vec<(&OutputBinding, Option<String>)>) -> Result<ResolutionResult> {
    let mut values = Vec::with_capacity(collected.len());
    let mut missing = Vec::new();

    for (binding, value) in collected {
        match value {
            Some(value) if !value.trim().is_empty() => {
                info!(
                    name = %binding.logical_name,
                    origin = %binding.source.kind(),
                    value = %value,
                    "Resolved output"
                );
                values.push(ResolvedValue {
                    logical_name: binding.logical_name.clone(),
                    value,
                    origin: binding.source.kind(),
                });
            }
            value => {
                warn!(
                    name = %binding.logical_name,
                    key = %binding.lookup_key,
                    origin = %binding.source.kind(),
                    found = ?value,
                    "Output is empty or missing"
                );
                missing.push(binding.logical_name.clone());
            }
        }
    }

    if !missing.is_empty() {
        return Err(ResolveError::IncompleteResolution { missing });
    }
    Ok(ResolutionResult::new(values))
}
