//! Output bindings and resolution results
//!
//! A binding maps a logical name (the published `NAME`) to a source and a
//! source-specific lookup key. Binding sets are validated on construction:
//! names must be usable as environment variable identifiers and unique.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ResolveError, Result};

/// Valid logical name (environment variable identifier)
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Where a value comes from, without per-binding detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// `terraform output -raw` in the working directory
    Local,
    /// Terraform Cloud state-version outputs
    Remote,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Local => write!(f, "local"),
            SourceKind::Remote => write!(f, "remote"),
        }
    }
}

/// Binding source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local,
    /// `workspace: None` uses the configured workspace id
    Remote { workspace: Option<String> },
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Local => SourceKind::Local,
            Source::Remote { .. } => SourceKind::Remote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBinding {
    pub logical_name: String,
    pub source: Source,
    pub lookup_key: String,
}

impl OutputBinding {
    pub fn local(logical_name: impl Into<String>, lookup_key: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            source: Source::Local,
            lookup_key: lookup_key.into(),
        }
    }

    /// Remote binding against the configured workspace
    pub fn remote(logical_name: impl Into<String>, lookup_key: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            source: Source::Remote { workspace: None },
            lookup_key: lookup_key.into(),
        }
    }

    /// Pin a remote binding to a specific workspace
    pub fn in_workspace(mut self, workspace: impl Into<String>) -> Self {
        if let Source::Remote { workspace: ws } = &mut self.source {
            *ws = Some(workspace.into());
        }
        self
    }
}

/// Ordered, validated list of bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSet {
    bindings: Vec<OutputBinding>,
}

impl BindingSet {
    pub fn new(bindings: Vec<OutputBinding>) -> Result<Self> {
        if bindings.is_empty() {
            return Err(ResolveError::InvalidBinding {
                reason: "no bindings declared".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for binding in &bindings {
            if !NAME_RE.is_match(&binding.logical_name) {
                return Err(ResolveError::InvalidBinding {
                    reason: format!(
                        "'{}' is not a valid output name",
                        binding.logical_name
                    ),
                });
            }
            if binding.lookup_key.trim().is_empty() {
                return Err(ResolveError::InvalidBinding {
                    reason: format!("'{}' has an empty lookup key", binding.logical_name),
                });
            }
            if let Source::Remote {
                workspace: Some(ws),
            } = &binding.source
            {
                if ws.trim().is_empty() {
                    return Err(ResolveError::InvalidBinding {
                        reason: format!("'{}' has an empty workspace id", binding.logical_name),
                    });
                }
            }
            if !seen.insert(binding.logical_name.as_str()) {
                return Err(ResolveError::InvalidBinding {
                    reason: format!("duplicate output name '{}'", binding.logical_name),
                });
            }
        }

        Ok(Self { bindings })
    }

    /// Bindings needed by the Packer build
    ///
    /// Subnet and security group come from this directory's own state; EFS
    /// and VPC come from the infra workspace through the API.
    pub fn defaults() -> Self {
        Self {
            bindings: vec![
                OutputBinding::local("SUBNET_ID", "subnet_id"),
                OutputBinding::local("SG_ID", "security_group_id"),
                OutputBinding::remote("EFS_DNS_NAME", "efs_dns_name"),
                OutputBinding::remote("VPC_ID", "vpc_id"),
            ],
        }
    }

    /// Load a YAML binding file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ResolveError::InvalidBinding {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let file: BindingFile =
            serde_yaml::from_str(raw).map_err(|e| ResolveError::InvalidBinding {
                reason: format!("binding file: {e}"),
            })?;
        Self::new(file.bindings.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OutputBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn has_local(&self) -> bool {
        self.bindings.iter().any(|b| b.source == Source::Local)
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a OutputBinding;
    type IntoIter = std::slice::Iter<'a, OutputBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BindingFile {
    bindings: Vec<BindingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BindingEntry {
    name: String,
    source: SourceTag,
    key: String,
    #[serde(default)]
    workspace: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SourceTag {
    Local,
    Remote,
}

impl From<BindingEntry> for OutputBinding {
    fn from(entry: BindingEntry) -> Self {
        let source = match entry.source {
            SourceTag::Local => Source::Local,
            SourceTag::Remote => Source::Remote {
                workspace: entry.workspace,
            },
        };
        Self {
            logical_name: entry.name,
            source,
            lookup_key: entry.key,
        }
    }
}

/// A value resolved for one binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub logical_name: String,
    pub value: String,
    pub origin: SourceKind,
}

/// Every binding resolved to a non-empty value, in declaration order
///
/// Only the resolver constructs this, after checking for empty values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    values: Vec<ResolvedValue>,
}

impl ResolutionResult {
    pub(crate) fn new(values: Vec<ResolvedValue>) -> Self {
        debug_assert!(values.iter().all(|v| !v.value.is_empty()));
        Self { values }
    }

    pub fn get(&self, logical_name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.logical_name == logical_name)
            .map(|v| v.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedValue> {
        self.values.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.logical_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResolutionResult {
    type Item = &'a ResolvedValue;
    type IntoIter = std::slice::Iter<'a, ResolvedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
