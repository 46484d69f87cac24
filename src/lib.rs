//! tfc-outputs - resolve Terraform outputs into CI job outputs
//!
//! Reads values from the local Terraform state and from a Terraform Cloud
//! workspace, checks that none is empty, and publishes them as `NAME=value`
//! lines.

pub mod binding;
pub mod config;
pub mod error;
pub mod resolver;
pub mod sink;
pub mod source;

pub use binding::{
    BindingSet, OutputBinding, ResolutionResult, ResolvedValue, Source, SourceKind,
};
pub use config::Config;
pub use error::{FixSuggestion, ResolveError};
pub use resolver::Resolver;
pub use sink::{format_lines, Sink, SinkWriter};
pub use source::{
    CommandOutput, CommandRunner, LocalOutputs, RemoteOutputs, SystemRunner, TerraformCli,
    TfcClient, WorkspaceOutputs,
};
