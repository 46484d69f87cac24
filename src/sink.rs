//! Output sinks
//!
//! Writes a [`ResolutionResult`] as `NAME=value` lines, one per output, in
//! result order. Values are written as-is with no quoting or escaping, so they
//! must be shell-safe (true for the resource ids and DNS names this tool
//! publishes).

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::binding::ResolutionResult;
use crate::config::{Config, ENV_GITHUB_ENV, ENV_GITHUB_OUTPUT};
use crate::error::{ResolveError, Result};

/// Label used for stdout in errors
const STDOUT_LABEL: &str = "<stdout>";

/// One output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// Appended to; created if missing
    File(PathBuf),
    Stdout,
}

/// Writes a result to every configured file in order, then to stdout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkWriter {
    sinks: Vec<Sink>,
}

impl SinkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sinks.push(Sink::File(path.into()));
        self
    }

    pub fn with_stdout(mut self) -> Self {
        self.sinks.push(Sink::Stdout);
        self
    }

    /// Sinks for a CI run
    ///
    /// Always the step output file (`GITHUB_OUTPUT` or the local fallback),
    /// plus the job env file when `export_env` is set, plus stdout unless
    /// `quiet`.
    pub fn for_run(config: &Config, export_env: bool, quiet: bool) -> Result<Self> {
        let mut writer = Self::new();

        if !quiet {
            writer = writer.with_stdout();
        }

        if config.output_path.is_none() {
            warn!(
                file = %config.output_file().display(),
                "{ENV_GITHUB_OUTPUT} is not set, writing outputs to local fallback file"
            );
        }
        writer = writer.with_file(config.output_file());

        if export_env {
            let env_path = config.env_path.clone().ok_or_else(|| ResolveError::InvalidSetting {
                setting: ENV_GITHUB_ENV.to_string(),
                reason: "--export-env requires it to be set".to_string(),
            })?;
            writer = writer.with_file(env_path);
        }

        Ok(writer)
    }

    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    pub fn write(&self, result: &ResolutionResult) -> Result<()> {
        let content = format_lines(result);

        // Files first: nothing is echoed if an output file cannot be written
        for sink in &self.sinks {
            if let Sink::File(path) = sink {
                append_to_file(path, &content)?;
            }
        }
        if self.sinks.contains(&Sink::Stdout) {
            let stdout = std::io::stdout();
            write_lines(&mut stdout.lock(), &content).map_err(|source| ResolveError::SinkWrite {
                path: PathBuf::from(STDOUT_LABEL),
                source,
            })?;
        }

        info!(sinks = self.sinks.len(), "Published outputs");
        for value in result {
            info!("  {}: '{}'", value.logical_name, value.value);
        }
        Ok(())
    }
}

/// `NAME=value\n` for each entry
pub fn format_lines(result: &ResolutionResult) -> String {
    result
        .iter()
        .map(|v| format!("{}={}\n", v.logical_name, v.value))
        .collect()
}

fn write_lines<W: Write>(out: &mut W, content: &str) -> std::io::Result<()> {
    out.write_all(content.as_bytes())?;
    out.flush()
}

/// Append and flush; the handle is closed when this returns
fn append_to_file(path: &Path, content: &str) -> Result<()> {
    let sink_error = |source: std::io::Error| ResolveError::SinkWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(sink_error)?;
    let mut writer = BufWriter::new(file);
    write_lines(&mut writer, content).map_err(sink_error)
}
