//! tfc-outputs CLI

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tfc_outputs::config::parse_timeout;
use tfc_outputs::source::DEFAULT_TERRAFORM;
use tfc_outputs::{
    BindingSet, Config, FixSuggestion, ResolveError, Resolver, Source, SinkWriter, SystemRunner,
    TerraformCli, TfcClient,
};

#[derive(Parser)]
#[command(name = "tfc-outputs")]
#[command(about = "Publish Terraform and Terraform Cloud outputs as CI job outputs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve outputs and write them to the configured sinks (default)
    Fetch(FetchArgs),

    /// Validate configuration and bindings without calling Terraform or the API
    Check(CheckArgs),
}

#[derive(Args, Default)]
struct FetchArgs {
    /// YAML binding file (defaults to SUBNET_ID, SG_ID, EFS_DNS_NAME, VPC_ID)
    #[arg(short, long)]
    bindings: Option<PathBuf>,

    /// Output file (overrides GITHUB_OUTPUT)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also append to the file named by GITHUB_ENV
    #[arg(long)]
    export_env: bool,

    /// Do not echo NAME=value lines to stdout
    #[arg(short, long)]
    quiet: bool,

    /// Terraform binary
    #[arg(long)]
    terraform: Option<String>,

    /// Directory holding the local Terraform configuration
    #[arg(long)]
    chdir: Option<PathBuf>,

    /// Per-command timeout in seconds (overrides TF_COMMAND_TIMEOUT)
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,
}

#[derive(Args)]
struct CheckArgs {
    /// YAML binding file
    #[arg(short, long)]
    bindings: Option<PathBuf>,

    /// Terraform binary
    #[arg(long)]
    terraform: Option<String>,

    /// Directory holding the local Terraform configuration
    #[arg(long)]
    chdir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries NAME=value lines
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Fetch(args)) => fetch(args).await,
        Some(Commands::Check(args)) => check(args),
        None => fetch(FetchArgs::default()).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<ResolveError>()
            .and_then(|err| err.fix_suggestion())
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(timeout) = args.timeout {
        config = config.with_command_timeout(timeout);
    }
    if let Some(output) = args.output {
        config = config.with_output_path(output);
    }

    let bindings = load_bindings(args.bindings.as_deref())?;
    let sinks = SinkWriter::for_run(&config, args.export_env, args.quiet)?;

    info!(
        organization = %config.organization,
        workspace = %config.workspace_id,
        bindings = bindings.len(),
        "Resolving outputs"
    );

    let terraform = TerraformCli::new(SystemRunner::new().with_working_dir(args.chdir))
        .with_program(args.terraform.as_deref().unwrap_or(DEFAULT_TERRAFORM))
        .with_timeout(config.command_timeout);
    let tfc = TfcClient::new(&config)?;

    let result = Resolver::new(&config, &terraform, &tfc)
        .resolve(&bindings)
        .await?;
    sinks.write(&result)?;

    Ok(())
}

fn check(args: CheckArgs) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let bindings = load_bindings(args.bindings.as_deref())?;

    println!("{} Configuration is valid", "✓".green());
    println!("  Organization: {}", config.organization);
    println!("  Workspace: {}", config.workspace_id);
    println!("  API: {}", config.api_base_url);
    println!("  Output file: {}", config.output_file().display());
    println!("  Bindings: {}", bindings.len());
    for binding in &bindings {
        let source = match &binding.source {
            Source::Local => "local".to_string(),
            Source::Remote { workspace } => format!(
                "remote:{}",
                workspace.as_deref().unwrap_or(config.workspace_id.as_str())
            ),
        };
        println!("    {} <- {} {}", binding.logical_name, source, binding.lookup_key);
    }

    if bindings.has_local() {
        let program = args.terraform.as_deref().unwrap_or(DEFAULT_TERRAFORM);
        if !SystemRunner::new()
            .with_working_dir(args.chdir)
            .is_available(program)
        {
            return Err(ResolveError::CommandExecution {
                command: format!("{program} version"),
                exit_code: None,
                stdout: String::new(),
                stderr: "terraform CLI is not available".to_string(),
            }
            .into());
        }
        println!("{} {} is available", "✓".green(), program);
    }

    Ok(())
}

fn load_bindings(path: Option<&Path>) -> Result<BindingSet, ResolveError> {
    match path {
        Some(path) => BindingSet::from_yaml_file(path),
        None => Ok(BindingSet::defaults()),
    }
}
