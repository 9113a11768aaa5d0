mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sfdelta_lib::config::ReferenceSource;
use sfdelta_lib::job::TestLevel;
use tracing_subscriber::EnvFilter;

use crate::cmd::{
  Context, SnapshotCommand, cmd_deploy, cmd_diff, cmd_inventory, cmd_package, cmd_snapshot, cmd_validate,
};
use crate::output::OutputFormat;

/// sfd - delta deploys of Salesforce metadata
#[derive(Parser)]
#[command(name = "sfd")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project root containing sfdx-project.json
  #[arg(long, global = true, default_value = ".")]
  project: PathBuf,

  /// Config file (default: <project>/sfdelta.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Output format
  #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
  output: OutputFormat,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List the metadata components in the local project
  Inventory,

  /// Show what changed since the reference snapshot
  Diff {
    /// Org alias or username
    #[arg(short = 't', long)]
    target_org: String,

    /// What to diff against (previous-deploy or org-current)
    #[arg(long)]
    reference: Option<ReferenceSource>,
  },

  /// Assemble the delta package
  Package {
    #[arg(short = 't', long)]
    target_org: String,

    #[arg(long)]
    reference: Option<ReferenceSource>,

    /// Write package.xml, destructiveChanges.xml and the payload here
    #[arg(long)]
    out: Option<PathBuf>,
  },

  /// Check-only deploy of the delta to one or more orgs
  Validate {
    /// Org alias or username; repeat to validate several orgs concurrently
    #[arg(short = 't', long, required = true)]
    target_org: Vec<String>,

    #[arg(long)]
    reference: Option<ReferenceSource>,

    #[arg(long)]
    test_level: Option<TestLevel>,
  },

  /// Validate, then deploy the delta
  Deploy {
    #[arg(short = 't', long)]
    target_org: String,

    #[arg(long)]
    reference: Option<ReferenceSource>,

    #[arg(long)]
    test_level: Option<TestLevel>,

    /// Deploy the validated job instead of resubmitting the package
    #[arg(long)]
    quick: bool,
  },

  /// Inspect and prune deployed snapshot history
  Snapshot {
    #[command(subcommand)]
    command: SnapshotCommand,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("sfdelta_lib=debug,sfdelta_cli=debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let ctx = Context::load(&cli.project, cli.config.as_deref(), cli.output)?;

  match cli.command {
    Commands::Inventory => cmd_inventory(&ctx),
    Commands::Diff { target_org, reference } => cmd_diff(ctx.with_overrides(reference, None), &target_org),
    Commands::Package {
      target_org,
      reference,
      out,
    } => cmd_package(ctx.with_overrides(reference, None), &target_org, out.as_deref()),
    Commands::Validate {
      target_org,
      reference,
      test_level,
    } => cmd_validate(ctx.with_overrides(reference, test_level), target_org),
    Commands::Deploy {
      target_org,
      reference,
      test_level,
      quick,
    } => cmd_deploy(ctx.with_overrides(reference, test_level), &target_org, quick),
    Commands::Snapshot { command } => cmd_snapshot(&ctx, command),
  }
}
