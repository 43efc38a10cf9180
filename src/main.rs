//! # vendo CLI Entry Point
//!
//! Parses CLI arguments using clap and hands off to the engine pipeline.
//!
//! ## Invocations
//!
//! - `vendo` - revendor every manifest entry
//! - `vendo <paths...>` - restrict the run to matching import roots
//! - `vendo <path> --rev <revision>` - repin one dependency
//! - `vendo init` - bootstrap a manifest for an unvendored project
//! - `vendo completion <shell>` - shell completion scripts

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;

use vendo::config::VendorConfig;
use vendo::pipeline::{self, RunOptions};

#[derive(Parser)]
#[command(name = "vendo")]
#[command(about = "Vendor workspace dependencies at pinned revisions", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Import-root prefixes to restrict this run to (default: every entry)
    paths: Vec<String>,

    /// Pin the selected import root to this revision (needs exactly one path)
    #[arg(long)]
    rev: Option<String>,

    /// Workspace root (falls back to $VENDOPATH, then $GOPATH)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Project root (default: current directory)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Strip the nested vendor directories of dependencies
    #[arg(long)]
    flatten: bool,

    /// Show per-package progress detail
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap a manifest for a project that has never been vendored
    Init,
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", "x".red(), err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Completion { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(());
    }

    if cli.rev.is_some() && cli.paths.len() != 1 {
        bail!("--rev requires exactly one import root argument");
    }

    let workspace = match cli.workspace {
        Some(dir) => dir,
        None => workspace_from_env()
            .context("no workspace root: pass --workspace or set VENDOPATH/GOPATH")?,
    };
    let project = match cli.project {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut config = VendorConfig::new(workspace, project)?;
    config.flatten = cli.flatten;

    let options = RunOptions {
        init: matches!(cli.command, Some(Commands::Init)),
        filter: cli.paths,
        revision: cli.rev,
        verbose: cli.verbose,
    };
    pipeline::run(&config, &options)
}

/// First entry of $VENDOPATH or $GOPATH, which may be list-valued.
fn workspace_from_env() -> Option<PathBuf> {
    let raw = std::env::var_os("VENDOPATH").or_else(|| std::env::var_os("GOPATH"))?;
    std::env::split_paths(&raw).next()
}
