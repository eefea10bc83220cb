//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use super::job_cmd;
use super::output::{Output, OutputFormat};
use crate::storage::JobStore;

#[derive(Parser)]
#[command(name = "jobbox")]
#[command(author, version, about = "File-backed store for shell command jobs")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Store root directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "JOBBOX_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a job store, writing a commented default config
    Init,

    /// Add a shell command job
    Add {
        /// Human-readable job name
        name: String,

        /// Shell command line to store
        command: String,
    },

    /// List all jobs
    List,

    /// Show one job in full
    Show {
        /// Job ID
        id: i64,
    },

    /// Change a job's name or command
    Update {
        /// Job ID
        id: i64,

        /// New job name
        #[arg(long)]
        name: Option<String>,

        /// New shell command line
        #[arg(long)]
        command: Option<String>,
    },

    /// Delete a job
    Delete {
        /// Job ID
        id: i64,
    },

    /// List jobs whose name contains the query
    Search {
        /// Substring to look for in job names
        query: String,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    let root = resolve_root(cli.root)?;
    output.verbose(&format!("Using job store at: {}", root.display()));

    // Opening is idempotent, so every command gets a usable store.
    let store = JobStore::open(&root)
        .with_context(|| format!("failed to open job store: {}", root.display()))?;

    match cli.command {
        Commands::Init => job_cmd::init(&output, &root)?,
        Commands::Add { name, command } => job_cmd::add(&output, &store, &name, &command)?,
        Commands::List => job_cmd::list(&output, &store)?,
        Commands::Show { id } => job_cmd::show(&output, &store, id)?,
        Commands::Update { id, name, command } => {
            job_cmd::update(&output, &store, id, name, command)?
        }
        Commands::Delete { id } => job_cmd::delete(&output, &store, id)?,
        Commands::Search { query } => job_cmd::search(&output, &store, &query)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

/// Resolves the store root: the `--root` flag or `JOBBOX_ROOT` if given,
/// otherwise the platform-specific per-user data directory.
fn resolve_root(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = flag {
        return Ok(root);
    }
    let dirs = ProjectDirs::from("", "", "jobbox")
        .context("could not determine a data directory for the job store")?;
    Ok(dirs.data_dir().to_path_buf())
}
