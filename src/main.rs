//! # Context Dataset CLI (`ctxds`)
//!
//! ## Usage
//!
//! ```bash
//! ctxds --config ./config/ctxds.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ctxds init` | Create the action-log tables in the configured SQLite file |
//! | `ctxds extract --workspace <id>` | Extract new cases into the datasets |
//! | `ctxds stats` | Summarize the dataset files |
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` (for example
//! `RUST_LOG=context_dataset=debug`) to see per-case detail.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use context_dataset::config;
use context_dataset::extract_cmd::{self, ExtractArgs};
use context_dataset::migrate;
use context_dataset::progress::ProgressMode;
use context_dataset::stats;

/// Context Dataset CLI: mine agent action logs into retrieval-evaluation
/// datasets.
#[derive(Parser)]
#[command(
    name = "ctxds",
    about = "Context Dataset — mine agent action logs into retrieval-evaluation datasets",
    version,
    long_about = "Context Dataset splits the action logs of completed development tasks into \
    cases, one per approved merge, and writes the files and line ranges each case changed and \
    looked at, golden evidence first, as JSON Lines datasets."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ctxds.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the action-log schema.
    ///
    /// Creates the SQLite database file and the tasks, flows, worktrees,
    /// and flow_actions tables. Safe to run repeatedly.
    Init,

    /// Extract dataset rows for a workspace.
    ///
    /// Cases already present in Dataset A are skipped and new rows are
    /// appended, unless `--full` is given.
    Extract {
        /// Workspace to extract.
        #[arg(long)]
        workspace: String,

        /// Output directory for dataset_a/b/c.jsonl. Overrides `[output].dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Git repository used to resolve base commits. Overrides
        /// `[git].repo_dir`; defaults to each flow's worktree directory.
        #[arg(long)]
        repo_dir: Option<PathBuf>,

        /// Ignore existing datasets and rewrite them from scratch.
        #[arg(long)]
        full: bool,

        /// Progress on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show row counts and checksums of the dataset files.
    Stats {
        /// Dataset directory. Overrides `[output].dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("context_dataset=warn,context_dataset_core=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Action log initialized successfully.");
        }
        Commands::Extract {
            workspace,
            output_dir,
            repo_dir,
            full,
            progress,
        } => {
            let args = ExtractArgs {
                workspace_id: workspace,
                output_dir,
                repo_dir,
                full,
                progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
            };
            extract_cmd::run_extract(&cfg, args).await?;
        }
        Commands::Stats { output_dir } => {
            stats::run_stats(&cfg, output_dir)?;
        }
    }

    Ok(())
}
