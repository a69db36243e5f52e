//! `ctxds extract`: run the extractor against the SQLite action log and
//! persist the datasets.
//!
//! Incremental by default: case ids already in Dataset A are skipped and new
//! rows are appended to all three files in lockstep. `--full` ignores the
//! existing files and rewrites them.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::dataset::{append_jsonl, extract_case_ids, write_jsonl, DatasetPaths};
use crate::db;
use crate::extractor::{extract_workspace, ExtractOptions, ExtractSummary};
use crate::git::GitCli;
use crate::progress::ProgressMode;
use crate::sqlite_store::SqliteLogStore;

/// CLI arguments of one extract run, after parsing.
#[derive(Debug, Clone)]
pub struct ExtractArgs {
    pub workspace_id: String,
    pub output_dir: Option<PathBuf>,
    pub repo_dir: Option<PathBuf>,
    pub full: bool,
    pub progress: ProgressMode,
}

pub async fn run_extract(config: &Config, args: ExtractArgs) -> Result<()> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.dir.clone());
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;
    let paths = DatasetPaths::in_dir(&output_dir);

    let known_case_ids = if args.full {
        Default::default()
    } else {
        extract_case_ids(&paths.a)?
    };

    let options = ExtractOptions {
        workspace_id: args.workspace_id.clone(),
        statuses: config.extraction.statuses(),
        window_size: config.extraction.window_size,
        merge_overlapping_ranges: config.extraction.merge_overlapping_ranges,
        repo_dir: args.repo_dir.clone().or_else(|| config.git.repo_dir.clone()),
        default_target_branch: config.git.default_target_branch.clone(),
        known_case_ids,
    };

    let pool = db::connect_existing(config).await?;
    let store = SqliteLogStore::new(pool);
    let reporter = args.progress.reporter();

    let (rows, summary) = extract_workspace(&store, &GitCli, &options, reporter.as_ref()).await?;
    store.pool().close().await;

    if args.full {
        write_jsonl(&paths.a, &rows.a)?;
        write_jsonl(&paths.b, &rows.b)?;
        write_jsonl(&paths.c, &rows.c)?;
    } else {
        append_jsonl(&paths.a, &rows.a)?;
        append_jsonl(&paths.b, &rows.b)?;
        append_jsonl(&paths.c, &rows.c)?;
    }

    tracing::info!(
        workspace = %args.workspace_id,
        rows = rows.len(),
        full = args.full,
        "datasets written"
    );
    print_summary(&args, &output_dir, &summary);
    Ok(())
}

fn print_summary(args: &ExtractArgs, output_dir: &std::path::Path, summary: &ExtractSummary) {
    println!(
        "extract {}{}",
        args.workspace_id,
        if args.full { " (full)" } else { "" }
    );
    println!("  tasks: {}", summary.tasks);
    println!(
        "  flows: {} ({} without worktree)",
        summary.flows, summary.flows_without_worktree
    );
    println!(
        "  cases: {} ({} already extracted)",
        summary.cases, summary.cases_skipped
    );
    println!("  rows written: {}", summary.rows);
    println!("  needs query: {}", summary.rows_needing_query);
    println!("  needs base commit: {}", summary.rows_needing_base_commit);
    println!("  output: {}", output_dir.display());
    println!("ok");
}
