//! Dataset statistics.
//!
//! Provides a quick summary of what has been extracted: row counts, rows
//! still needing a human-written query or a base commit, average evidence
//! per row, and a SHA-256 of each file so two runs can be compared at a
//! glance. Used by `ctxds stats`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use context_dataset_core::models::{DatasetARow, DatasetBRow, DatasetCRow, RowEnvelope};

use crate::config::Config;
use crate::dataset::{read_jsonl, DatasetPaths};

/// Per-file statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub name: &'static str,
    pub path: PathBuf,
    pub exists: bool,
    pub size: u64,
    pub rows: usize,
    pub needs_query: usize,
    pub needs_base_commit: usize,
    /// Evidence items (paths, ranges, or tool calls) per row.
    pub avg_evidence: f64,
    /// Golden evidence items per row. Not defined for tool calls.
    pub avg_golden: Option<f64>,
    pub sha256: Option<String>,
}

/// Run the stats command: read the dataset files and print a summary.
pub fn run_stats(config: &Config, output_dir: Option<PathBuf>) -> Result<()> {
    let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
    let stats = collect_stats(&dir)?;

    println!("Context Dataset — Dataset Stats");
    println!("===============================");
    println!();
    println!("  Output dir:  {}", dir.display());
    println!();
    println!(
        "  {:<10} {:>6} {:>10} {:>10} {:>10} {:>10} {:>9}   {}",
        "DATASET", "ROWS", "NO QUERY", "NO COMMIT", "AVG ITEMS", "AVG GOLD", "SIZE", "SHA-256"
    );
    println!("  {}", "-".repeat(100));
    for s in &stats {
        if !s.exists {
            println!("  {:<10} missing", s.name);
            continue;
        }
        println!(
            "  {:<10} {:>6} {:>10} {:>10} {:>10.2} {:>10} {:>9}   {}",
            s.name,
            s.rows,
            s.needs_query,
            s.needs_base_commit,
            s.avg_evidence,
            s.avg_golden
                .map(|g| format!("{:.2}", g))
                .unwrap_or_else(|| "-".to_string()),
            format_bytes(s.size),
            s.sha256.as_deref().unwrap_or("-")
        );
    }
    println!();
    Ok(())
}

/// Gather statistics for the three dataset files in `dir`.
pub fn collect_stats(dir: &Path) -> Result<Vec<DatasetStats>> {
    let paths = DatasetPaths::in_dir(dir);

    let a = file_stats("A", &paths.a, |rows: &[DatasetARow]| {
        rows.iter()
            .map(|r| {
                let golden = r.file_paths.iter().filter(|p| p.is_golden()).count();
                (r.envelope.clone(), r.file_paths.len(), Some(golden))
            })
            .collect()
    })?;
    let b = file_stats("B", &paths.b, |rows: &[DatasetBRow]| {
        rows.iter()
            .map(|r| {
                let golden = r.line_ranges.iter().filter(|l| l.is_golden()).count();
                (r.envelope.clone(), r.line_ranges.len(), Some(golden))
            })
            .collect()
    })?;
    let c = file_stats("C", &paths.c, |rows: &[DatasetCRow]| {
        rows.iter()
            .map(|r| (r.envelope.clone(), r.tool_calls.len(), None))
            .collect()
    })?;

    Ok(vec![a, b, c])
}

type RowSummary = (RowEnvelope, usize, Option<usize>);

fn file_stats<T, F>(name: &'static str, path: &Path, summarize: F) -> Result<DatasetStats>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&[T]) -> Vec<RowSummary>,
{
    if !path.exists() {
        return Ok(DatasetStats {
            name,
            path: path.to_path_buf(),
            exists: false,
            size: 0,
            rows: 0,
            needs_query: 0,
            needs_base_commit: 0,
            avg_evidence: 0.0,
            avg_golden: None,
            sha256: None,
        });
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let rows: Vec<T> = read_jsonl(path)?;
    let summaries = summarize(&rows);

    let n = summaries.len();
    let evidence: usize = summaries.iter().map(|(_, e, _)| e).sum();
    let golden: Option<usize> = summaries
        .iter()
        .map(|(_, _, g)| *g)
        .sum::<Option<usize>>();

    Ok(DatasetStats {
        name,
        path: path.to_path_buf(),
        exists: true,
        size: bytes.len() as u64,
        rows: n,
        needs_query: summaries.iter().filter(|(e, _, _)| e.needs_query).count(),
        needs_base_commit: summaries
            .iter()
            .filter(|(e, _, _)| e.needs_base_commit)
            .count(),
        avg_evidence: average(evidence, n),
        avg_golden: if n == 0 { None } else { golden.map(|g| average(g, n)) },
        sha256: Some(sha256_hex(&bytes)),
    })
}

fn average(total: usize, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        total as f64 / n as f64
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::write_jsonl;
    use context_dataset_core::models::{FilePath, PathSource};
    use tempfile::TempDir;

    fn envelope(case_id: &str, needs_query: bool) -> RowEnvelope {
        RowEnvelope {
            workspace_id: "ws".into(),
            task_id: "t1".into(),
            flow_id: "f1".into(),
            case_id: case_id.into(),
            case_index: 0,
            query: String::new(),
            base_commit: "abc".into(),
            needs_query,
            needs_base_commit: false,
        }
    }

    #[test]
    fn counts_rows_and_golden_paths() {
        let tmp = TempDir::new().unwrap();
        let paths = DatasetPaths::in_dir(tmp.path());
        write_jsonl(
            &paths.a,
            &[
                DatasetARow {
                    envelope: envelope("m1", true),
                    file_paths: vec![
                        FilePath {
                            path: "a.rs".into(),
                            sources: vec![PathSource::ReviewMergeDiff],
                        },
                        FilePath {
                            path: "b.rs".into(),
                            sources: vec![PathSource::ToolCallArgs],
                        },
                    ],
                },
                DatasetARow {
                    envelope: envelope("m2", false),
                    file_paths: Vec::new(),
                },
            ],
        )
        .unwrap();

        let stats = collect_stats(tmp.path()).unwrap();
        let a = &stats[0];
        assert!(a.exists);
        assert_eq!(a.rows, 2);
        assert_eq!(a.needs_query, 1);
        assert_eq!(a.avg_evidence, 1.0);
        assert_eq!(a.avg_golden, Some(0.5));
        assert_eq!(a.sha256.as_ref().map(|s| s.len()), Some(64));

        assert!(!stats[1].exists);
        assert!(!stats[2].exists);
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
