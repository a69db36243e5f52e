//! JSON Lines dataset files.
//!
//! Each dataset is one JSON object per line. Files are write-once per case:
//! incremental runs only append, full runs truncate and rewrite. Reading is
//! strict, a malformed line is an error naming the file and line number.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DATASET_A_FILE: &str = "dataset_a.jsonl";
pub const DATASET_B_FILE: &str = "dataset_b.jsonl";
pub const DATASET_C_FILE: &str = "dataset_c.jsonl";

/// Locations of the three dataset files inside an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub a: PathBuf,
    pub b: PathBuf,
    pub c: PathBuf,
}

impl DatasetPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            a: dir.join(DATASET_A_FILE),
            b: dir.join(DATASET_B_FILE),
            c: dir.join(DATASET_C_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.a, &self.b, &self.c]
    }
}

/// Create or truncate `path` and write `rows`, one per line.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create dataset file: {}", path.display()))?;
    write_rows(file, path, rows)
}

/// Append `rows` to `path`, creating it if missing.
pub fn append_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open dataset file for append: {}", path.display()))?;
    write_rows(file, path, rows)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn write_rows<T: Serialize>(file: File, path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, row)
            .with_context(|| format!("Failed to serialize row for {}", path.display()))?;
        writer.write_all(b"\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write dataset file: {}", path.display()))?;
    Ok(())
}

/// Read every non-blank line of `path` as a `T`.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset file: {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.with_context(|| format!("Failed to read {} line {}", path.display(), i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line)
            .with_context(|| format!("Malformed JSON in {} line {}", path.display(), i + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseIdOnly {
    case_id: String,
}

/// Case ids already present in a Dataset A file. Missing file yields an
/// empty set.
pub fn extract_case_ids(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let rows: Vec<CaseIdOnly> = read_jsonl(path)?;
    Ok(rows.into_iter().map(|r| r.case_id).collect())
}
