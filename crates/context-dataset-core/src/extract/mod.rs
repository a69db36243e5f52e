//! Evidence extraction from a single case.
//!
//! Three extractors run over a case's actions:
//!
//! | Extractor | Golden evidence | Secondary evidence |
//! |-----------|-----------------|--------------------|
//! | [`paths`] | paths edited by the merge diff | tool arguments, tool results, other diffs |
//! | [`ranges`] | hunks of the merge diff | `read_file_lines` windows, result headers, ripgrep hits |
//! | [`tool_calls`] | none | allow-listed tool invocations |
//!
//! Accumulation always pairs a lookup map with an ordered vector so output
//! order is first-seen order, never hash order.

pub mod paths;
pub mod ranges;
pub mod result_text;
pub mod tool_calls;

use std::collections::HashMap;
use std::hash::Hash;

use serde_json::Value;

use crate::diff::{contains_diff, normalize_diff_path};
use crate::models::{Action, Case, FileLineRange, FilePath, PathSource, RangeSource, ToolCallSpec};

/// Default `read_file_lines` window when a call does not specify one.
pub const DEFAULT_WINDOW_SIZE: u32 = 50;

/// Tuning for a single case extraction.
#[derive(Debug, Clone)]
pub struct EvidenceOptions {
    /// Window around each requested line of a `read_file_lines` call.
    pub window_size: u32,
    /// Directory prefixes (worktree roots) stripped from absolute paths.
    pub strip_prefixes: Vec<String>,
}

impl Default for EvidenceOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            strip_prefixes: Vec::new(),
        }
    }
}

/// Everything extracted from one case, before ranking.
#[derive(Debug, Clone, Default)]
pub struct CaseEvidence {
    /// Paths edited by the merge diff, first-seen order.
    pub golden_paths: Vec<String>,
    pub file_paths: Vec<FilePath>,
    pub line_ranges: Vec<FileLineRange>,
    pub tool_calls: Vec<ToolCallSpec>,
}

/// Run all extractors over `case`.
pub fn extract_case(case: &Case, options: &EvidenceOptions) -> CaseEvidence {
    let merge_diff = case.merge_approval().and_then(find_merge_diff);
    let tool_calls = tool_calls::extract_tool_calls(&case.actions);

    let golden_paths = merge_diff
        .map(crate::diff::parse_paths)
        .unwrap_or_default();
    let file_paths = paths::extract_file_paths(case, merge_diff, &tool_calls, options);
    let line_ranges = ranges::extract_line_ranges(case, merge_diff, &tool_calls, options);

    CaseEvidence {
        golden_paths,
        file_paths,
        line_ranges,
        tool_calls,
    }
}

/// The diff carried by a merge-approval action.
///
/// Parameters are searched depth-first in key order for a string holding a
/// `diff --git` header; the result text is used when none does.
pub fn find_merge_diff(action: &Action) -> Option<&str> {
    for value in action.params.values() {
        if let Some(found) = find_diff_value(value) {
            return Some(found);
        }
    }
    if contains_diff(&action.result) {
        return Some(action.result.as_str());
    }
    None
}

fn find_diff_value(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if contains_diff(s) => Some(s.as_str()),
        Value::Object(map) => map.values().find_map(find_diff_value),
        Value::Array(items) => items.iter().find_map(find_diff_value),
        _ => None,
    }
}

/// Normalise a path found in arguments or result text.
///
/// Trims whitespace and backticks, strips any of `strip_prefixes` (worktree
/// roots) plus a leading `./`, and drops empty paths and `/dev/null`.
pub fn normalize_path(raw: &str, strip_prefixes: &[String]) -> Option<String> {
    let mut path = raw.trim().trim_matches('`');
    for prefix in strip_prefixes {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            continue;
        }
        if let Some(rest) = path.strip_prefix(prefix) {
            if let Some(relative) = rest.strip_prefix('/') {
                path = relative;
                break;
            }
        }
    }
    normalize_diff_path(path)
}

/// Insertion-ordered accumulator of items keyed by identity, each carrying
/// a list of distinct source tags.
#[derive(Debug)]
pub(crate) struct SourceCollector<K, T> {
    index: HashMap<K, usize>,
    items: Vec<T>,
}

impl<K: Eq + Hash, T> SourceCollector<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }

    /// Insert `make()` under `key` if new, then hand the stored item to `tag`.
    pub(crate) fn upsert(&mut self, key: K, make: impl FnOnce() -> T, tag: impl FnOnce(&mut T)) {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.items.push(make());
                let idx = self.items.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        tag(&mut self.items[idx]);
    }

    pub(crate) fn into_items(self) -> Vec<T> {
        self.items
    }
}

pub(crate) type PathCollector = SourceCollector<String, FilePath>;

impl PathCollector {
    pub(crate) fn add(&mut self, path: String, source: PathSource) {
        self.upsert(
            path.clone(),
            || FilePath {
                path,
                sources: Vec::new(),
            },
            |fp| {
                if !fp.sources.contains(&source) {
                    fp.sources.push(source);
                }
            },
        );
    }
}

pub(crate) type RangeCollector = SourceCollector<(String, u32, u32), FileLineRange>;

impl RangeCollector {
    pub(crate) fn add(&mut self, path: String, start: u32, end: u32, source: RangeSource) {
        self.upsert(
            (path.clone(), start, end),
            || FileLineRange {
                path,
                start_line: start,
                end_line: end,
                sources: Vec::new(),
            },
            |r| {
                if !r.sources.contains(&source) {
                    r.sources.push(source);
                }
            },
        );
    }
}
