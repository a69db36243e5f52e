//! Golden-first ranking of extracted evidence.
//!
//! Every ranking is a stable two-bucket partition: items that hit the golden
//! set keep their relative order at the front, everything else keeps its
//! relative order behind them. Consumers can then score a prefix whose
//! length is the ground-truth count.

use std::collections::{HashMap, HashSet};

use globset::Glob;

use crate::extract::normalize_path;
use crate::extract::paths::argument_paths;
use crate::extract::result_text::result_paths;
use crate::models::{FileLineRange, FilePath, ToolCallSpec};

/// Ground-truth paths of a case.
#[derive(Debug, Clone, Default)]
pub struct GoldenSet {
    paths: Vec<String>,
    lookup: HashSet<String>,
    strip_prefixes: Vec<String>,
}

impl GoldenSet {
    pub fn new<I: IntoIterator<Item = String>>(paths: I) -> Self {
        Self::with_prefixes(paths, Vec::new())
    }

    /// `strip_prefixes` are applied to candidate paths before lookup.
    pub fn with_prefixes<I: IntoIterator<Item = String>>(paths: I, strip_prefixes: Vec<String>) -> Self {
        let mut set = Self {
            paths: Vec::new(),
            lookup: HashSet::new(),
            strip_prefixes,
        };
        for path in paths {
            if set.lookup.insert(path.clone()) {
                set.paths.push(path);
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `candidate`, once normalised, is a golden path.
    pub fn contains(&self, candidate: &str) -> bool {
        if self.lookup.contains(candidate) {
            return true;
        }
        normalize_path(candidate, &self.strip_prefixes)
            .map(|p| self.lookup.contains(&p))
            .unwrap_or(false)
    }

    /// Whether `glob` matches any golden path. Invalid globs match nothing.
    pub fn matches_glob(&self, glob: &str) -> bool {
        let Ok(glob) = Glob::new(glob.trim()) else {
            return false;
        };
        let matcher = glob.compile_matcher();
        self.paths.iter().any(|p| matcher.is_match(p))
    }
}

/// Stable partition with golden items first.
pub fn partition_golden<T>(items: Vec<T>, is_golden: impl Fn(&T) -> bool) -> Vec<T> {
    let (mut golden, rest): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| is_golden(item));
    golden.extend(rest);
    golden
}

pub fn rank_file_paths(items: Vec<FilePath>, golden: &GoldenSet) -> Vec<FilePath> {
    partition_golden(items, |fp| golden.contains(&fp.path))
}

/// Ranges carrying the `golden_diff` tag go first.
pub fn rank_line_ranges(items: Vec<FileLineRange>) -> Vec<FileLineRange> {
    partition_golden(items, FileLineRange::is_golden)
}

pub fn rank_tool_calls(calls: Vec<ToolCallSpec>, golden: &GoldenSet) -> Vec<ToolCallSpec> {
    partition_golden(calls, |call| references_golden(call, golden))
}

/// Whether a tool call references any golden path.
///
/// Arguments are checked first: typed arguments when the decode succeeded
/// (explicit paths, and search globs matched against the golden set), raw
/// JSON otherwise. Paths recovered from the result text are checked last.
pub fn references_golden(call: &ToolCallSpec, golden: &GoldenSet) -> bool {
    if golden.is_empty() {
        return false;
    }

    let argument_hit = match &call.parsed_arguments {
        Some(args) => {
            args.file_paths().iter().any(|p| golden.contains(p))
                || args.path_globs().iter().any(|g| golden.matches_glob(g))
        }
        None => argument_paths(call).iter().any(|p| golden.contains(p)),
    };
    if argument_hit {
        return true;
    }

    call.result
        .as_deref()
        .map(|text| result_paths(text).iter().any(|p| golden.contains(p)))
        .unwrap_or(false)
}

/// Coalesce overlapping or adjacent ranges of the same path.
///
/// Paths keep first-seen order; intervals within a path are sorted by start.
/// Merged ranges carry the union of their sources, in merge order.
pub fn merge_overlapping_ranges(ranges: Vec<FileLineRange>) -> Vec<FileLineRange> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<FileLineRange>> = HashMap::new();
    for range in ranges {
        if !groups.contains_key(&range.path) {
            order.push(range.path.clone());
        }
        groups.entry(range.path.clone()).or_default().push(range);
    }

    let mut merged: Vec<FileLineRange> = Vec::new();
    for path in order {
        let Some(mut group) = groups.remove(&path) else {
            continue;
        };
        group.sort_by_key(|r| (r.start_line, r.end_line));

        let mut current: Option<FileLineRange> = None;
        for range in group {
            let touches = matches!(
                &current,
                Some(open) if range.start_line <= open.end_line.saturating_add(1)
            );
            match current.as_mut() {
                Some(open) if touches => {
                    open.end_line = open.end_line.max(range.end_line);
                    for source in range.sources {
                        if !open.sources.contains(&source) {
                            open.sources.push(source);
                        }
                    }
                }
                _ => merged.extend(current.replace(range)),
            }
        }
        merged.extend(current);
    }
    merged
}
