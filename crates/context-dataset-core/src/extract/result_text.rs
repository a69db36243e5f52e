//! Grammars for tool result text.
//!
//! Two shapes are recognised:
//!
//! - a `File: <path>` header, optionally followed on the next non-blank line
//!   by `Lines: X` or `Lines: X-Y`;
//! - ripgrep-style matches, `path:line:content`.
//!
//! Lines matching neither are ignored.

use once_cell::sync::Lazy;
use regex::Regex;

static FILE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*File:\s*(\S.*?)\s*$").expect("valid File header regex"));

static LINES_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Lines:\s*(\d+)(?:\s*-\s*(\d+))?\s*$").expect("valid Lines header regex")
});

static RIPGREP_MATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w@+\-./]+):(\d+):").expect("valid ripgrep match regex"));

/// A path recovered from result text, with the lines it refers to if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRef {
    pub path: String,
    pub lines: Option<(u32, u32)>,
}

/// Parse every file reference out of `text`, in order of appearance.
pub fn parse_result_refs(text: &str) -> Vec<ResultRef> {
    let mut refs = Vec::new();
    let mut pending: Option<ResultRef> = None;

    for line in text.lines() {
        if let Some(mut open) = pending.take() {
            if line.trim().is_empty() {
                pending = Some(open);
                continue;
            }
            if let Some(lines) = parse_lines_header(line) {
                open.lines = Some(lines);
                refs.push(open);
                continue;
            }
            refs.push(open);
        }

        if let Some(caps) = FILE_HEADER.captures(line) {
            pending = Some(ResultRef {
                path: caps[1].to_string(),
                lines: None,
            });
        } else if let Some(caps) = RIPGREP_MATCH.captures(line) {
            let path = &caps[1];
            if !looks_like_path(path) {
                continue;
            }
            if let Ok(n) = caps[2].parse::<u32>() {
                let n = n.max(1);
                refs.push(ResultRef {
                    path: path.to_string(),
                    lines: Some((n, n)),
                });
            }
        }
    }

    if let Some(open) = pending {
        refs.push(open);
    }

    refs
}

/// Distinct paths referenced by `text`, first-seen order.
pub fn result_paths(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for r in parse_result_refs(text) {
        if !paths.contains(&r.path) {
            paths.push(r.path);
        }
    }
    paths
}

fn parse_lines_header(line: &str) -> Option<(u32, u32)> {
    let caps = LINES_HEADER.captures(line)?;
    let start: u32 = caps[1].parse().ok()?;
    let end: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => start,
    };
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    Some((lo.max(1), hi.max(1)))
}

/// Rejects bare words and numbers such as timestamps (`12:30:01`).
fn looks_like_path(candidate: &str) -> bool {
    (candidate.contains('/') || candidate.contains('.'))
        && candidate.chars().any(|c| c.is_alphabetic())
}
