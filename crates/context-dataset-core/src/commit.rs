//! Base-commit derivation.
//!
//! The base commit of a case is the commit its changes were made against.
//! Resolution goes through the [`RevParse`] trait so the algorithm stays
//! independent of how revisions are actually resolved (the app crate shells
//! out to `git`).
//!
//! # Algorithm
//!
//! 1. Take a 40-hex commit SHA embedded in the merge-approval action, or
//!    resolve the case's source branch (then `origin/<branch>`).
//! 2. Resolve `<commit>^`, its first parent.
//! 3. If either step fails, resolve the target branch (then
//!    `origin/<branch>`) and use it as-is.
//! 4. Otherwise give up with `None`.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{Action, Case};

static COMMIT_SHA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9a-fA-F]{40}\b").expect("valid commit sha regex"));

const DIFF_HEADER: &str = "diff --git ";

const SOURCE_BRANCH_KEYS: &[&str] = &["sourceBranch", "source_branch"];
const TARGET_BRANCH_KEYS: &[&str] = &["targetBranch", "target_branch", "baseBranch", "base_branch"];

/// Resolves a revision expression to a full commit SHA.
pub trait RevParse {
    /// Returns `None` when the revision does not resolve.
    fn rev_parse(&self, repo_dir: &Path, rev: &str) -> Option<String>;
}

/// Branches recorded for a case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchHints {
    pub source_branch: Option<String>,
    pub target_branch: Option<String>,
}

impl BranchHints {
    /// Branches named in the merge-approval parameters (searched at any depth).
    pub fn from_merge_params(action: &Action) -> Self {
        Self {
            source_branch: find_string_param(&action.params, SOURCE_BRANCH_KEYS),
            target_branch: find_string_param(&action.params, TARGET_BRANCH_KEYS),
        }
    }

    /// Fill gaps from the flow's worktree branch and a default target.
    pub fn or_defaults(mut self, worktree_branch: Option<&str>, default_target: Option<&str>) -> Self {
        if self.source_branch.is_none() {
            self.source_branch = worktree_branch.filter(|b| !b.is_empty()).map(str::to_string);
        }
        if self.target_branch.is_none() {
            self.target_branch = default_target.filter(|b| !b.is_empty()).map(str::to_string);
        }
        self
    }
}

/// A full commit SHA embedded in the action, if any.
///
/// Parameters are searched first, depth-first in key order, then the
/// result. Only the text ahead of a `diff --git` header is scanned.
pub fn embedded_commit_sha(action: &Action) -> Option<String> {
    action
        .params
        .values()
        .find_map(find_sha_value)
        .or_else(|| sha_in_text(&action.result))
}

fn find_sha_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => sha_in_text(s),
        Value::Object(map) => map.values().find_map(find_sha_value),
        Value::Array(items) => items.iter().find_map(find_sha_value),
        _ => None,
    }
}

fn sha_in_text(text: &str) -> Option<String> {
    COMMIT_SHA
        .find(text_before_diff(text))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Text ahead of the first `diff --git` header. Diff bodies carry blob ids,
/// not commits.
fn text_before_diff(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.starts_with(DIFF_HEADER) {
            return &text[..offset];
        }
        offset += line.len();
    }
    text
}

fn find_string_param(
    params: &serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<String> {
    for key in keys {
        if let Some(Value::String(s)) = params.get(*key) {
            if !s.trim().is_empty() {
                return Some(s.trim().to_string());
            }
        }
    }
    params.values().find_map(|v| match v {
        Value::Object(nested) => find_string_param(nested, keys),
        _ => None,
    })
}

/// Derive the base commit of `case`.
pub fn derive_base_commit<G: RevParse + ?Sized>(
    git: &G,
    repo_dir: &Path,
    case: &Case,
    hints: &BranchHints,
) -> Option<String> {
    let embedded = case.merge_approval().and_then(embedded_commit_sha);

    let head = embedded.or_else(|| {
        hints
            .source_branch
            .as_deref()
            .and_then(|branch| resolve_branch(git, repo_dir, branch))
    });

    if let Some(head) = head {
        if let Some(parent) = git.rev_parse(repo_dir, &format!("{}^", head)) {
            return Some(parent);
        }
        tracing::debug!(case_id = %case.id, commit = %head, "first parent did not resolve");
    }

    hints
        .target_branch
        .as_deref()
        .and_then(|branch| resolve_branch(git, repo_dir, branch))
}

/// Resolve a branch, retrying as `origin/<branch>`.
pub fn resolve_branch<G: RevParse + ?Sized>(git: &G, repo_dir: &Path, branch: &str) -> Option<String> {
    git.rev_parse(repo_dir, branch).or_else(|| {
        if branch.starts_with("origin/") {
            None
        } else {
            git.rev_parse(repo_dir, &format!("origin/{}", branch))
        }
    })
}
