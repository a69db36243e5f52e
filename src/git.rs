//! `git` subprocess access.
//!
//! Revision lookups shell out to the system `git` binary. A failed or
//! missing `git` is not an error here: the revision simply does not
//! resolve, and the caller records the case as needing a base commit.

use std::path::Path;
use std::process::Command;

use context_dataset_core::commit::RevParse;

/// [`RevParse`] backed by `git rev-parse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl RevParse for GitCli {
    fn rev_parse(&self, repo_dir: &Path, rev: &str) -> Option<String> {
        if rev.is_empty() || rev.starts_with('-') {
            return None;
        }

        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{}^{{commit}}", rev))
            .current_dir(repo_dir)
            .output();

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(repo = %repo_dir.display(), error = %e, "failed to execute git");
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(repo = %repo_dir.display(), rev, "revision did not resolve");
            return None;
        }

        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if sha.is_empty() {
            None
        } else {
            Some(sha)
        }
    }
}
