//! Workspace extraction orchestration.
//!
//! Walks the action log of one workspace and turns every case into one row
//! per dataset:
//!
//! ```text
//! tasks (by id) → flows (by id) → worktrees → actions → split_cases
//!     → extract_case → rank → derive_base_commit → rows A / B / C
//! ```
//!
//! Every fan-out is sorted so repeated runs over the same log produce the
//! same rows in the same order. Cases whose id is already known (from an
//! existing Dataset A file) are skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use context_dataset_core::case::split_cases;
use context_dataset_core::commit::{derive_base_commit, BranchHints, RevParse};
use context_dataset_core::extract::{extract_case, EvidenceOptions, DEFAULT_WINDOW_SIZE};
use context_dataset_core::models::{
    Case, DatasetARow, DatasetBRow, DatasetCRow, RowEnvelope, Task, TaskStatus, Worktree,
};
use context_dataset_core::rank::{
    merge_overlapping_ranges, rank_file_paths, rank_line_ranges, rank_tool_calls, GoldenSet,
};
use context_dataset_core::store::ActionLogStore;

use crate::progress::{ExtractProgressEvent, ExtractProgressReporter};

/// Settings for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub workspace_id: String,
    pub statuses: Vec<TaskStatus>,
    pub window_size: u32,
    pub merge_overlapping_ranges: bool,
    /// Repository used for revision lookups. Falls back to the flow's first
    /// worktree directory.
    pub repo_dir: Option<PathBuf>,
    pub default_target_branch: String,
    /// Cases already present in the datasets.
    pub known_case_ids: HashSet<String>,
}

impl ExtractOptions {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            statuses: vec![TaskStatus::Complete],
            window_size: DEFAULT_WINDOW_SIZE,
            merge_overlapping_ranges: false,
            repo_dir: None,
            default_target_branch: "main".to_string(),
            known_case_ids: HashSet::new(),
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub tasks: u64,
    pub flows: u64,
    pub flows_without_worktree: u64,
    pub cases: u64,
    pub cases_skipped: u64,
    pub rows: u64,
    pub rows_needing_query: u64,
    pub rows_needing_base_commit: u64,
}

/// Rows produced by a run, aligned by index across the three datasets.
#[derive(Debug, Clone, Default)]
pub struct ExtractedRows {
    pub a: Vec<DatasetARow>,
    pub b: Vec<DatasetBRow>,
    pub c: Vec<DatasetCRow>,
}

impl ExtractedRows {
    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }
}

/// Extract rows for every new case of the workspace.
pub async fn extract_workspace<S, G>(
    store: &S,
    git: &G,
    options: &ExtractOptions,
    progress: &dyn ExtractProgressReporter,
) -> Result<(ExtractedRows, ExtractSummary)>
where
    S: ActionLogStore + ?Sized,
    G: RevParse + ?Sized,
{
    let ws = options.workspace_id.as_str();
    progress.report(ExtractProgressEvent::Discovering {
        workspace_id: ws.to_string(),
    });

    let mut tasks = store.get_tasks(ws, &options.statuses).await?;
    tasks.sort_by(|a, b| a.id.cmp(&b.id));

    let mut rows = ExtractedRows::default();
    let mut summary = ExtractSummary {
        tasks: tasks.len() as u64,
        ..Default::default()
    };
    let total = tasks.len() as u64;

    for (i, task) in tasks.iter().enumerate() {
        progress.report(ExtractProgressEvent::Extracting {
            task_id: task.id.clone(),
            n: i as u64 + 1,
            total,
        });

        let mut flows = store.get_flows_for_task(ws, &task.id).await?;
        flows.sort_by(|a, b| a.id.cmp(&b.id));

        for flow in &flows {
            summary.flows += 1;

            let mut worktrees = store.get_worktrees_for_flow(ws, &flow.id).await?;
            if worktrees.is_empty() {
                tracing::debug!(flow_id = %flow.id, "flow has no worktree, skipping");
                summary.flows_without_worktree += 1;
                continue;
            }
            worktrees.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));

            let actions = store.get_flow_actions(ws, &flow.id).await?;
            for case in split_cases(&actions) {
                summary.cases += 1;
                if options.known_case_ids.contains(&case.id) {
                    summary.cases_skipped += 1;
                    continue;
                }

                let (a, b, c) = build_rows(git, options, task, &worktrees, &case);
                summary.rows += 1;
                if a.envelope.needs_query {
                    summary.rows_needing_query += 1;
                }
                if a.envelope.needs_base_commit {
                    summary.rows_needing_base_commit += 1;
                }
                rows.a.push(a);
                rows.b.push(b);
                rows.c.push(c);
            }
        }
    }

    Ok((rows, summary))
}

fn build_rows<G: RevParse + ?Sized>(
    git: &G,
    options: &ExtractOptions,
    task: &Task,
    worktrees: &[Worktree],
    case: &Case,
) -> (DatasetARow, DatasetBRow, DatasetCRow) {
    let strip_prefixes: Vec<String> = worktrees
        .iter()
        .map(|w| w.working_directory.clone())
        .filter(|d| !d.is_empty())
        .collect();
    let evidence_options = EvidenceOptions {
        window_size: options.window_size,
        strip_prefixes: strip_prefixes.clone(),
    };

    let evidence = extract_case(case, &evidence_options);
    let golden = GoldenSet::with_prefixes(evidence.golden_paths, strip_prefixes);

    let file_paths = rank_file_paths(evidence.file_paths, &golden);
    let line_ranges = if options.merge_overlapping_ranges {
        merge_overlapping_ranges(evidence.line_ranges)
    } else {
        evidence.line_ranges
    };
    let line_ranges = rank_line_ranges(line_ranges);
    let tool_calls = rank_tool_calls(evidence.tool_calls, &golden);

    let base_commit = resolve_base_commit(git, options, worktrees, case);
    if base_commit.is_none() {
        tracing::warn!(case_id = %case.id, flow_id = %case.flow_id, "base commit not resolved");
    }

    let (query, needs_query) = derive_query(task, case.index);
    tracing::debug!(
        case_id = %case.id,
        paths = file_paths.len(),
        ranges = line_ranges.len(),
        tool_calls = tool_calls.len(),
        "case extracted"
    );

    let envelope = RowEnvelope {
        workspace_id: task.workspace_id.clone(),
        task_id: task.id.clone(),
        flow_id: case.flow_id.clone(),
        case_id: case.id.clone(),
        case_index: case.index,
        query,
        needs_query,
        needs_base_commit: base_commit.is_none(),
        base_commit: base_commit.unwrap_or_default(),
    };

    (
        DatasetARow {
            envelope: envelope.clone(),
            file_paths,
        },
        DatasetBRow {
            envelope: envelope.clone(),
            line_ranges,
        },
        DatasetCRow {
            envelope,
            tool_calls,
        },
    )
}

fn resolve_base_commit<G: RevParse + ?Sized>(
    git: &G,
    options: &ExtractOptions,
    worktrees: &[Worktree],
    case: &Case,
) -> Option<String> {
    let first = worktrees.first();
    let repo_dir: PathBuf = match (&options.repo_dir, first) {
        (Some(dir), _) => dir.clone(),
        (None, Some(wt)) if !wt.working_directory.is_empty() => PathBuf::from(&wt.working_directory),
        _ => return None,
    };

    let hints = case
        .merge_approval()
        .map(BranchHints::from_merge_params)
        .unwrap_or_default()
        .or_defaults(
            first.map(|w| w.name.as_str()),
            Some(options.default_target_branch.as_str()),
        );

    derive_base_commit(git, Path::new(&repo_dir), case, &hints)
}

/// The query for a case and whether it needs a human-written one.
///
/// Follow-up cases (index > 0) always need one: the task description only
/// describes the first unit of work.
pub fn derive_query(task: &Task, case_index: usize) -> (String, bool) {
    let description = task.description.trim();
    let query = if description.is_empty() {
        task.title.trim()
    } else {
        description
    };
    (query.to_string(), description.is_empty() || case_index > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use chrono::{TimeZone, Utc};
    use context_dataset_core::models::{Action, Flow, PathSource, MERGE_APPROVAL_ACTION_TYPE};
    use context_dataset_core::store::memory::InMemoryLogStore;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    const BRANCH_SHA: &str = "3333333333333333333333333333333333333333";
    const PARENT_SHA: &str = "2222222222222222222222222222222222222222";

    struct FakeGit(HashMap<String, String>);

    impl RevParse for FakeGit {
        fn rev_parse(&self, _repo_dir: &Path, rev: &str) -> Option<String> {
            self.0.get(rev).cloned()
        }
    }

    fn fake_git() -> FakeGit {
        FakeGit(
            [
                ("feature/login".to_string(), BRANCH_SHA.to_string()),
                (format!("{}^", BRANCH_SHA), PARENT_SHA.to_string()),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn action(id: &str, action_type: &str, params: Value, result: &str, secs: i64) -> Action {
        Action {
            id: id.into(),
            workspace_id: "ws".into(),
            flow_id: "f1".into(),
            action_type: action_type.into(),
            params: params.as_object().cloned().unwrap_or_default(),
            result: result.into(),
            status: "complete".into(),
            created: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn seeded_store(with_worktree: bool) -> InMemoryLogStore {
        let store = InMemoryLogStore::new();
        store.insert_task(Task {
            id: "t1".into(),
            workspace_id: "ws".into(),
            title: "Login".into(),
            description: "  Fix the login redirect  ".into(),
            status: TaskStatus::Complete,
            created: Utc.timestamp_opt(0, 0).unwrap(),
            updated: Utc.timestamp_opt(0, 0).unwrap(),
        });
        store.insert_flow(Flow {
            id: "f1".into(),
            workspace_id: "ws".into(),
            parent_id: "t1".into(),
            flow_type: "basic_dev".into(),
            status: "complete".into(),
        });
        if with_worktree {
            store.insert_worktree(Worktree {
                id: "w1".into(),
                workspace_id: "ws".into(),
                flow_id: "f1".into(),
                name: "feature/login".into(),
                working_directory: "/work/f1".into(),
                created: Utc.timestamp_opt(0, 0).unwrap(),
            });
        }
        let diff = "diff --git a/src/auth.rs b/src/auth.rs\n@@ -10,2 +10,3 @@\n a\n+b\n c\n";
        for a in [
            action(
                "a1",
                "tool_call.read_file_lines",
                json!({"file_lines": [{"file_path": "/work/f1/src/other.rs", "line_number": 5}]}),
                "",
                1,
            ),
            action(
                "a2",
                "tool_call.read_file_lines",
                json!({"file_lines": [{"file_path": "src/auth.rs", "line_number": 11}]}),
                "",
                2,
            ),
            action("m1", MERGE_APPROVAL_ACTION_TYPE, json!({"diff": diff}), "", 3),
            action(
                "a3",
                "tool_call.bulk_search_repository",
                json!({"searches": [{"search_term": "x"}]}),
                "",
                4,
            ),
            action("m2", MERGE_APPROVAL_ACTION_TYPE, json!({}), "", 5),
            action("a4", "tool_call.read_file_lines", json!({}), "", 6),
        ] {
            store.insert_action(a);
        }
        store
    }

    #[tokio::test]
    async fn extracts_one_row_per_case() {
        let store = seeded_store(true);
        let (rows, summary) =
            extract_workspace(&store, &fake_git(), &ExtractOptions::new("ws"), &NoProgress)
                .await
                .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(summary.cases, 2);
        assert_eq!(summary.rows, 2);

        let first = &rows.a[0];
        assert_eq!(first.envelope.case_id, "m1");
        assert_eq!(first.envelope.query, "Fix the login redirect");
        assert!(!first.envelope.needs_query);
        assert_eq!(first.envelope.base_commit, PARENT_SHA);
        assert!(!first.envelope.needs_base_commit);

        let paths: Vec<&str> = first.file_paths.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["src/auth.rs", "src/other.rs"]);
        assert_eq!(
            first.file_paths[0].sources,
            vec![PathSource::ReviewMergeDiff, PathSource::ToolCallArgs]
        );

        assert!(rows.b[0].line_ranges[0].is_golden());
        let call_ids: Vec<&str> = rows.c[0]
            .tool_calls
            .iter()
            .map(|c| c.action_id.as_str())
            .collect();
        assert_eq!(call_ids, vec!["a2", "a1"]);

        let second = &rows.a[1];
        assert_eq!(second.envelope.case_index, 1);
        assert!(second.envelope.needs_query);
        assert_eq!(rows.c[1].tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn known_cases_are_skipped() {
        let store = seeded_store(true);
        let mut options = ExtractOptions::new("ws");
        options.known_case_ids.insert("m1".into());

        let (rows, summary) = extract_workspace(&store, &fake_git(), &options, &NoProgress)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.a[0].envelope.case_id, "m2");
        assert_eq!(summary.cases_skipped, 1);
    }

    #[tokio::test]
    async fn flows_without_worktree_are_skipped() {
        let store = seeded_store(false);
        let (rows, summary) =
            extract_workspace(&store, &fake_git(), &ExtractOptions::new("ws"), &NoProgress)
                .await
                .unwrap();
        assert!(rows.is_empty());
        assert_eq!(summary.flows, 1);
        assert_eq!(summary.flows_without_worktree, 1);
    }

    #[tokio::test]
    async fn unresolved_commit_sets_flag() {
        let store = seeded_store(true);
        let (rows, summary) = extract_workspace(
            &store,
            &FakeGit(HashMap::new()),
            &ExtractOptions::new("ws"),
            &NoProgress,
        )
        .await
        .unwrap();
        assert!(rows.a.iter().all(|r| r.envelope.needs_base_commit));
        assert!(rows.a.iter().all(|r| r.envelope.base_commit.is_empty()));
        assert_eq!(summary.rows_needing_base_commit, 2);
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let store = seeded_store(true);
        let options = ExtractOptions::new("ws");
        let (first, _) = extract_workspace(&store, &fake_git(), &options, &NoProgress)
            .await
            .unwrap();
        let (second, _) = extract_workspace(&store, &fake_git(), &options, &NoProgress)
            .await
            .unwrap();
        assert_eq!(first.a, second.a);
        assert_eq!(first.b, second.b);
        assert_eq!(first.c, second.c);
    }

    #[test]
    fn query_falls_back_to_title() {
        let task = Task {
            id: "t".into(),
            workspace_id: "ws".into(),
            title: " Title ".into(),
            description: "   ".into(),
            status: TaskStatus::Complete,
            created: Utc::now(),
            updated: Utc::now(),
        };
        assert_eq!(derive_query(&task, 0), ("Title".to_string(), true));
    }
}
