//! Core data models used throughout Context Dataset.
//!
//! Two families of types live here:
//!
//! - **Log records** ([`Task`], [`Flow`], [`Worktree`], [`Action`]) as they
//!   come out of an [`ActionLogStore`](crate::store::ActionLogStore). They
//!   are read-only inputs and never mutated by the pipeline.
//! - **Dataset records** ([`DatasetARow`], [`DatasetBRow`], [`DatasetCRow`])
//!   and the evidence they carry ([`FilePath`], [`FileLineRange`],
//!   [`ToolCallSpec`]). These are serialized as camelCase JSON, one object
//!   per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool_args::ToolArgs;

/// Action type that closes a case.
pub const MERGE_APPROVAL_ACTION_TYPE: &str = "user_request.approve.merge";

/// Prefix shared by every tool invocation action type.
pub const TOOL_CALL_PREFIX: &str = "tool_call.";

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Blocked,
    InReview,
    Complete,
    Canceled,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "to_do",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::InReview => "in_review",
            TaskStatus::Complete => "complete",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "to_do" => Some(TaskStatus::ToDo),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "in_review" => Some(TaskStatus::InReview),
            "complete" => Some(TaskStatus::Complete),
            "canceled" => Some(TaskStatus::Canceled),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// A development task recorded by the orchestration platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// One execution of a task's workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub workspace_id: String,
    /// Id of the owning task.
    pub parent_id: String,
    pub flow_type: String,
    pub status: String,
}

/// Isolated git working directory attached to a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Worktree {
    pub id: String,
    pub workspace_id: String,
    pub flow_id: String,
    /// Branch name checked out in the worktree.
    pub name: String,
    pub working_directory: String,
    pub created: DateTime<Utc>,
}

/// Immutable log entry belonging to a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: String,
    pub workspace_id: String,
    pub flow_id: String,
    /// Free-form type, e.g. `tool_call.read_file_lines`.
    pub action_type: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    pub result: String,
    pub status: String,
    pub created: DateTime<Utc>,
}

impl Action {
    pub fn is_merge_approval(&self) -> bool {
        self.action_type == MERGE_APPROVAL_ACTION_TYPE
    }

    /// Tool name for `tool_call.*` actions.
    pub fn tool_name(&self) -> Option<&str> {
        self.action_type.strip_prefix(TOOL_CALL_PREFIX)
    }
}

/// A contiguous run of actions ending at a merge approval.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// Id of the terminating merge-approval action.
    pub id: String,
    pub index: usize,
    pub flow_id: String,
    pub actions: Vec<Action>,
}

impl Case {
    /// The terminating merge-approval action.
    pub fn merge_approval(&self) -> Option<&Action> {
        self.actions.last().filter(|a| a.is_merge_approval())
    }
}

/// Where a [`FilePath`] was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSource {
    /// Golden: edited by the approved merge diff.
    ReviewMergeDiff,
    ToolCallArgs,
    ToolCallResult,
    /// A diff embedded in some other action result.
    Diff,
    /// Added by a human validator.
    Manual,
}

/// Where a [`FileLineRange`] was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSource {
    GoldenDiff,
    ToolCallArgs,
    ToolCallResult,
}

/// A discovered file path and the distinct sources that reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePath {
    pub path: String,
    #[serde(default)]
    pub sources: Vec<PathSource>,
}

impl FilePath {
    pub fn is_golden(&self) -> bool {
        self.sources.contains(&PathSource::ReviewMergeDiff)
    }
}

/// A discovered inclusive, 1-based line interval within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLineRange {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub sources: Vec<RangeSource>,
}

impl FileLineRange {
    pub fn is_golden(&self) -> bool {
        self.sources.contains(&RangeSource::GoldenDiff)
    }
}

/// One context-retrieval tool invocation pulled from a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallSpec {
    pub tool_name: String,
    pub action_id: String,
    /// Canonical JSON of the action's parameter map (keys sorted).
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_arguments: Option<ToolArgs>,
    /// Empty when the typed decode succeeded.
    #[serde(default)]
    pub parse_error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Fields shared by every dataset record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowEnvelope {
    pub workspace_id: String,
    pub task_id: String,
    pub flow_id: String,
    pub case_id: String,
    pub case_index: usize,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub base_commit: String,
    #[serde(default)]
    pub needs_query: bool,
    #[serde(default)]
    pub needs_base_commit: bool,
}

/// Dataset A: ranked file paths per case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetARow {
    #[serde(flatten)]
    pub envelope: RowEnvelope,
    #[serde(default)]
    pub file_paths: Vec<FilePath>,
}

/// Dataset B: ranked line ranges per case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetBRow {
    #[serde(flatten)]
    pub envelope: RowEnvelope,
    #[serde(default)]
    pub line_ranges: Vec<FileLineRange>,
}

/// Dataset C: ranked tool calls per case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCRow {
    #[serde(flatten)]
    pub envelope: RowEnvelope,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallSpec>,
}
