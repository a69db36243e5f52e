//! Read access to the action log.
//!
//! The [`ActionLogStore`] trait is the only way the extraction pipeline
//! sees the orchestration platform's records, so backends are pluggable:
//! the app crate reads a SQLite database, tests use
//! [`InMemoryLogStore`](memory::InMemoryLogStore).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Action, Flow, Task, TaskStatus, Worktree};

/// Abstract, read-only action-log backend.
///
/// # Operations
///
/// | Method | Returns |
/// |--------|---------|
/// | [`get_tasks`](ActionLogStore::get_tasks) | tasks of a workspace with one of the given statuses |
/// | [`get_flows_for_task`](ActionLogStore::get_flows_for_task) | flows whose parent is the task |
/// | [`get_worktrees_for_flow`](ActionLogStore::get_worktrees_for_flow) | worktrees attached to the flow |
/// | [`get_flow_actions`](ActionLogStore::get_flow_actions) | every action of the flow, unordered |
///
/// Ordering of returned records is unspecified. Callers that need an order
/// sort explicitly.
#[async_trait]
pub trait ActionLogStore: Send + Sync {
    async fn get_tasks(&self, workspace_id: &str, statuses: &[TaskStatus]) -> Result<Vec<Task>>;

    async fn get_flows_for_task(&self, workspace_id: &str, task_id: &str) -> Result<Vec<Flow>>;

    async fn get_worktrees_for_flow(&self, workspace_id: &str, flow_id: &str)
        -> Result<Vec<Worktree>>;

    async fn get_flow_actions(&self, workspace_id: &str, flow_id: &str) -> Result<Vec<Action>>;
}
