//! In-memory [`ActionLogStore`] implementation for testing.
//!
//! Records live in `Vec`s behind `std::sync::RwLock`. Lookups are linear
//! scans, which is fine for fixture-sized logs.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Action, Flow, Task, TaskStatus, Worktree};

use super::ActionLogStore;

/// In-memory action log.
#[derive(Default)]
pub struct InMemoryLogStore {
    tasks: RwLock<Vec<Task>>,
    flows: RwLock<Vec<Flow>>,
    worktrees: RwLock<Vec<Worktree>>,
    actions: RwLock<Vec<Action>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(&self, task: Task) {
        self.tasks.write().unwrap().push(task);
    }

    pub fn insert_flow(&self, flow: Flow) {
        self.flows.write().unwrap().push(flow);
    }

    pub fn insert_worktree(&self, worktree: Worktree) {
        self.worktrees.write().unwrap().push(worktree);
    }

    pub fn insert_action(&self, action: Action) {
        self.actions.write().unwrap().push(action);
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory log store lock poisoned")
}

#[async_trait]
impl ActionLogStore for InMemoryLogStore {
    async fn get_tasks(&self, workspace_id: &str, statuses: &[TaskStatus]) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        Ok(tasks
            .iter()
            .filter(|t| t.workspace_id == workspace_id && statuses.contains(&t.status))
            .cloned()
            .collect())
    }

    async fn get_flows_for_task(&self, workspace_id: &str, task_id: &str) -> Result<Vec<Flow>> {
        let flows = self.flows.read().map_err(poisoned)?;
        Ok(flows
            .iter()
            .filter(|f| f.workspace_id == workspace_id && f.parent_id == task_id)
            .cloned()
            .collect())
    }

    async fn get_worktrees_for_flow(
        &self,
        workspace_id: &str,
        flow_id: &str,
    ) -> Result<Vec<Worktree>> {
        let worktrees = self.worktrees.read().map_err(poisoned)?;
        Ok(worktrees
            .iter()
            .filter(|w| w.workspace_id == workspace_id && w.flow_id == flow_id)
            .cloned()
            .collect())
    }

    async fn get_flow_actions(&self, workspace_id: &str, flow_id: &str) -> Result<Vec<Action>> {
        let actions = self.actions.read().map_err(poisoned)?;
        Ok(actions
            .iter()
            .filter(|a| a.workspace_id == workspace_id && a.flow_id == flow_id)
            .cloned()
            .collect())
    }
}
