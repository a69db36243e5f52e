//! SQLite-backed [`ActionLogStore`] implementation.
//!
//! Reads the `tasks`, `flows`, `worktrees`, and `flow_actions` tables created
//! by [`migrate::create_schema`](crate::migrate::create_schema). Rows are
//! returned in primary-key order; the orchestrator sorts again anyway.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use context_dataset_core::models::{Action, Flow, Task, TaskStatus, Worktree};
use context_dataset_core::store::ActionLogStore;

/// SQLite implementation of the [`ActionLogStore`] trait.
pub struct SqliteLogStore {
    pool: SqlitePool,
}

impl SqliteLogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_ts(raw: &str, table: &str, id: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp '{}' in {} row {}", raw, table, id))
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let id: String = row.get("id");
    let status_raw: String = row.get("status");
    let status = TaskStatus::parse(&status_raw)
        .with_context(|| format!("Unknown status '{}' for task {}", status_raw, id))?;
    let created = parse_ts(&row.get::<String, _>("created"), "tasks", &id)?;
    let updated = parse_ts(&row.get::<String, _>("updated"), "tasks", &id)?;
    Ok(Task {
        workspace_id: row.get("workspace_id"),
        title: row.get("title"),
        description: row.get("description"),
        status,
        created,
        updated,
        id,
    })
}

fn action_from_row(row: &SqliteRow) -> Result<Action> {
    let id: String = row.get("id");
    let params_json: String = row.get("params_json");
    let params = match serde_json::from_str::<serde_json::Value>(&params_json)
        .with_context(|| format!("Invalid params_json for action {}", id))?
    {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => anyhow::bail!("params_json for action {} is not an object: {}", id, other),
    };
    let created = parse_ts(&row.get::<String, _>("created"), "flow_actions", &id)?;
    Ok(Action {
        workspace_id: row.get("workspace_id"),
        flow_id: row.get("flow_id"),
        action_type: row.get("action_type"),
        params,
        result: row.get("result"),
        status: row.get("status"),
        created,
        id,
    })
}

#[async_trait]
impl ActionLogStore for SqliteLogStore {
    async fn get_tasks(&self, workspace_id: &str, statuses: &[TaskStatus]) -> Result<Vec<Task>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT id, workspace_id, title, description, status, created, updated \
             FROM tasks WHERE workspace_id = ? AND status IN ({}) ORDER BY id",
            placeholders
        );
        let mut query = sqlx::query(&sql).bind(workspace_id);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to query tasks for workspace {}", workspace_id))?;

        rows.iter().map(task_from_row).collect()
    }

    async fn get_flows_for_task(&self, workspace_id: &str, task_id: &str) -> Result<Vec<Flow>> {
        let rows = sqlx::query(
            "SELECT id, workspace_id, parent_id, flow_type, status \
             FROM flows WHERE workspace_id = ? AND parent_id = ? ORDER BY id",
        )
        .bind(workspace_id)
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to query flows for task {}", task_id))?;

        Ok(rows
            .iter()
            .map(|row| Flow {
                id: row.get("id"),
                workspace_id: row.get("workspace_id"),
                parent_id: row.get("parent_id"),
                flow_type: row.get("flow_type"),
                status: row.get("status"),
            })
            .collect())
    }

    async fn get_worktrees_for_flow(
        &self,
        workspace_id: &str,
        flow_id: &str,
    ) -> Result<Vec<Worktree>> {
        let rows = sqlx::query(
            "SELECT id, workspace_id, flow_id, name, working_directory, created \
             FROM worktrees WHERE workspace_id = ? AND flow_id = ? ORDER BY created, id",
        )
        .bind(workspace_id)
        .bind(flow_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to query worktrees for flow {}", flow_id))?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("id");
                let created = parse_ts(&row.get::<String, _>("created"), "worktrees", &id)?;
                Ok(Worktree {
                    workspace_id: row.get("workspace_id"),
                    flow_id: row.get("flow_id"),
                    name: row.get("name"),
                    working_directory: row.get("working_directory"),
                    created,
                    id,
                })
            })
            .collect()
    }

    async fn get_flow_actions(&self, workspace_id: &str, flow_id: &str) -> Result<Vec<Action>> {
        let rows = sqlx::query(
            "SELECT id, workspace_id, flow_id, action_type, params_json, result, status, created \
             FROM flow_actions WHERE workspace_id = ? AND flow_id = ? ORDER BY id",
        )
        .bind(workspace_id)
        .bind(flow_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to query actions for flow {}", flow_id))?;

        rows.iter().map(action_from_row).collect()
    }
}
