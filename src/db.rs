use anyhow::{bail, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::config::Config;

/// Open the action log, creating the file and its directory if needed.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    open(db_path, true).await
}

/// Open an action log that must already exist.
pub async fn connect_existing(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;
    if !db_path.is_file() {
        bail!(
            "Action log not found: {} (check [db].path or run `ctxds init`)",
            db_path.display()
        );
    }
    open(db_path, false).await
}

async fn open(db_path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open action log: {}", db_path.display()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::TempDir;

    fn config_at(tmp: &TempDir, db: &str) -> Config {
        let path = tmp.path().join("ctxds.toml");
        std::fs::write(
            &path,
            format!("[db]\npath = \"{}/{}\"\n", tmp.path().display(), db),
        )
        .unwrap();
        load_config(&path).unwrap()
    }

    #[tokio::test]
    async fn existing_log_is_required() {
        let tmp = TempDir::new().unwrap();
        let cfg = config_at(&tmp, "missing/actions.sqlite");

        let err = connect_existing(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("Action log not found"), "{}", err);
        assert!(!cfg.db.path.exists());
        assert!(!tmp.path().join("missing").exists());
    }

    #[tokio::test]
    async fn existing_log_opens_after_creation() {
        let tmp = TempDir::new().unwrap();
        let cfg = config_at(&tmp, "actions.sqlite");

        connect(&cfg).await.unwrap().close().await;
        assert!(cfg.db.path.is_file());
        let pool = connect_existing(&cfg).await.unwrap();
        pool.close().await;
    }
}
