use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use switchyard_workflow::{WorkflowDefinition, WorkflowExecution};

use crate::Store;
use crate::error::{Error, decode, encode};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if missing) the database file and run migrations.
  pub async fn open(path: &Path) -> Result<Self, Error> {
    let options = SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn put_definition(&self, definition: &WorkflowDefinition) -> Result<(), Error> {
    let record = encode(&definition.workflow_id, definition)?;

    sqlx::query(
      r#"
            INSERT INTO workflow_definitions (workflow_id, record, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (workflow_id) DO UPDATE
            SET record = excluded.record, updated_at = excluded.updated_at
            "#,
    )
    .bind(&definition.workflow_id)
    .bind(record)
    .bind(definition.created_at)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_definition(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, Error> {
    let record: Option<String> = sqlx::query_scalar(
      r#"
            SELECT record FROM workflow_definitions WHERE workflow_id = ?
            "#,
    )
    .bind(workflow_id)
    .fetch_optional(&self.pool)
    .await?;

    record.map(|r| decode(workflow_id, &r)).transpose()
  }

  async fn definition_ids(&self) -> Result<Vec<String>, Error> {
    let ids: Vec<String> = sqlx::query_scalar(
      r#"
            SELECT workflow_id FROM workflow_definitions ORDER BY created_at ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(ids)
  }

  async fn delete_definition(&self, workflow_id: &str) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM workflow_definitions WHERE workflow_id = ?")
      .bind(workflow_id)
      .execute(&self.pool)
      .await?;

    Ok(result.rows_affected() > 0)
  }

  async fn put_execution(&self, execution: &WorkflowExecution) -> Result<(), Error> {
    let record = encode(&execution.workflow_id, execution)?;

    sqlx::query(
      r#"
            INSERT INTO workflow_executions (workflow_id, state, record, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (workflow_id) DO UPDATE
            SET state = excluded.state, record = excluded.record, updated_at = excluded.updated_at
            "#,
    )
    .bind(&execution.workflow_id)
    .bind(execution.state.as_str())
    .bind(record)
    .bind(execution.updated_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn get_execution(&self, workflow_id: &str) -> Result<Option<WorkflowExecution>, Error> {
    let record: Option<String> = sqlx::query_scalar(
      r#"
            SELECT record FROM workflow_executions WHERE workflow_id = ?
            "#,
    )
    .bind(workflow_id)
    .fetch_optional(&self.pool)
    .await?;

    record.map(|r| decode(workflow_id, &r)).transpose()
  }

  async fn execution_ids(&self) -> Result<Vec<String>, Error> {
    let ids: Vec<String> = sqlx::query_scalar(
      r#"
            SELECT workflow_id FROM workflow_executions ORDER BY workflow_id ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(ids)
  }

  async fn delete_execution(&self, workflow_id: &str) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM workflow_executions WHERE workflow_id = ?")
      .bind(workflow_id)
      .execute(&self.pool)
      .await?;

    Ok(result.rows_affected() > 0)
  }
}
