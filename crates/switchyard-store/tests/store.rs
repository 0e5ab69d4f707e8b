use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use switchyard_config::{Priority, StepDef, Strategy, WorkflowDef};
use switchyard_store::{Error, MemoryStore, SqliteStore, Store};
use switchyard_workflow::{
  Defaults, ExecutionState, FailureCause, WorkflowDefinition, WorkflowExecution,
};

async fn sqlite_store() -> SqliteStore {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .unwrap();
  let store = SqliteStore::new(pool);
  store.migrate().await.unwrap();
  store
}

fn definition(workflow_id: &str) -> WorkflowDefinition {
  let def = WorkflowDef {
    name: "audit".to_string(),
    description: "security audit".to_string(),
    steps: vec![
      StepDef::new("assess", "Assess", "security_specialist"),
      StepDef::new("report", "Report", "coordinator").depends_on(["assess"]),
    ],
    strategy: Strategy::SecurityFirst,
    priority: Priority::Critical,
    max_parallel_steps: Some(2),
    timeout_seconds: None,
    created_by: Some("tests".to_string()),
  };
  WorkflowDefinition::new(workflow_id, def, &Defaults::default()).unwrap()
}

fn execution(definition: &WorkflowDefinition) -> WorkflowExecution {
  let mut execution = WorkflowExecution::new(definition);
  execution.mark_running("assess");
  execution.mark_completed("assess", json!({ "findings": 3 }));
  execution.mark_failed("report", FailureCause::Timeout, "step timed out", 1);
  execution.finish();
  execution
}

async fn exercise(store: &dyn Store) {
  let definition = definition("wf-1");
  let execution = execution(&definition);

  assert!(store.get_definition("wf-1").await.unwrap().is_none());
  assert!(store.get_execution("wf-1").await.unwrap().is_none());

  store.put_definition(&definition).await.unwrap();
  store.put_execution(&execution).await.unwrap();

  assert_eq!(store.get_definition("wf-1").await.unwrap(), Some(definition.clone()));
  assert_eq!(store.get_execution("wf-1").await.unwrap(), Some(execution.clone()));
  assert_eq!(store.definition_ids().await.unwrap(), vec!["wf-1"]);
  assert_eq!(store.execution_ids().await.unwrap(), vec!["wf-1"]);

  let mut updated = execution.clone();
  updated.state = ExecutionState::Cancelled;
  store.put_execution(&updated).await.unwrap();
  let loaded = store.get_execution("wf-1").await.unwrap().unwrap();
  assert_eq!(loaded.state, ExecutionState::Cancelled);

  assert!(store.delete_execution("wf-1").await.unwrap());
  assert!(!store.delete_execution("wf-1").await.unwrap());
  assert!(store.delete_definition("wf-1").await.unwrap());
  assert!(!store.delete_definition("wf-1").await.unwrap());
  assert!(store.definition_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sqlite_round_trip() {
  let store = sqlite_store().await;
  exercise(&store).await;
}

#[tokio::test]
async fn test_memory_round_trip() {
  let store = MemoryStore::new();
  exercise(&store).await;
}

#[tokio::test]
async fn test_sqlite_reports_corrupt_record() {
  let store = sqlite_store().await;

  sqlx::query(
    "INSERT INTO workflow_executions (workflow_id, state, record, updated_at) VALUES (?, ?, ?, ?)",
  )
  .bind("wf-bad")
  .bind("running")
  .bind("{not json")
  .bind(chrono::Utc::now())
  .execute(store.pool())
  .await
  .unwrap();

  let err = store.get_execution("wf-bad").await.unwrap_err();
  assert!(matches!(err, Error::Corrupt { ref workflow_id, .. } if workflow_id == "wf-bad"));
  assert_eq!(store.execution_ids().await.unwrap(), vec!["wf-bad"]);
}

#[tokio::test]
async fn test_sqlite_open_persists_across_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("switchyard.db");
  let definition = definition("wf-disk");

  {
    let store = SqliteStore::open(&path).await.unwrap();
    store.put_definition(&definition).await.unwrap();
    store.pool().close().await;
  }

  let store = SqliteStore::open(&path).await.unwrap();
  assert_eq!(
    store.get_definition("wf-disk").await.unwrap(),
    Some(definition)
  );
}

fn wide_definition(workflow_id: &str, total: usize) -> WorkflowDefinition {
  let def = WorkflowDef {
    name: "wide".to_string(),
    description: String::new(),
    steps: (0..total)
      .map(|i| StepDef::new(format!("s{i}"), format!("S{i}"), "general_specialist"))
      .collect(),
    strategy: Strategy::ParallelAnalysis,
    priority: Priority::Low,
    max_parallel_steps: None,
    timeout_seconds: None,
    created_by: None,
  };
  WorkflowDefinition::new(workflow_id, def, &Defaults::default()).unwrap()
}

#[tokio::test]
async fn test_sqlite_progress_reloads_exactly() {
  let store = sqlite_store().await;

  for total in 1..=40 {
    let definition = wide_definition("wf-progress", total);
    let mut execution = WorkflowExecution::new(&definition);

    for done in 0..total {
      execution.mark_completed(&format!("s{done}"), json!(done));
      store.put_execution(&execution).await.unwrap();

      let loaded = store.get_execution("wf-progress").await.unwrap().unwrap();
      assert_eq!(
        loaded.progress_percentage.to_bits(),
        execution.progress_percentage.to_bits(),
        "{} of {total}",
        done + 1
      );
      assert_eq!(loaded, execution);
    }
  }
}

#[tokio::test]
async fn test_two_of_thirteen_round_trips() {
  let store = sqlite_store().await;
  let definition = wide_definition("wf-13", 13);
  let mut execution = WorkflowExecution::new(&definition);
  execution.mark_completed("s0", json!(null));
  execution.mark_completed("s1", json!(null));
  assert_eq!(execution.progress_percentage, 2.0 / 13.0 * 100.0);

  store.put_execution(&execution).await.unwrap();
  assert_eq!(
    store.get_execution("wf-13").await.unwrap(),
    Some(execution)
  );
}
