mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Behavior, TestExecutor, chain, diamond, engine, workflow};
use switchyard_config::StepDef;
use switchyard_engine::{ChannelNotifier, EngineError, ExecutionEvent, WorkflowEngine};
use switchyard_store::{MemoryStore, Store};
use switchyard_workflow::{ExecutionState, FailureCause, StepStatus, WorkflowError};

#[tokio::test]
async fn test_diamond_runs_in_dependency_order() {
  let executor = Arc::new(TestExecutor::new());
  let (engine, _store) = engine(executor.clone());

  let id = engine.create(workflow(diamond())).await.unwrap();
  engine.start(&id).await.unwrap();
  let status = engine.wait(&id).await.unwrap();

  assert_eq!(status.state, ExecutionState::Completed);
  assert_eq!(status.progress_percentage, 100.0);
  assert_eq!(status.completed_steps.len(), 4);
  assert!(status.failed_steps.is_empty());
  assert!(status.end_time.is_some());

  let started = executor.started();
  assert_eq!(started.first().map(String::as_str), Some("a"));
  assert_eq!(started.last().map(String::as_str), Some("d"));
  assert_eq!(
    status.results["d"]["upstream"],
    serde_json::json!(["b", "c"])
  );
}

#[tokio::test]
async fn test_parallelism_is_bounded() {
  let mut executor = TestExecutor::new();
  let mut steps = Vec::new();
  for i in 0..5 {
    let id = format!("s{i}");
    executor = executor.with(&id, Behavior::delay_ms(50));
    steps.push(StepDef::new(id.clone(), id, "x"));
  }
  let executor = Arc::new(executor);
  let (engine, _store) = engine(executor.clone());

  let mut def = workflow(steps);
  def.max_parallel_steps = Some(2);
  let id = engine.create(def).await.unwrap();
  engine.start(&id).await.unwrap();
  let status = engine.wait(&id).await.unwrap();

  assert_eq!(status.state, ExecutionState::Completed);
  assert_eq!(executor.peak(), 2);
}

#[tokio::test]
async fn test_retry_then_success() {
  let executor = Arc::new(TestExecutor::new().with("b", Behavior::failing(2)));
  let (engine, _store) = engine(executor.clone());

  let mut steps = chain();
  steps[1] = steps[1].clone().with_max_retries(2);
  let id = engine.create(workflow(steps)).await.unwrap();
  engine.start(&id).await.unwrap();
  let status = engine.wait(&id).await.unwrap();

  assert_eq!(status.state, ExecutionState::Completed);
  let b = status.step("b").unwrap();
  assert_eq!(b.status, StepStatus::Completed);
  assert_eq!(b.retry_count, 2);
  assert!(b.error.is_none());
  assert!(status.errors.is_empty());
}

#[tokio::test]
async fn test_retry_exhaustion_fails_dependents() {
  let executor = Arc::new(TestExecutor::new().with("b", Behavior::failing(u32::MAX)));
  let (engine, _store) = engine(executor.clone());

  let mut steps = chain();
  steps[1] = steps[1].clone().with_max_retries(1);
  let id = engine.create(workflow(steps)).await.unwrap();
  engine.start(&id).await.unwrap();
  let status = engine.wait(&id).await.unwrap();

  assert_eq!(status.state, ExecutionState::Failed);
  assert_eq!(status.completed_steps, vec!["a"]);
  assert_eq!(status.failed_steps, vec!["b", "c"]);
  assert_eq!(
    status.completed_steps.len() + status.failed_steps.len(),
    status.total_steps
  );
  assert_eq!(status.step("b").unwrap().retry_count, 1);
  assert_eq!(status.errors[0].cause, FailureCause::Execution);
  assert_eq!(status.errors[0].attempt, 2);
  assert_eq!(status.errors[1].step_id, "c");
  assert_eq!(status.errors[1].cause, FailureCause::DependencyFailed);
  assert!(!executor.started().contains(&"c".to_string()));
}

#[tokio::test]
async fn test_step_timeout_is_recorded() {
  let executor = Arc::new(TestExecutor::new().with("slow", Behavior::delay_ms(3000)));
  let (engine, _store) = engine(executor);

  let steps = vec![StepDef::new("slow", "Slow", "x").with_timeout_seconds(1)];
  let id = engine.create(workflow(steps)).await.unwrap();
  engine.start(&id).await.unwrap();
  let status = engine.wait(&id).await.unwrap();

  assert_eq!(status.state, ExecutionState::Failed);
  assert_eq!(status.errors.len(), 1);
  assert_eq!(status.errors[0].cause, FailureCause::Timeout);
}

#[tokio::test]
async fn test_workflow_timeout_fails_unfinished_steps() {
  let executor = Arc::new(TestExecutor::new().with("a", Behavior::delay_ms(5000)));
  let (engine, _store) = engine(executor);

  let mut def = workflow(chain());
  def.timeout_seconds = Some(1);
  let id = engine.create(def).await.unwrap();
  engine.start(&id).await.unwrap();
  let status = engine.wait(&id).await.unwrap();

  assert_eq!(status.state, ExecutionState::Failed);
  assert_eq!(status.failed_steps, vec!["a", "b", "c"]);
  assert!(
    status
      .errors
      .iter()
      .all(|e| e.cause == FailureCause::WorkflowTimeout)
  );
}

#[tokio::test]
async fn test_pause_and_resume_match_uninterrupted_run() {
  let reference = {
    let executor = Arc::new(TestExecutor::new().with("a", Behavior::delay_ms(100)));
    let (engine, _store) = engine(executor);
    let id = engine.create(workflow(chain())).await.unwrap();
    engine.start(&id).await.unwrap();
    engine.wait(&id).await.unwrap()
  };

  let executor = Arc::new(TestExecutor::new().with("a", Behavior::delay_ms(100)));
  let (engine, _store) = engine(executor.clone());
  let id = engine.create(workflow(chain())).await.unwrap();
  engine.start(&id).await.unwrap();

  assert!(!engine.resume(&id).await);
  assert!(engine.pause(&id).await);
  assert!(!engine.pause(&id).await);

  tokio::time::sleep(Duration::from_millis(300)).await;
  let paused = engine.status(&id).await.unwrap();
  assert_eq!(paused.state, ExecutionState::Paused);
  assert_eq!(paused.completed_steps, vec!["a"]);
  assert_eq!(paused.step("b").unwrap().status, StepStatus::Pending);
  assert_eq!(executor.started(), vec!["a"]);

  assert!(engine.resume(&id).await);
  assert!(!engine.resume(&id).await);
  let status = engine.wait(&id).await.unwrap();

  assert_eq!(status.state, ExecutionState::Completed);
  assert_eq!(status.results, reference.results);
  assert_eq!(status.completed_steps, reference.completed_steps);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
  let executor = Arc::new(TestExecutor::new().with("a", Behavior::delay_ms(5000)));
  let (engine, _store) = engine(executor);

  let id = engine.create(workflow(chain())).await.unwrap();
  engine.start(&id).await.unwrap();
  tokio::time::sleep(Duration::from_millis(50)).await;

  assert!(engine.cancel(&id).await);
  assert!(!engine.cancel(&id).await);
  assert!(!engine.pause(&id).await);
  assert!(!engine.resume(&id).await);

  let status = engine.wait(&id).await.unwrap();
  assert_eq!(status.state, ExecutionState::Cancelled);
  assert!(status.end_time.is_some());
  assert_eq!(status.failed_steps, vec!["a", "b", "c"]);
  assert!(
    status
      .errors
      .iter()
      .all(|e| e.cause == FailureCause::Cancelled)
  );
}

#[tokio::test]
async fn test_cancel_while_paused() {
  let executor = Arc::new(TestExecutor::new());
  let (engine, _store) = engine(executor);

  let id = engine.create(workflow(chain())).await.unwrap();
  engine.start(&id).await.unwrap();
  if engine.pause(&id).await {
    assert!(engine.cancel(&id).await);
    let status = engine.status(&id).await.unwrap();
    assert_eq!(status.state, ExecutionState::Cancelled);
  } else {
    // Finished before the pause arrived
    let status = engine.wait(&id).await.unwrap();
    assert_eq!(status.state, ExecutionState::Completed);
  }
}

#[tokio::test]
async fn test_controls_on_unknown_or_created_workflow() {
  let (engine, _store) = engine(Arc::new(TestExecutor::new()));

  assert!(engine.status("missing").await.is_none());
  assert!(!engine.pause("missing").await);
  assert!(!engine.resume("missing").await);
  assert!(!engine.cancel("missing").await);
  assert!(!engine.delete("missing").await);
  assert!(engine.wait("missing").await.is_none());

  let id = engine.create(workflow(chain())).await.unwrap();
  let status = engine.status(&id).await.unwrap();
  assert_eq!(status.state, ExecutionState::Created);
  assert_eq!(status.progress_percentage, 0.0);
  assert!(status.start_time.is_none());
  assert!(!engine.pause(&id).await);
  assert!(!engine.cancel(&id).await);
}

#[tokio::test]
async fn test_create_and_start_errors() {
  let (engine, _store) = engine(Arc::new(TestExecutor::new()));

  let cyclic = vec![
    StepDef::new("a", "A", "x").depends_on(["b"]),
    StepDef::new("b", "B", "x").depends_on(["a"]),
  ];
  let err = engine.create(workflow(cyclic)).await.unwrap_err();
  assert!(matches!(
    err,
    EngineError::Validation(WorkflowError::Cycle { .. })
  ));

  let err = engine.create(workflow(vec![])).await.unwrap_err();
  assert!(matches!(err, EngineError::Validation(WorkflowError::NoSteps)));

  let err = engine.start("missing").await.unwrap_err();
  assert!(matches!(err, EngineError::UnknownWorkflow(_)));

  let id = engine.create(workflow(chain())).await.unwrap();
  engine.start(&id).await.unwrap();
  let err = engine.start(&id).await.unwrap_err();
  assert!(matches!(err, EngineError::AlreadyStarted(_)));
}

#[tokio::test]
async fn test_workflow_ids_are_unique() {
  let (engine, _store) = engine(Arc::new(TestExecutor::new()));

  let first = engine.create(workflow(chain())).await.unwrap();
  let second = engine.create(workflow(chain())).await.unwrap();
  assert_ne!(first, second);
}

#[tokio::test]
async fn test_list_orders_by_creation_and_filters() {
  let (engine, _store) = engine(Arc::new(TestExecutor::new()));

  let first = engine.create(workflow(chain())).await.unwrap();
  tokio::time::sleep(Duration::from_millis(5)).await;
  let second = engine.create(workflow(diamond())).await.unwrap();
  engine.start(&second).await.unwrap();
  engine.wait(&second).await.unwrap();

  let all: Vec<String> = engine
    .list(None)
    .await
    .into_iter()
    .map(|s| s.workflow_id)
    .collect();
  assert_eq!(all, vec![first.clone(), second.clone()]);

  let created = engine.list(Some(ExecutionState::Created)).await;
  assert_eq!(created.len(), 1);
  assert_eq!(created[0].workflow_id, first);

  let completed = engine.list(Some(ExecutionState::Completed)).await;
  assert_eq!(completed.len(), 1);
  assert_eq!(completed[0].workflow_id, second);
}

#[tokio::test]
async fn test_delete_removes_running_workflow() {
  let executor = Arc::new(TestExecutor::new().with("a", Behavior::delay_ms(5000)));
  let store = Arc::new(MemoryStore::new());
  let engine = WorkflowEngine::new(store.clone(), executor, common::settings());

  let id = engine.create(workflow(chain())).await.unwrap();
  engine.start(&id).await.unwrap();
  tokio::time::sleep(Duration::from_millis(50)).await;

  assert!(engine.delete(&id).await);
  assert!(engine.status(&id).await.is_none());
  assert!(store.get_definition(&id).await.unwrap().is_none());
  assert!(store.get_execution(&id).await.unwrap().is_none());
  assert!(!engine.delete(&id).await);
}

#[tokio::test]
async fn test_events_follow_the_run() {
  let (notifier, mut events) = ChannelNotifier::channel();
  let executor = Arc::new(TestExecutor::new());
  let engine = WorkflowEngine::new(Arc::new(MemoryStore::new()), executor, common::settings())
    .with_notifier(Arc::new(notifier));

  let id = engine.create(workflow(diamond())).await.unwrap();
  engine.start(&id).await.unwrap();
  engine.wait(&id).await.unwrap();

  let mut seen = Vec::new();
  while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), events.recv()).await {
    let done = matches!(event, ExecutionEvent::WorkflowCompleted { .. });
    seen.push(event);
    if done {
      break;
    }
  }

  assert_eq!(
    seen.first(),
    Some(&ExecutionEvent::WorkflowStarted {
      workflow_id: id.clone()
    })
  );
  assert_eq!(
    seen.last(),
    Some(&ExecutionEvent::WorkflowCompleted { workflow_id: id })
  );
  let started = seen
    .iter()
    .filter(|e| matches!(e, ExecutionEvent::StepStarted { .. }))
    .count();
  assert_eq!(started, 4);
}

#[tokio::test]
async fn test_subscribe_sees_terminal_snapshot() {
  let (engine, _store) = engine(Arc::new(TestExecutor::new()));
  let id = engine.create(workflow(chain())).await.unwrap();
  assert!(engine.subscribe(&id).await.is_none());

  engine.start(&id).await.unwrap();
  let mut snapshots = engine.subscribe(&id).await.unwrap();
  while !snapshots.borrow_and_update().is_terminal() {
    snapshots.changed().await.unwrap();
  }
  assert_eq!(snapshots.borrow().state, ExecutionState::Completed);
}
