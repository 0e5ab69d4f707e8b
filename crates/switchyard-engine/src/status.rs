use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use switchyard_config::{Priority, Strategy};
use switchyard_workflow::{
  ExecutionState, StepError, StepRun, StepStatus, WorkflowDefinition, WorkflowExecution,
};

/// A step as reported by [`WorkflowStatus`]: definition fields merged with
/// the latest run entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
  pub step_id: String,
  pub name: String,
  pub executor: String,
  pub dependencies: Vec<String>,
  pub status: StepStatus,
  pub retry_count: u32,
  pub max_retries: u32,
  pub timeout_seconds: u64,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tools: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// Merged view of a workflow definition and its latest committed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStatus {
  pub workflow_id: String,
  pub name: String,
  pub description: String,
  pub strategy: Strategy,
  pub priority: Priority,
  pub state: ExecutionState,
  pub current_step: Option<String>,
  pub total_steps: usize,
  pub completed_steps: Vec<String>,
  pub failed_steps: Vec<String>,
  pub progress_percentage: f64,
  pub created_at: DateTime<Utc>,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  pub results: BTreeMap<String, Value>,
  pub errors: Vec<StepError>,
  pub steps: Vec<StepView>,
}

impl WorkflowStatus {
  /// Without an execution the workflow reports `Created`.
  pub(crate) fn new(definition: &WorkflowDefinition, execution: Option<&WorkflowExecution>) -> Self {
    let idle = StepRun::default();
    let steps = definition
      .steps
      .iter()
      .map(|step| {
        let run = execution
          .and_then(|e| e.steps.get(&step.step_id))
          .unwrap_or(&idle);
        StepView {
          step_id: step.step_id.clone(),
          name: step.name.clone(),
          executor: step.executor.clone(),
          dependencies: step.dependencies.clone(),
          status: run.status,
          retry_count: run.retry_count,
          max_retries: step.max_retries,
          timeout_seconds: step.timeout_seconds,
          tools: step.tools.clone(),
          result: run.result.clone(),
          error: run.error.clone(),
          started_at: run.started_at,
          completed_at: run.completed_at,
        }
      })
      .collect();

    Self {
      workflow_id: definition.workflow_id.clone(),
      name: definition.name.clone(),
      description: definition.description.clone(),
      strategy: definition.strategy,
      priority: definition.priority,
      state: execution.map_or(ExecutionState::Created, |e| e.state),
      current_step: execution.and_then(|e| e.current_step.clone()),
      total_steps: definition.total_steps(),
      completed_steps: execution.map(|e| e.completed_steps.clone()).unwrap_or_default(),
      failed_steps: execution.map(|e| e.failed_steps.clone()).unwrap_or_default(),
      progress_percentage: execution.map_or(0.0, |e| e.progress_percentage),
      created_at: definition.created_at,
      start_time: execution.map(|e| e.start_time),
      end_time: execution.and_then(|e| e.end_time),
      results: execution.map(|e| e.results.clone()).unwrap_or_default(),
      errors: execution.map(|e| e.errors.clone()).unwrap_or_default(),
      steps,
    }
  }

  pub fn is_terminal(&self) -> bool {
    self.state.is_terminal()
  }

  pub fn step(&self, step_id: &str) -> Option<&StepView> {
    self.steps.iter().find(|s| s.step_id == step_id)
  }
}

/// Outcome of [`crate::WorkflowEngine::recover`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
  /// Workflows loaded into the engine, in any state.
  pub loaded: usize,
  /// Interrupted workflows that were re-dispatched.
  pub resumed: Vec<String>,
  /// Interrupted workflows left in `Waiting` for an explicit start.
  pub waiting: Vec<String>,
  /// Paused workflows given a driver.
  pub paused: Vec<String>,
  /// Workflows skipped because a stored record could not be decoded.
  pub skipped: Vec<String>,
  /// Execution records without a definition, removed from the store.
  pub orphaned: Vec<String>,
}
