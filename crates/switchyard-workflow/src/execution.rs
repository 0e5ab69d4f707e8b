use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::WorkflowDefinition;
use crate::error::UnknownState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
  Created,
  Running,
  Paused,
  /// Reloaded after an interruption and not yet re-dispatched.
  Waiting,
  Completed,
  Failed,
  Cancelled,
}

impl ExecutionState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Created => "created",
      Self::Running => "running",
      Self::Paused => "paused",
      Self::Waiting => "waiting",
      Self::Completed => "completed",
      Self::Failed => "failed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for ExecutionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ExecutionState {
  type Err = UnknownState;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "created" => Ok(Self::Created),
      "running" => Ok(Self::Running),
      "paused" => Ok(Self::Paused),
      "waiting" => Ok(Self::Waiting),
      "completed" => Ok(Self::Completed),
      "failed" => Ok(Self::Failed),
      "cancelled" => Ok(Self::Cancelled),
      _ => Err(UnknownState(s.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  #[default]
  Pending,
  Running,
  Completed,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
  Execution,
  Timeout,
  DependencyFailed,
  WorkflowTimeout,
  Cancelled,
}

impl FailureCause {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Execution => "execution",
      Self::Timeout => "timeout",
      Self::DependencyFailed => "dependency_failed",
      Self::WorkflowTimeout => "workflow_timeout",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for FailureCause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A terminal step failure, kept in the execution's error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
  pub step_id: String,
  pub cause: FailureCause,
  pub message: String,
  /// Attempts made before the failure (0 when never dispatched).
  pub attempt: u32,
  pub at: DateTime<Utc>,
}

/// The mutable half of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRun {
  pub status: StepStatus,
  pub retry_count: u32,
  pub result: Option<Value>,
  pub error: Option<String>,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// Run state of one workflow. Only the workflow's driver mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
  pub workflow_id: String,
  pub state: ExecutionState,
  pub current_step: Option<String>,
  pub completed_steps: Vec<String>,
  pub failed_steps: Vec<String>,
  pub progress_percentage: f64,
  pub start_time: DateTime<Utc>,
  pub end_time: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
  pub results: BTreeMap<String, Value>,
  pub errors: Vec<StepError>,
  pub steps: BTreeMap<String, StepRun>,
}

impl WorkflowExecution {
  /// A fresh execution in `Running` with every step pending.
  pub fn new(definition: &WorkflowDefinition) -> Self {
    let now = Utc::now();
    Self {
      workflow_id: definition.workflow_id.clone(),
      state: ExecutionState::Running,
      current_step: None,
      completed_steps: Vec::new(),
      failed_steps: Vec::new(),
      progress_percentage: 0.0,
      start_time: now,
      end_time: None,
      updated_at: now,
      results: BTreeMap::new(),
      errors: Vec::new(),
      steps: definition
        .steps
        .iter()
        .map(|s| (s.step_id.clone(), StepRun::default()))
        .collect(),
    }
  }

  pub fn step(&self, step_id: &str) -> Option<&StepRun> {
    self.steps.get(step_id)
  }

  fn status_of(&self, step_id: &str) -> Option<StepStatus> {
    self.steps.get(step_id).map(|run| run.status)
  }

  pub fn touch(&mut self) {
    self.updated_at = Utc::now();
  }

  pub fn is_terminal(&self) -> bool {
    self.state.is_terminal()
  }

  /// Pending steps whose dependencies have all completed, in definition order.
  pub fn eligible_steps(&self, definition: &WorkflowDefinition) -> Vec<String> {
    definition
      .steps
      .iter()
      .filter(|step| self.status_of(&step.step_id) == Some(StepStatus::Pending))
      .filter(|step| {
        step
          .dependencies
          .iter()
          .all(|dep| self.status_of(dep) == Some(StepStatus::Completed))
      })
      .map(|step| step.step_id.clone())
      .collect()
  }

  pub fn mark_running(&mut self, step_id: &str) {
    if let Some(run) = self.steps.get_mut(step_id) {
      run.status = StepStatus::Running;
      run.started_at = Some(Utc::now());
      run.completed_at = None;
      self.current_step = Some(step_id.to_string());
    }
  }

  pub fn mark_completed(&mut self, step_id: &str, result: Value) {
    let Some(run) = self.steps.get_mut(step_id) else {
      return;
    };
    run.status = StepStatus::Completed;
    run.completed_at = Some(Utc::now());
    run.error = None;
    run.result = Some(result.clone());

    self.results.insert(step_id.to_string(), result);
    if !self.completed_steps.iter().any(|id| id == step_id) {
      self.completed_steps.push(step_id.to_string());
    }
    self.update_progress();
  }

  /// Put a failed attempt back to pending. Returns the new retry count.
  pub fn mark_retrying(&mut self, step_id: &str, message: impl Into<String>) -> u32 {
    let Some(run) = self.steps.get_mut(step_id) else {
      return 0;
    };
    run.retry_count += 1;
    run.status = StepStatus::Pending;
    run.error = Some(message.into());
    run.retry_count
  }

  pub fn mark_failed(
    &mut self,
    step_id: &str,
    cause: FailureCause,
    message: impl Into<String>,
    attempt: u32,
  ) {
    let Some(run) = self.steps.get_mut(step_id) else {
      return;
    };
    let message = message.into();
    let now = Utc::now();
    run.status = StepStatus::Failed;
    run.completed_at = Some(now);
    run.error = Some(message.clone());

    if !self.failed_steps.iter().any(|id| id == step_id) {
      self.failed_steps.push(step_id.to_string());
    }
    self.errors.push(StepError {
      step_id: step_id.to_string(),
      cause,
      message,
      attempt,
      at: now,
    });
  }

  /// Fail every pending step downstream of a failed step. Returns the newly
  /// failed step ids.
  pub fn fail_dependents(&mut self, definition: &WorkflowDefinition) -> Vec<String> {
    let graph = definition.graph();
    let roots: Vec<String> = definition
      .steps
      .iter()
      .filter(|step| self.status_of(&step.step_id) == Some(StepStatus::Failed))
      .map(|step| step.step_id.clone())
      .collect();

    let mut failed = Vec::new();
    for root in roots {
      for step_id in graph.transitive_dependents(&root) {
        if self.status_of(&step_id) != Some(StepStatus::Pending) {
          continue;
        }
        let attempt = self.steps.get(&step_id).map_or(0, |run| run.retry_count);
        self.mark_failed(
          &step_id,
          FailureCause::DependencyFailed,
          format!("upstream step '{root}' failed"),
          attempt,
        );
        failed.push(step_id);
      }
    }
    failed
  }

  /// Fail every pending or running step. Returns the affected step ids.
  pub fn fail_unfinished(
    &mut self,
    definition: &WorkflowDefinition,
    cause: FailureCause,
    message: &str,
  ) -> Vec<String> {
    let unfinished: Vec<(String, u32)> = definition
      .steps
      .iter()
      .filter_map(|step| {
        let run = self.steps.get(&step.step_id)?;
        matches!(run.status, StepStatus::Pending | StepStatus::Running)
          .then(|| (step.step_id.clone(), run.retry_count))
      })
      .collect();

    for (step_id, attempt) in &unfinished {
      self.mark_failed(step_id, cause, message, *attempt);
    }
    unfinished.into_iter().map(|(id, _)| id).collect()
  }

  /// Settle into `Completed` or `Failed` depending on step outcomes.
  pub fn finish(&mut self) {
    self.state = if self.completed_steps.len() == self.steps.len() {
      ExecutionState::Completed
    } else {
      ExecutionState::Failed
    };
    self.close();
  }

  /// Fail all unfinished steps as cancelled and enter `Cancelled`.
  pub fn cancel(&mut self, definition: &WorkflowDefinition) {
    self.fail_unfinished(definition, FailureCause::Cancelled, "workflow cancelled");
    self.state = ExecutionState::Cancelled;
    self.close();
  }

  /// Fail all unfinished steps after the workflow deadline passed.
  pub fn time_out(&mut self, definition: &WorkflowDefinition) {
    let message = format!(
      "workflow exceeded timeout of {}s",
      definition.timeout_seconds
    );
    self.fail_unfinished(definition, FailureCause::WorkflowTimeout, &message);
    self.state = ExecutionState::Failed;
    self.close();
  }

  /// Return steps left running by an interrupted process to pending.
  pub fn reset_interrupted(&mut self) -> Vec<String> {
    let mut reset = Vec::new();
    for (step_id, run) in self.steps.iter_mut() {
      if run.status == StepStatus::Running {
        run.status = StepStatus::Pending;
        run.started_at = None;
        reset.push(step_id.clone());
      }
    }
    reset
  }

  fn close(&mut self) {
    let now = Utc::now();
    self.current_step = None;
    self.end_time = Some(now);
    self.updated_at = now;
  }

  fn update_progress(&mut self) {
    let total = self.steps.len();
    self.progress_percentage = if total == 0 {
      0.0
    } else {
      self.completed_steps.len() as f64 / total as f64 * 100.0
    };
  }
}
