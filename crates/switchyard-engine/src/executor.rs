use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use switchyard_workflow::{FailureCause, WorkflowStep};

/// One attempt of one step, as handed to an [`Executor`].
#[derive(Debug, Clone)]
pub struct StepRequest {
  pub workflow_id: String,
  pub step: WorkflowStep,
  /// 1-based attempt number.
  pub attempt: u32,
  /// Results of the step's dependencies, keyed by step id.
  pub upstream: HashMap<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
  #[error("no executor named '{0}'")]
  UnknownExecutor(String),

  #[error("{message}")]
  Failed { message: String },
}

impl ExecutorError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }
}

/// Performs the domain work of a step.
///
/// Implementations must be safe to call concurrently. A call may outlive the
/// workflow that issued it (after cancellation its result is discarded).
#[async_trait]
pub trait Executor: Send + Sync {
  async fn execute(&self, request: StepRequest) -> Result<Value, ExecutorError>;
}

/// Why a single attempt did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepFailure {
  #[error("{0}")]
  Execution(String),

  #[error("step timed out after {0}s")]
  Timeout(u64),
}

impl StepFailure {
  pub fn cause(&self) -> FailureCause {
    match self {
      Self::Execution(_) => FailureCause::Execution,
      Self::Timeout(_) => FailureCause::Timeout,
    }
  }
}
