use switchyard_workflow::WorkflowError;

/// Errors returned by engine operations that create or start workflows.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// The submitted definition failed validation.
  #[error("invalid workflow: {0}")]
  Validation(#[from] WorkflowError),

  #[error("unknown workflow: {0}")]
  UnknownWorkflow(String),

  #[error("workflow already started: {0}")]
  AlreadyStarted(String),

  #[error("persistence failed: {0}")]
  Persistence(#[from] switchyard_store::Error),
}
