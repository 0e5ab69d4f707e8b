use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("workflow has no steps")]
  NoSteps,

  #[error("duplicate step id: {0}")]
  DuplicateStep(String),

  #[error("step '{step}' depends on unknown step '{dependency}'")]
  UnknownDependency { step: String, dependency: String },

  #[error("step '{0}' depends on itself")]
  SelfDependency(String),

  #[error("dependency cycle between steps: {}", steps.join(", "))]
  Cycle { steps: Vec<String> },

  #[error("invalid limit: {0}")]
  InvalidLimit(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown execution state: {0}")]
pub struct UnknownState(pub String);
