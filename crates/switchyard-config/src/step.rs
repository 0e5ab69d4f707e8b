use serde::{Deserialize, Serialize};

/// A step as submitted for a new workflow.
///
/// Optional limits fall back to the engine defaults when the workflow is
/// created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub step_id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  /// Name of the executor (specialist) the step is dispatched to.
  pub executor: String,
  #[serde(default)]
  pub dependencies: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_retries: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_seconds: Option<u64>,
  /// Tool names allocated to the executor for this step.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tools: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub estimated_minutes: Option<u64>,
}

impl StepDef {
  pub fn new(
    step_id: impl Into<String>,
    name: impl Into<String>,
    executor: impl Into<String>,
  ) -> Self {
    Self {
      step_id: step_id.into(),
      name: name.into(),
      description: String::new(),
      executor: executor.into(),
      dependencies: Vec::new(),
      max_retries: None,
      timeout_seconds: None,
      tools: Vec::new(),
      estimated_minutes: None,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .dependencies
      .extend(dependencies.into_iter().map(Into::into));
    self
  }

  pub fn with_max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = Some(max_retries);
    self
  }

  pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
    self.timeout_seconds = Some(timeout_seconds);
    self
  }

  pub fn with_estimated_minutes(mut self, minutes: u64) -> Self {
    self.estimated_minutes = Some(minutes);
    self
  }
}
