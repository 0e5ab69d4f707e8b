use serde::{Deserialize, Serialize};

use crate::enums::{Priority, Strategy};
use crate::step::StepDef;

/// A workflow as submitted to the engine, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub steps: Vec<StepDef>,
  pub strategy: Strategy,
  #[serde(default)]
  pub priority: Priority,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_parallel_steps: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_seconds: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_by: Option<String>,
}
