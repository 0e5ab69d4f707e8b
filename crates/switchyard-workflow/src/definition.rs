use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchyard_config::{EngineSettings, Priority, Strategy, WorkflowDef};

use crate::error::WorkflowError;
use crate::graph::Graph;

/// Limits applied to a workflow whose definition leaves them unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
  pub max_parallel_steps: usize,
  pub workflow_timeout_seconds: u64,
  pub step_timeout_seconds: u64,
  pub max_retries: u32,
}

impl From<&EngineSettings> for Defaults {
  fn from(settings: &EngineSettings) -> Self {
    Self {
      max_parallel_steps: settings.default_max_parallel_steps,
      workflow_timeout_seconds: settings.default_workflow_timeout_seconds,
      step_timeout_seconds: settings.default_step_timeout_seconds,
      max_retries: settings.default_max_retries,
    }
  }
}

impl Default for Defaults {
  fn default() -> Self {
    Self::from(&EngineSettings::default())
  }
}

/// The static half of a step: everything the driver needs to dispatch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
  pub step_id: String,
  pub name: String,
  pub description: String,
  pub executor: String,
  pub dependencies: Vec<String>,
  pub max_retries: u32,
  pub timeout_seconds: u64,
  #[serde(default)]
  pub tools: Vec<String>,
  #[serde(default)]
  pub estimated_minutes: Option<u64>,
}

/// A validated, immutable workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
  pub workflow_id: String,
  pub name: String,
  pub description: String,
  pub steps: Vec<WorkflowStep>,
  pub strategy: Strategy,
  pub priority: Priority,
  pub max_parallel_steps: usize,
  pub timeout_seconds: u64,
  pub created_at: DateTime<Utc>,
  pub created_by: Option<String>,
}

impl WorkflowDefinition {
  /// Validate a submitted definition and fill in defaulted limits.
  ///
  /// Repeated entries in a step's dependency list are collapsed.
  pub fn new(
    workflow_id: impl Into<String>,
    def: WorkflowDef,
    defaults: &Defaults,
  ) -> Result<Self, WorkflowError> {
    if def.steps.is_empty() {
      return Err(WorkflowError::NoSteps);
    }

    let max_parallel_steps = def
      .max_parallel_steps
      .unwrap_or(defaults.max_parallel_steps);
    if max_parallel_steps == 0 {
      return Err(WorkflowError::InvalidLimit(
        "max_parallel_steps must be at least 1".to_string(),
      ));
    }

    let mut ids: HashSet<&str> = HashSet::new();
    for step in &def.steps {
      if !ids.insert(step.step_id.as_str()) {
        return Err(WorkflowError::DuplicateStep(step.step_id.clone()));
      }
    }

    for step in &def.steps {
      if step.timeout_seconds == Some(0) {
        return Err(WorkflowError::InvalidLimit(format!(
          "step '{}' timeout_seconds must be at least 1",
          step.step_id
        )));
      }
      for dependency in &step.dependencies {
        if dependency == &step.step_id {
          return Err(WorkflowError::SelfDependency(step.step_id.clone()));
        }
        if !ids.contains(dependency.as_str()) {
          return Err(WorkflowError::UnknownDependency {
            step: step.step_id.clone(),
            dependency: dependency.clone(),
          });
        }
      }
    }

    let steps: Vec<WorkflowStep> = def
      .steps
      .into_iter()
      .map(|step| {
        let mut dependencies: Vec<String> = Vec::with_capacity(step.dependencies.len());
        for dependency in step.dependencies {
          if !dependencies.contains(&dependency) {
            dependencies.push(dependency);
          }
        }

        WorkflowStep {
          step_id: step.step_id,
          name: step.name,
          description: step.description,
          executor: step.executor,
          dependencies,
          max_retries: step.max_retries.unwrap_or(defaults.max_retries),
          timeout_seconds: step
            .timeout_seconds
            .unwrap_or(defaults.step_timeout_seconds),
          tools: step.tools,
          estimated_minutes: step.estimated_minutes,
        }
      })
      .collect();

    Graph::new(&steps).topological_order()?;

    Ok(Self {
      workflow_id: workflow_id.into(),
      name: def.name,
      description: def.description,
      steps,
      strategy: def.strategy,
      priority: def.priority,
      max_parallel_steps,
      timeout_seconds: def
        .timeout_seconds
        .unwrap_or(defaults.workflow_timeout_seconds),
      created_at: Utc::now(),
      created_by: def.created_by,
    })
  }

  pub fn graph(&self) -> Graph {
    Graph::new(&self.steps)
  }

  pub fn get_step(&self, step_id: &str) -> Option<&WorkflowStep> {
    self.steps.iter().find(|s| s.step_id == step_id)
  }

  pub fn total_steps(&self) -> usize {
    self.steps.len()
  }
}
