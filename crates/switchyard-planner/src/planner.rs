use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use switchyard_classifier::{Complexity, TaskAnalysisResult, TaskClassifier, TaskContext};
use switchyard_config::{EngineSettings, StepDef, Strategy, WorkflowDef};
use switchyard_registry::ToolRegistry;
use tracing::info;

use crate::strategies::{self, Draft};

/// Executor of synthesis steps that merge parallel results.
pub const COORDINATOR: &str = "coordinator";

/// Security relevance at which the security-first layout is forced.
pub const SECURITY_FIRST_RELEVANCE: f64 = 0.7;

const CREATED_BY: &str = "planner";
const NAME_CHARS: usize = 60;

/// The outcome of planning one task.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePlan {
  pub analysis: TaskAnalysisResult,
  /// Strategy the workflow was laid out with.
  pub strategy: Strategy,
  pub workflow: WorkflowDef,
}

/// Classifies task descriptions and lays them out as workflow definitions.
pub struct Planner {
  classifier: TaskClassifier,
  registry: Arc<ToolRegistry>,
  settings: EngineSettings,
  recent_performance: Option<HashMap<String, f64>>,
}

impl Planner {
  pub fn new(registry: Arc<ToolRegistry>, settings: EngineSettings) -> Self {
    Self {
      classifier: TaskClassifier::new(),
      registry,
      settings,
      recent_performance: None,
    }
  }

  /// Rank tools with caller-observed performance (tool name to 0..=1).
  pub fn with_recent_performance(mut self, recent: HashMap<String, f64>) -> Self {
    self.recent_performance = Some(recent);
    self
  }

  /// Classify `description` and build its workflow definition.
  pub fn plan(&self, description: &str, context: Option<&TaskContext>) -> RoutePlan {
    let analysis = self.classifier.analyze(description, context);

    let strategy = if analysis.security_relevance >= SECURITY_FIRST_RELEVANCE
      || analysis.complexity == Complexity::Critical
    {
      Strategy::SecurityFirst
    } else {
      analysis.recommended_approach
    };

    let draft = Draft::new(
      description,
      &analysis,
      self.settings.default_workflow_timeout_seconds,
    );
    let mut steps = match strategy {
      Strategy::SecurityFirst => strategies::security_first(&draft),
      Strategy::SingleSpecialist => strategies::single_specialist(&draft),
      Strategy::Sequential => strategies::sequential(&draft),
      Strategy::ParallelAnalysis => strategies::parallel_analysis(&draft),
      Strategy::PhasedProject => strategies::phased_project(&draft),
      Strategy::HierarchicalDecomposition => strategies::hierarchical_decomposition(&draft),
      Strategy::Adaptive if analysis.required_specialists.len() <= 1 => {
        strategies::single_specialist(&draft)
      }
      Strategy::Adaptive => strategies::parallel_analysis(&draft),
    };
    self.assign_tools(&mut steps);

    let workflow = WorkflowDef {
      name: workflow_name(strategy, description),
      description: description.to_string(),
      steps,
      strategy,
      priority: analysis.priority_level,
      max_parallel_steps: None,
      timeout_seconds: None,
      created_by: Some(CREATED_BY.to_string()),
    };

    info!(
      strategy = %strategy,
      complexity = %analysis.complexity,
      domain = %analysis.primary_domain,
      steps = workflow.steps.len(),
      "task_planned"
    );

    RoutePlan {
      analysis,
      strategy,
      workflow,
    }
  }

  /// One registry allocation per executor, shared by all its steps.
  fn assign_tools(&self, steps: &mut [StepDef]) {
    let mut allocations: HashMap<String, Vec<String>> = HashMap::new();
    for step in steps {
      let tools = allocations
        .entry(step.executor.clone())
        .or_insert_with(|| {
          self
            .registry
            .optimize(&step.executor, self.recent_performance.as_ref())
            .into_iter()
            .map(|record| record.name)
            .collect()
        });
      step.tools = tools.clone();
    }
  }
}

fn workflow_name(strategy: Strategy, description: &str) -> String {
  let summary: String = description.trim().chars().take(NAME_CHARS).collect();
  if summary.is_empty() {
    format!("{strategy}: untitled task")
  } else {
    format!("{strategy}: {summary}")
  }
}
