use std::sync::Arc;

use serde::Serialize;
use switchyard_classifier::TaskContext;
use switchyard_engine::{EngineError, WorkflowEngine};
use tracing::{info, instrument};

use crate::planner::{Planner, RoutePlan};

/// A planned task registered with the engine.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedTask {
  pub workflow_id: String,
  pub plan: RoutePlan,
}

/// Plans tasks and submits them to a [`WorkflowEngine`].
pub struct Orchestrator {
  planner: Planner,
  engine: Arc<WorkflowEngine>,
}

impl Orchestrator {
  pub fn new(planner: Planner, engine: Arc<WorkflowEngine>) -> Self {
    Self { planner, engine }
  }

  pub fn engine(&self) -> &Arc<WorkflowEngine> {
    &self.engine
  }

  /// Plan without touching the engine.
  pub fn plan(&self, description: &str, context: Option<&TaskContext>) -> RoutePlan {
    self.planner.plan(description, context)
  }

  /// Plan the task and create its workflow. The workflow is not started.
  #[instrument(name = "orchestrator_route", skip_all)]
  pub async fn route(
    &self,
    description: &str,
    context: Option<&TaskContext>,
  ) -> Result<RoutedTask, EngineError> {
    let plan = self.planner.plan(description, context);
    let workflow_id = self.engine.create(plan.workflow.clone()).await?;

    info!(
      workflow_id = %workflow_id,
      strategy = %plan.strategy,
      "task_routed"
    );
    Ok(RoutedTask { workflow_id, plan })
  }

  /// [`route`](Self::route), then start the workflow.
  pub async fn route_and_start(
    &self,
    description: &str,
    context: Option<&TaskContext>,
  ) -> Result<RoutedTask, EngineError> {
    let routed = self.route(description, context).await?;
    self.engine.start(&routed.workflow_id).await?;
    Ok(routed)
  }
}
