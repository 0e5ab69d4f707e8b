//! The per-workflow driver task.
//!
//! A driver owns one [`WorkflowExecution`]. It is the only writer of that
//! record: every transition is persisted and then published on a watch
//! channel. Control requests arrive over an mpsc channel and are validated
//! against the driver's own state.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use switchyard_store::Store;
use switchyard_workflow::{
  ExecutionState, FailureCause, StepStatus, WorkflowDefinition, WorkflowExecution,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::executor::{Executor, StepFailure, StepRequest};

pub(crate) type Snapshot = Arc<WorkflowExecution>;

/// Control requests. Each carries the channel for its accept/reject reply.
pub(crate) enum Control {
  Pause(oneshot::Sender<bool>),
  Resume(oneshot::Sender<bool>),
  Cancel(oneshot::Sender<bool>),
}

/// Services shared by the engine and all drivers.
#[derive(Clone)]
pub(crate) struct Services {
  pub store: Arc<dyn Store>,
  pub executor: Arc<dyn Executor>,
  pub notifier: Arc<dyn ExecutionNotifier>,
  /// Latest snapshot of every workflow whose last save failed.
  pub dirty: Arc<Mutex<HashMap<String, Snapshot>>>,
}

impl Services {
  pub fn dirty(&self) -> MutexGuard<'_, HashMap<String, Snapshot>> {
    self.dirty.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Persist the full record, then publish it as the new snapshot.
  ///
  /// A failed save is logged and remembered; the in-memory snapshot is
  /// published regardless.
  pub async fn commit(&self, execution: &mut WorkflowExecution, snapshot: &watch::Sender<Snapshot>) {
    execution.touch();
    let record = Arc::new(execution.clone());

    match self.store.put_execution(&record).await {
      Ok(()) => {
        self.dirty().remove(&record.workflow_id);
      }
      Err(e) => {
        warn!(
          workflow_id = %record.workflow_id,
          state = %record.state,
          error = %e,
          "execution_persist_failed"
        );
        self
          .dirty()
          .insert(record.workflow_id.clone(), record.clone());
      }
    }

    snapshot.send_replace(record);
  }
}

type StepOutcome = (String, u32, Result<Value, StepFailure>);

enum Flow {
  Continue,
  Stop,
}

pub(crate) struct Driver {
  definition: Arc<WorkflowDefinition>,
  execution: WorkflowExecution,
  services: Services,
  snapshot: watch::Sender<Snapshot>,
  control: mpsc::Receiver<Control>,
  shutdown: CancellationToken,
  in_flight: JoinSet<StepOutcome>,
}

impl Driver {
  pub fn new(
    definition: Arc<WorkflowDefinition>,
    execution: WorkflowExecution,
    services: Services,
    snapshot: watch::Sender<Snapshot>,
    control: mpsc::Receiver<Control>,
    shutdown: CancellationToken,
  ) -> Self {
    Self {
      definition,
      execution,
      services,
      snapshot,
      control,
      shutdown,
      in_flight: JoinSet::new(),
    }
  }

  fn workflow_id(&self) -> &str {
    &self.definition.workflow_id
  }

  fn notify(&self, event: ExecutionEvent) {
    self.services.notifier.notify(event);
  }

  fn is_paused(&self) -> bool {
    self.execution.state == ExecutionState::Paused
  }

  /// Wall-clock deadline measured from the execution's start time.
  fn deadline(&self) -> Instant {
    let elapsed = (chrono::Utc::now() - self.execution.start_time)
      .to_std()
      .unwrap_or(Duration::ZERO);
    let remaining = Duration::from_secs(self.definition.timeout_seconds).saturating_sub(elapsed);

    let now = Instant::now();
    now
      .checked_add(remaining)
      .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
  }

  #[instrument(
    name = "workflow_driver",
    skip(self),
    fields(workflow_id = %self.definition.workflow_id)
  )]
  pub async fn run(mut self) {
    if !self.is_paused() {
      info!(
        workflow_name = %self.definition.name,
        total_steps = self.definition.total_steps(),
        max_parallel_steps = self.definition.max_parallel_steps,
        "workflow_started"
      );
      self.notify(ExecutionEvent::WorkflowStarted {
        workflow_id: self.workflow_id().to_string(),
      });
    }

    let deadline = tokio::time::sleep_until(self.deadline());
    tokio::pin!(deadline);

    loop {
      if !self.is_paused() {
        self.dispatch().await;

        if self.in_flight.is_empty() {
          self.finish().await;
          break;
        }
      }

      let flow = tokio::select! {
        biased;

        _ = self.shutdown.cancelled() => {
          info!(in_flight = self.in_flight.len(), "driver_stopped");
          Flow::Stop
        }
        Some(control) = self.control.recv() => self.handle_control(control).await,
        Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
          self.handle_outcome(joined).await;
          Flow::Continue
        }
        _ = &mut deadline => {
          self.time_out().await;
          Flow::Stop
        }
      };

      if let Flow::Stop = flow {
        break;
      }
    }
  }

  /// Hand eligible steps to the executor until the parallelism limit.
  async fn dispatch(&mut self) {
    let capacity = self
      .definition
      .max_parallel_steps
      .saturating_sub(self.in_flight.len());
    if capacity == 0 {
      return;
    }

    let ready = self.execution.eligible_steps(&self.definition);
    if ready.is_empty() {
      return;
    }

    for step_id in ready.into_iter().take(capacity) {
      let Some(step) = self.definition.get_step(&step_id).cloned() else {
        continue;
      };
      let attempt = self
        .execution
        .step(&step_id)
        .map_or(1, |run| run.retry_count + 1);

      let upstream: HashMap<String, Value> = step
        .dependencies
        .iter()
        .filter_map(|dep| {
          self
            .execution
            .results
            .get(dep)
            .map(|v| (dep.clone(), v.clone()))
        })
        .collect();

      self.execution.mark_running(&step_id);

      info!(step_id = %step_id, executor = %step.executor, attempt, "step_started");
      self.notify(ExecutionEvent::StepStarted {
        workflow_id: self.workflow_id().to_string(),
        step_id: step_id.clone(),
        attempt,
      });

      let timeout_seconds = step.timeout_seconds;
      let request = StepRequest {
        workflow_id: self.workflow_id().to_string(),
        step,
        attempt,
        upstream,
      };
      let executor = self.services.executor.clone();

      self.in_flight.spawn(async move {
        let call = AssertUnwindSafe(executor.execute(request)).catch_unwind();
        let outcome = match tokio::time::timeout(Duration::from_secs(timeout_seconds), call).await {
          Ok(Ok(Ok(value))) => Ok(value),
          Ok(Ok(Err(e))) => Err(StepFailure::Execution(e.to_string())),
          Ok(Err(_)) => Err(StepFailure::Execution("executor panicked".to_string())),
          Err(_) => Err(StepFailure::Timeout(timeout_seconds)),
        };
        (step_id, attempt, outcome)
      });
    }

    self.commit().await;
  }

  async fn handle_outcome(&mut self, joined: Result<StepOutcome, JoinError>) {
    let (step_id, attempt, outcome) = match joined {
      Ok(outcome) => outcome,
      Err(e) => {
        error!(error = %e, "step_task_join_failed");
        return;
      }
    };

    let Some(run) = self.execution.step(&step_id) else {
      return;
    };
    if run.status != StepStatus::Running {
      debug!(step_id = %step_id, "stale_step_result_discarded");
      return;
    }
    let retry_count = run.retry_count;

    match outcome {
      Ok(data) => {
        info!(step_id = %step_id, attempt, "step_completed");
        self.execution.mark_completed(&step_id, data.clone());
        self.notify(ExecutionEvent::StepCompleted {
          workflow_id: self.workflow_id().to_string(),
          step_id,
          data,
        });
      }
      Err(failure) => {
        let max_retries = self
          .definition
          .get_step(&step_id)
          .map_or(0, |step| step.max_retries);

        if retry_count < max_retries {
          warn!(step_id = %step_id, attempt, error = %failure, "step_retrying");
          self.execution.mark_retrying(&step_id, failure.to_string());
          self.notify(ExecutionEvent::StepRetrying {
            workflow_id: self.workflow_id().to_string(),
            step_id,
            attempt,
            error: failure.to_string(),
          });
        } else {
          error!(step_id = %step_id, attempt, error = %failure, "step_failed");
          self
            .execution
            .mark_failed(&step_id, failure.cause(), failure.to_string(), attempt);
          self.notify(ExecutionEvent::StepFailed {
            workflow_id: self.workflow_id().to_string(),
            step_id: step_id.clone(),
            cause: failure.cause(),
            error: failure.to_string(),
          });
          self.fail_dependents();
        }
      }
    }

    self.commit().await;
  }

  fn fail_dependents(&mut self) {
    for step_id in self.execution.fail_dependents(&self.definition) {
      let error = self
        .execution
        .step(&step_id)
        .and_then(|run| run.error.clone())
        .unwrap_or_default();
      warn!(step_id = %step_id, error = %error, "step_skipped");
      self.notify(ExecutionEvent::StepFailed {
        workflow_id: self.workflow_id().to_string(),
        step_id,
        cause: FailureCause::DependencyFailed,
        error,
      });
    }
  }

  async fn handle_control(&mut self, control: Control) -> Flow {
    match control {
      Control::Pause(reply) => {
        let accepted = self.execution.state == ExecutionState::Running;
        if accepted {
          self.execution.state = ExecutionState::Paused;
          self.commit().await;
          info!(in_flight = self.in_flight.len(), "workflow_paused");
          self.notify(ExecutionEvent::WorkflowPaused {
            workflow_id: self.workflow_id().to_string(),
          });
        }
        let _ = reply.send(accepted);
        Flow::Continue
      }
      Control::Resume(reply) => {
        let accepted = self.execution.state == ExecutionState::Paused;
        if accepted {
          self.execution.state = ExecutionState::Running;
          self.commit().await;
          info!("workflow_resumed");
          self.notify(ExecutionEvent::WorkflowResumed {
            workflow_id: self.workflow_id().to_string(),
          });
        }
        let _ = reply.send(accepted);
        Flow::Continue
      }
      Control::Cancel(reply) => {
        let accepted = matches!(
          self.execution.state,
          ExecutionState::Running | ExecutionState::Paused
        );
        if !accepted {
          let _ = reply.send(false);
          return Flow::Continue;
        }

        // In-flight calls run to completion on their own; results are dropped.
        let detached = self.in_flight.len();
        self.in_flight.detach_all();
        self.execution.cancel(&self.definition);
        self.commit().await;

        info!(detached, "workflow_cancelled");
        self.notify(ExecutionEvent::WorkflowCancelled {
          workflow_id: self.workflow_id().to_string(),
        });
        let _ = reply.send(true);
        Flow::Stop
      }
    }
  }

  async fn time_out(&mut self) {
    self.in_flight.detach_all();
    self.execution.time_out(&self.definition);
    self.commit().await;

    let error = format!(
      "workflow exceeded timeout of {}s",
      self.definition.timeout_seconds
    );
    error!(error = %error, "workflow_failed");
    self.notify(ExecutionEvent::WorkflowFailed {
      workflow_id: self.workflow_id().to_string(),
      error,
    });
  }

  async fn finish(&mut self) {
    self.execution.finish();
    self.commit().await;

    if self.execution.state == ExecutionState::Completed {
      info!(progress = self.execution.progress_percentage, "workflow_completed");
      self.notify(ExecutionEvent::WorkflowCompleted {
        workflow_id: self.workflow_id().to_string(),
      });
    } else {
      let error = format!(
        "{} of {} steps failed",
        self.execution.failed_steps.len(),
        self.definition.total_steps()
      );
      error!(failed_steps = ?self.execution.failed_steps, error = %error, "workflow_failed");
      self.notify(ExecutionEvent::WorkflowFailed {
        workflow_id: self.workflow_id().to_string(),
        error,
      });
    }
  }

  async fn commit(&mut self) {
    self.services.commit(&mut self.execution, &self.snapshot).await;
  }
}
