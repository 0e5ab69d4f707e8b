use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use switchyard_config::{EngineSettings, WorkflowDef};
use switchyard_store::Store;
use switchyard_workflow::{Defaults, ExecutionState, WorkflowDefinition, WorkflowExecution};
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::driver::{Control, Driver, Services, Snapshot};
use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::executor::Executor;
use crate::status::{RecoveryReport, WorkflowStatus};

/// A known workflow: its definition and, once started, its run.
struct Slot {
  definition: Arc<WorkflowDefinition>,
  run: Option<Run>,
}

struct Run {
  snapshot: watch::Receiver<Snapshot>,
  /// Held by the engine while no driver owns the execution.
  idle: Option<watch::Sender<Snapshot>>,
  control: Option<mpsc::Sender<Control>>,
  task: Option<JoinHandle<()>>,
}

impl Run {
  /// A run with no driver, e.g. a terminal execution loaded from the store.
  fn parked(execution: WorkflowExecution) -> Self {
    let (sender, receiver) = watch::channel(Arc::new(execution));
    Self {
      snapshot: receiver,
      idle: Some(sender),
      control: None,
      task: None,
    }
  }

  fn state(&self) -> ExecutionState {
    self.snapshot.borrow().state
  }

  fn execution(&self) -> WorkflowExecution {
    (**self.snapshot.borrow()).clone()
  }

  fn has_driver(&self) -> bool {
    self.task.as_ref().is_some_and(|task| !task.is_finished())
  }
}

/// Runs workflows and owns their lifecycle.
///
/// Construct once at process start and share by `Arc`. Call
/// [`recover`](Self::recover) before serving requests and
/// [`shutdown`](Self::shutdown) on exit.
pub struct WorkflowEngine {
  services: Services,
  settings: EngineSettings,
  defaults: Defaults,
  slots: RwLock<HashMap<String, Slot>>,
  shutdown: CancellationToken,
}

impl WorkflowEngine {
  pub fn new(store: Arc<dyn Store>, executor: Arc<dyn Executor>, settings: EngineSettings) -> Self {
    Self {
      services: Services {
        store,
        executor,
        notifier: Arc::new(NoopNotifier),
        dirty: Default::default(),
      },
      defaults: Defaults::from(&settings),
      settings,
      slots: RwLock::new(HashMap::new()),
      shutdown: CancellationToken::new(),
    }
  }

  /// Replace the default no-op notifier.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.services.notifier = notifier;
    self
  }

  pub fn settings(&self) -> &EngineSettings {
    &self.settings
  }

  /// Validate and persist a new workflow. It stays `Created` until started.
  #[instrument(
    name = "engine_create",
    skip(self, def),
    fields(workflow_name = %def.name, steps = def.steps.len())
  )]
  pub async fn create(&self, def: WorkflowDef) -> Result<String, EngineError> {
    let workflow_id = uuid::Uuid::new_v4().to_string();
    let definition = WorkflowDefinition::new(workflow_id.clone(), def, &self.defaults)
      .inspect_err(|e| debug!(error = %e, "workflow_rejected"))?;

    self.services.store.put_definition(&definition).await?;
    self.slots.write().await.insert(
      workflow_id.clone(),
      Slot {
        definition: Arc::new(definition),
        run: None,
      },
    );

    info!(workflow_id = %workflow_id, "workflow_created");
    Ok(workflow_id)
  }

  /// Begin executing a created workflow, or re-dispatch a `Waiting` one.
  ///
  /// Returns once the driver is spawned.
  #[instrument(name = "engine_start", skip(self), fields(workflow_id = %workflow_id))]
  pub async fn start(&self, workflow_id: &str) -> Result<(), EngineError> {
    let mut slots = self.slots.write().await;
    let slot = slots
      .get_mut(workflow_id)
      .ok_or_else(|| EngineError::UnknownWorkflow(workflow_id.to_string()))?;

    let execution = match &slot.run {
      None => WorkflowExecution::new(&slot.definition),
      Some(run) if !run.has_driver() && run.state() == ExecutionState::Waiting => {
        let mut execution = run.execution();
        execution.state = ExecutionState::Running;
        execution
      }
      Some(_) => return Err(EngineError::AlreadyStarted(workflow_id.to_string())),
    };

    self.launch(slot, execution).await;
    Ok(())
  }

  /// Commit the execution and hand it to a new driver task.
  async fn launch(&self, slot: &mut Slot, mut execution: WorkflowExecution) {
    let (sender, receiver) = match slot.run.take() {
      Some(Run {
        snapshot,
        idle: Some(sender),
        ..
      }) => (sender, snapshot),
      _ => watch::channel(Arc::new(execution.clone())),
    };

    self.services.commit(&mut execution, &sender).await;

    let (control_tx, control_rx) = mpsc::channel(self.settings.control_buffer_size.max(1));
    let driver = Driver::new(
      slot.definition.clone(),
      execution,
      self.services.clone(),
      sender,
      control_rx,
      self.shutdown.child_token(),
    );

    slot.run = Some(Run {
      snapshot: receiver,
      idle: None,
      control: Some(control_tx),
      task: Some(tokio::spawn(driver.run())),
    });
  }

  /// Returns false unless the workflow is running.
  pub async fn pause(&self, workflow_id: &str) -> bool {
    self.send_control(workflow_id, Control::Pause).await
  }

  /// Returns false unless the workflow is paused.
  pub async fn resume(&self, workflow_id: &str) -> bool {
    self.send_control(workflow_id, Control::Resume).await
  }

  /// Cancel a running, paused or waiting workflow.
  ///
  /// Unfinished steps are failed with cause `cancelled`. Executor calls
  /// already in flight are not interrupted; their results are discarded.
  pub async fn cancel(&self, workflow_id: &str) -> bool {
    if self.cancel_waiting(workflow_id).await {
      return true;
    }
    self.send_control(workflow_id, Control::Cancel).await
  }

  async fn send_control(
    &self,
    workflow_id: &str,
    control: fn(oneshot::Sender<bool>) -> Control,
  ) -> bool {
    let sender = {
      let slots = self.slots.read().await;
      let sender = slots
        .get(workflow_id)
        .and_then(|slot| slot.run.as_ref())
        .and_then(|run| run.control.clone());
      match sender {
        Some(sender) => sender,
        None => return false,
      }
    };

    let (reply, response) = oneshot::channel();
    if sender.send(control(reply)).await.is_err() {
      // Driver already exited
      return false;
    }
    response.await.unwrap_or(false)
  }

  /// Cancel an execution that recovery left waiting (it has no driver).
  async fn cancel_waiting(&self, workflow_id: &str) -> bool {
    let mut slots = self.slots.write().await;
    let Some(slot) = slots.get_mut(workflow_id) else {
      return false;
    };
    let definition = slot.definition.clone();
    let Some(run) = slot.run.as_ref() else {
      return false;
    };
    if run.has_driver() || run.state() != ExecutionState::Waiting {
      return false;
    }
    let Some(sender) = run.idle.as_ref() else {
      return false;
    };

    let mut execution = run.execution();
    execution.cancel(&definition);
    self.services.commit(&mut execution, sender).await;

    info!(workflow_id = %workflow_id, "workflow_cancelled");
    self
      .services
      .notifier
      .notify(ExecutionEvent::WorkflowCancelled {
        workflow_id: workflow_id.to_string(),
      });
    true
  }

  /// Merged definition and latest committed snapshot.
  pub async fn status(&self, workflow_id: &str) -> Option<WorkflowStatus> {
    let slots = self.slots.read().await;
    slots.get(workflow_id).map(Self::view)
  }

  fn view(slot: &Slot) -> WorkflowStatus {
    match &slot.run {
      Some(run) => {
        let snapshot = run.snapshot.borrow().clone();
        WorkflowStatus::new(&slot.definition, Some(&snapshot))
      }
      None => WorkflowStatus::new(&slot.definition, None),
    }
  }

  /// Statuses ordered by creation time, optionally filtered by state.
  pub async fn list(&self, state: Option<ExecutionState>) -> Vec<WorkflowStatus> {
    let slots = self.slots.read().await;
    let mut statuses: Vec<WorkflowStatus> = slots
      .values()
      .map(Self::view)
      .filter(|status| state.is_none_or(|s| status.state == s))
      .collect();
    statuses.sort_by(|a, b| {
      a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.workflow_id.cmp(&b.workflow_id))
    });
    statuses
  }

  /// Cancel if active, wait for the driver to exit, then remove both
  /// persisted records.
  #[instrument(name = "engine_delete", skip(self), fields(workflow_id = %workflow_id))]
  pub async fn delete(&self, workflow_id: &str) -> bool {
    let (control, task) = {
      let mut slots = self.slots.write().await;
      let Some(slot) = slots.get_mut(workflow_id) else {
        return false;
      };
      match slot.run.as_mut() {
        Some(run) => (run.control.take(), run.task.take()),
        None => (None, None),
      }
    };

    if let Some(control) = control {
      let (reply, response) = oneshot::channel();
      if control.send(Control::Cancel(reply)).await.is_ok() {
        let _ = response.await;
      }
    }
    if let Some(task) = task {
      if let Err(e) = task.await {
        warn!(error = %e, "driver_join_failed");
      }
    }

    self.slots.write().await.remove(workflow_id);
    self.services.dirty().remove(workflow_id);

    if let Err(e) = self.services.store.delete_execution(workflow_id).await {
      warn!(error = %e, "execution_delete_failed");
    }
    if let Err(e) = self.services.store.delete_definition(workflow_id).await {
      warn!(error = %e, "definition_delete_failed");
    }

    info!("workflow_deleted");
    true
  }

  /// Resolve once the workflow is terminal or its driver has stopped.
  ///
  /// Returns immediately for workflows without a driver (created, waiting,
  /// or loaded in a terminal state). `None` for unknown ids.
  pub async fn wait(&self, workflow_id: &str) -> Option<WorkflowStatus> {
    let receiver = {
      let slots = self.slots.read().await;
      let slot = slots.get(workflow_id)?;
      slot
        .run
        .as_ref()
        .filter(|run| run.has_driver())
        .map(|run| run.snapshot.clone())
    };

    if let Some(mut receiver) = receiver {
      loop {
        if receiver.borrow_and_update().is_terminal() {
          break;
        }
        if receiver.changed().await.is_err() {
          break;
        }
      }
    }

    self.status(workflow_id).await
  }

  /// Receiver of committed execution snapshots. `None` until started.
  pub async fn subscribe(&self, workflow_id: &str) -> Option<watch::Receiver<Arc<WorkflowExecution>>> {
    let slots = self.slots.read().await;
    slots
      .get(workflow_id)
      .and_then(|slot| slot.run.as_ref())
      .map(|run| run.snapshot.clone())
  }

  /// Load every stored workflow not already known to this engine.
  ///
  /// Interrupted executions are marked `Waiting` with their running steps
  /// reset to pending, then re-dispatched when `resume_interrupted` is set.
  /// Paused executions get a paused driver. Records that fail to decode are
  /// skipped. Execution records whose definition is gone are deleted.
  #[instrument(name = "engine_recover", skip(self))]
  pub async fn recover(&self) -> Result<RecoveryReport, EngineError> {
    let store = self.services.store.clone();
    let mut report = RecoveryReport::default();
    let ids = store.definition_ids().await?;
    let known: HashSet<String> = ids.iter().cloned().collect();

    let mut slots = self.slots.write().await;
    for workflow_id in ids {
      if slots.contains_key(&workflow_id) {
        continue;
      }

      let definition = match store.get_definition(&workflow_id).await {
        Ok(Some(definition)) => Arc::new(definition),
        Ok(None) => continue,
        Err(e @ switchyard_store::Error::Corrupt { .. }) => {
          warn!(workflow_id = %workflow_id, error = %e, "corrupt_record_skipped");
          report.skipped.push(workflow_id);
          continue;
        }
        Err(e) => return Err(e.into()),
      };

      let execution = match store.get_execution(&workflow_id).await {
        Ok(execution) => execution,
        Err(e @ switchyard_store::Error::Corrupt { .. }) => {
          warn!(workflow_id = %workflow_id, error = %e, "corrupt_record_skipped");
          report.skipped.push(workflow_id);
          continue;
        }
        Err(e) => return Err(e.into()),
      };

      let mut slot = Slot {
        definition,
        run: None,
      };
      report.loaded += 1;

      if let Some(mut execution) = execution {
        match execution.state {
          state if state.is_terminal() => {
            slot.run = Some(Run::parked(execution));
          }
          ExecutionState::Paused => {
            let reset = execution.reset_interrupted();
            debug!(workflow_id = %workflow_id, reset_steps = ?reset, "paused_workflow_loaded");
            self.launch(&mut slot, execution).await;
            report.paused.push(workflow_id.clone());
          }
          _ => {
            let reset = execution.reset_interrupted();
            execution.state = ExecutionState::Waiting;
            info!(workflow_id = %workflow_id, reset_steps = ?reset, "workflow_interrupted");

            let run = Run::parked(execution.clone());
            if let Some(sender) = run.idle.as_ref() {
              self.services.commit(&mut execution, sender).await;
            }
            slot.run = Some(run);

            if self.settings.resume_interrupted {
              execution.state = ExecutionState::Running;
              self.launch(&mut slot, execution).await;
              report.resumed.push(workflow_id.clone());
            } else {
              report.waiting.push(workflow_id.clone());
            }
          }
        }
      }

      slots.insert(workflow_id, slot);
    }

    for workflow_id in store.execution_ids().await? {
      if known.contains(&workflow_id) || slots.contains_key(&workflow_id) {
        continue;
      }
      match store.delete_execution(&workflow_id).await {
        Ok(_) => {
          warn!(workflow_id = %workflow_id, "orphaned_execution_removed");
          report.orphaned.push(workflow_id);
        }
        Err(e) => warn!(workflow_id = %workflow_id, error = %e, "orphaned_execution_delete_failed"),
      }
    }

    info!(
      loaded = report.loaded,
      resumed = report.resumed.len(),
      waiting = report.waiting.len(),
      paused = report.paused.len(),
      skipped = report.skipped.len(),
      orphaned = report.orphaned.len(),
      "recovery_completed"
    );
    Ok(report)
  }

  /// Stop every driver without touching persisted state, then flush
  /// snapshots whose last save failed.
  #[instrument(name = "engine_shutdown", skip(self))]
  pub async fn shutdown(&self) {
    self.shutdown.cancel();

    let tasks: Vec<JoinHandle<()>> = {
      let mut slots = self.slots.write().await;
      slots
        .values_mut()
        .filter_map(|slot| slot.run.as_mut())
        .filter_map(|run| {
          run.control = None;
          run.task.take()
        })
        .collect()
    };
    let stopped = tasks.len();
    for result in futures::future::join_all(tasks).await {
      if let Err(e) = result {
        warn!(error = %e, "driver_join_failed");
      }
    }

    let dirty: Vec<Snapshot> = self.services.dirty().drain().map(|(_, s)| s).collect();
    let flushed = dirty.len();
    for snapshot in dirty {
      if let Err(e) = self.services.store.put_execution(&snapshot).await {
        error!(workflow_id = %snapshot.workflow_id, error = %e, "execution_flush_failed");
        self
          .services
          .dirty()
          .insert(snapshot.workflow_id.clone(), snapshot);
      }
    }

    info!(stopped, flushed, "engine_shutdown");
  }
}
