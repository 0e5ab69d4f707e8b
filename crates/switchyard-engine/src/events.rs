//! Execution events and notifiers for observability.
//!
//! Events are emitted by workflow drivers so consumers can observe progress,
//! stream to a UI, or collect metrics.

use serde::{Deserialize, Serialize};
use switchyard_workflow::FailureCause;
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// A driver began (or resumed after recovery) dispatching steps.
  WorkflowStarted { workflow_id: String },

  /// A step attempt was handed to the executor.
  StepStarted {
    workflow_id: String,
    step_id: String,
    attempt: u32,
  },

  /// A step has completed successfully.
  StepCompleted {
    workflow_id: String,
    step_id: String,
    data: serde_json::Value,
  },

  /// A step attempt failed and the step will be dispatched again.
  StepRetrying {
    workflow_id: String,
    step_id: String,
    attempt: u32,
    error: String,
  },

  /// A step has failed for good.
  StepFailed {
    workflow_id: String,
    step_id: String,
    cause: FailureCause,
    error: String,
  },

  WorkflowPaused { workflow_id: String },

  WorkflowResumed { workflow_id: String },

  WorkflowCompleted { workflow_id: String },

  WorkflowFailed { workflow_id: String, error: String },

  WorkflowCancelled { workflow_id: String },
}

/// Trait for receiving execution events.
///
/// The engine calls `notify` for each event; implementations decide what to
/// do with them. `notify` is called from driver tasks and must not block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // NOTE: unbounded so a slow consumer never stalls a driver. Volume is a
  // handful of events per step.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
