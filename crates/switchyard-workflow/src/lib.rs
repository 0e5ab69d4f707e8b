//! Switchyard Workflow
//!
//! This crate provides the validated workflow representation for switchyard.
//! A [`WorkflowDefinition`] is the immutable, id-bearing form of a submitted
//! `WorkflowDef` that is ready for execution.
//!
//! Key differences from `switchyard-config`:
//! - Step ids are unique and every dependency names a step of the same workflow
//! - The dependency graph is acyclic (a topological order exists)
//! - Engine defaults are applied to every optional limit
//!
//! The mutable half of a run lives in [`WorkflowExecution`], which carries the
//! per-step status and the state machine transitions the engine drives.

mod definition;
mod error;
mod execution;
mod graph;

pub use definition::{Defaults, WorkflowDefinition, WorkflowStep};
pub use error::{UnknownState, WorkflowError};
pub use execution::{
  ExecutionState, FailureCause, StepError, StepRun, StepStatus, WorkflowExecution,
};
pub use graph::Graph;
