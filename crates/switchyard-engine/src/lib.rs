//! Switchyard Workflow Engine
//!
//! This crate runs validated workflows. Each started workflow is owned by one
//! background driver task; the [`WorkflowEngine`] talks to drivers over a
//! control channel and reads the snapshots they publish.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowEngine                         │
//! │  - create/start/pause/resume/cancel/status/list/delete      │
//! │  - recover (startup) and shutdown (teardown)                │
//! └─────────────────────────────────────────────────────────────┘
//!                 │ control (mpsc + oneshot)  ▲ snapshots (watch)
//!                 ▼                           │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Driver (one per run)                    │
//! │  - dispatches eligible steps up to max_parallel_steps       │
//! │  - retries, timeouts, failure propagation                   │
//! │  - persists every transition before publishing it           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Executor                             │
//! │  - performs one step attempt (pluggable)                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let engine = WorkflowEngine::new(store, executor, settings.engine.clone());
//! engine.recover().await?;
//!
//! let workflow_id = engine.create(definition).await?;
//! engine.start(&workflow_id).await?;
//! let status = engine.wait(&workflow_id).await;
//!
//! engine.shutdown().await;
//! ```

mod driver;
mod engine;
mod error;
mod events;
mod executor;
mod status;

pub use engine::WorkflowEngine;
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::{Executor, ExecutorError, StepFailure, StepRequest};
pub use status::{RecoveryReport, StepView, WorkflowStatus};
