//! Switchyard Config
//!
//! This crate contains the serializable input types for switchyard workflows
//! and the process-wide settings.
//!
//! Workflow definitions arrive here before they are validated and assigned an
//! id by the engine. They can be produced by:
//! - the planner (routing a task description to a strategy)
//! - JSON files or database records (as JSON blobs)
//!
//! The engine takes these types, validates the step graph, and locks them into
//! an immutable `WorkflowDefinition` from `switchyard-workflow`.

mod enums;
mod settings;
mod step;
mod workflow;

pub use enums::{Priority, Strategy};
pub use settings::{EngineSettings, RegistrySettings, Settings, SettingsError};
pub use step::StepDef;
pub use workflow::WorkflowDef;
