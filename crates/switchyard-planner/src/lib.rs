//! Switchyard Planner
//!
//! Turns a free-text task description into a workflow definition:
//!
//! 1. the [`TaskClassifier`](switchyard_classifier::TaskClassifier) analyzes
//!    the description;
//! 2. a strategy is chosen (security-first overrides the recommended approach
//!    for security-relevant or critical tasks);
//! 3. the strategy's builder lays out the steps and their dependencies;
//! 4. every step receives the tools allocated to its executor by the
//!    [`ToolRegistry`](switchyard_registry::ToolRegistry).
//!
//! [`Planner`] is the pure planning half. [`Orchestrator`] hands the result to
//! a [`WorkflowEngine`](switchyard_engine::WorkflowEngine).

mod orchestrator;
mod planner;
mod strategies;

pub use orchestrator::{Orchestrator, RoutedTask};
pub use planner::{COORDINATOR, Planner, RoutePlan, SECURITY_FIRST_RELEVANCE};
