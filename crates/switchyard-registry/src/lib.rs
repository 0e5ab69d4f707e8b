//! Switchyard Tool Registry
//!
//! Tracks the tools (capabilities) executors may use, together with running
//! usage statistics, and allocates a bounded, category-balanced set of tools
//! to an executor.
//!
//! Allocation uses a fixed per-category quota (3 analysis, 1 execution,
//! 1 integration, 1 utility). [`ToolRegistry::optimize`] additionally ranks
//! candidates by blending recent performance with the long-run success rate.

mod category;
mod registry;

pub use category::{ToolCategory, UnknownCategory, detect_category};
pub use registry::{Registration, ToolRecord, ToolRegistry};
