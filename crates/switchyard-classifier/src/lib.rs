//! Switchyard Task Classifier
//!
//! Scores a free-text task description against weighted keyword tables and
//! produces a [`TaskAnalysisResult`]: complexity, domains, task type, risk,
//! priority, effort, the specialists to involve and the recommended
//! orchestration strategy.
//!
//! Classification is a pure function of its input. Absence of signal
//! degrades to `Simple` / `General` / `Analysis` rather than failing.

mod classifier;
mod tables;
mod text;
mod types;

pub use classifier::TaskClassifier;
pub use types::{
  Complexity, Domain, RiskAssessment, RiskLevel, TaskAnalysisResult, TaskContext, TaskType,
};
