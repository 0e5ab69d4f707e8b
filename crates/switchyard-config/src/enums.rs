use std::fmt;

use serde::{Deserialize, Serialize};

/// Orchestration strategy a workflow was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
  SingleSpecialist,
  Sequential,
  ParallelAnalysis,
  PhasedProject,
  HierarchicalDecomposition,
  Adaptive,
  SecurityFirst,
}

impl Strategy {
  pub fn as_str(&self) -> &'static str {
    match self {
      Strategy::SingleSpecialist => "single_specialist",
      Strategy::Sequential => "sequential",
      Strategy::ParallelAnalysis => "parallel_analysis",
      Strategy::PhasedProject => "phased_project",
      Strategy::HierarchicalDecomposition => "hierarchical_decomposition",
      Strategy::Adaptive => "adaptive",
      Strategy::SecurityFirst => "security_first",
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Priority level, ordered from lowest to highest.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

impl Priority {
  /// The next level up, saturating at `Critical`.
  pub fn raised(self) -> Self {
    match self {
      Priority::Low => Priority::Medium,
      Priority::Medium => Priority::High,
      Priority::High | Priority::Critical => Priority::Critical,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Priority::Low => "low",
      Priority::Medium => "medium",
      Priority::High => "high",
      Priority::Critical => "critical",
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
