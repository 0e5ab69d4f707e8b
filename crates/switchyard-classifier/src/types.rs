use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchyard_config::{Priority, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
  Simple,
  Moderate,
  Complex,
  Enterprise,
  Critical,
}

impl Complexity {
  pub const ALL: [Complexity; 5] = [
    Complexity::Simple,
    Complexity::Moderate,
    Complexity::Complex,
    Complexity::Enterprise,
    Complexity::Critical,
  ];

  /// Per-keyword score, also the base of the priority score.
  pub fn weight(&self) -> f64 {
    match self {
      Self::Simple => 1.0,
      Self::Moderate => 2.0,
      Self::Complex => 3.0,
      Self::Enterprise => 4.0,
      Self::Critical => 5.0,
    }
  }

  /// Effort for a single specialist, in hours.
  pub fn base_hours(&self) -> f64 {
    match self {
      Self::Simple => 2.0,
      Self::Moderate => 8.0,
      Self::Complex => 40.0,
      Self::Enterprise => 160.0,
      Self::Critical => 24.0,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Simple => "simple",
      Self::Moderate => "moderate",
      Self::Complex => "complex",
      Self::Enterprise => "enterprise",
      Self::Critical => "critical",
    }
  }
}

impl fmt::Display for Complexity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
  Security,
  Compliance,
  Architecture,
  Infrastructure,
  Performance,
  Data,
  Frontend,
  Backend,
  Testing,
  General,
}

impl Domain {
  /// Scored domains in table order. `General` is only a fallback.
  pub const SCORED: [Domain; 9] = [
    Domain::Security,
    Domain::Compliance,
    Domain::Architecture,
    Domain::Infrastructure,
    Domain::Performance,
    Domain::Data,
    Domain::Frontend,
    Domain::Backend,
    Domain::Testing,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Security => "security",
      Self::Compliance => "compliance",
      Self::Architecture => "architecture",
      Self::Infrastructure => "infrastructure",
      Self::Performance => "performance",
      Self::Data => "data",
      Self::Frontend => "frontend",
      Self::Backend => "backend",
      Self::Testing => "testing",
      Self::General => "general",
    }
  }

  /// Name of the executor that handles this domain.
  pub fn specialist(&self) -> String {
    format!("{}_specialist", self.as_str())
  }

  pub fn priority_boost(&self) -> f64 {
    match self {
      Self::Security => 1.5,
      Self::Compliance => 1.4,
      Self::Infrastructure | Self::Performance => 1.2,
      Self::Architecture | Self::Data => 1.1,
      Self::Backend | Self::General => 1.0,
      Self::Frontend | Self::Testing => 0.9,
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
  Analysis,
  Design,
  Implementation,
  Optimization,
  Troubleshooting,
  Migration,
  SecurityAudit,
  Review,
  Documentation,
}

impl TaskType {
  /// Detection order; earlier entries win ties.
  pub const ORDER: [TaskType; 9] = [
    TaskType::SecurityAudit,
    TaskType::Migration,
    TaskType::Troubleshooting,
    TaskType::Optimization,
    TaskType::Implementation,
    TaskType::Design,
    TaskType::Review,
    TaskType::Documentation,
    TaskType::Analysis,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Analysis => "analysis",
      Self::Design => "design",
      Self::Implementation => "implementation",
      Self::Optimization => "optimization",
      Self::Troubleshooting => "troubleshooting",
      Self::Migration => "migration",
      Self::SecurityAudit => "security_audit",
      Self::Review => "review",
      Self::Documentation => "documentation",
    }
  }

  /// Work whose parts can be examined independently.
  pub fn is_analytical(&self) -> bool {
    matches!(
      self,
      Self::Analysis | Self::Review | Self::SecurityAudit | Self::Troubleshooting
    )
  }

  /// Work that produces something in stages.
  pub fn is_constructive(&self) -> bool {
    matches!(self, Self::Implementation | Self::Migration | Self::Design)
  }
}

impl fmt::Display for TaskType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
  #[default]
  Low,
  Medium,
  High,
}

impl RiskLevel {
  /// Factor applied to the priority score.
  pub fn multiplier(&self) -> f64 {
    match self {
      Self::Low => 1.0,
      Self::Medium => 1.2,
      Self::High => 1.5,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
  pub security: RiskLevel,
  pub complexity: RiskLevel,
  pub resource: RiskLevel,
  pub compliance: RiskLevel,
}

impl RiskAssessment {
  pub fn levels(&self) -> [(&'static str, RiskLevel); 4] {
    [
      ("security", self.security),
      ("complexity", self.complexity),
      ("resource", self.resource),
      ("compliance", self.compliance),
    ]
  }

  /// Product of the four risk multipliers.
  pub fn multiplier(&self) -> f64 {
    self
      .levels()
      .iter()
      .map(|(_, level)| level.multiplier())
      .product()
  }
}

/// Optional signals that accompany a description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
  /// Scored together with the description.
  #[serde(default)]
  pub tags: Vec<String>,
  /// Raises the priority by one level.
  #[serde(default)]
  pub urgent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysisResult {
  pub complexity: Complexity,
  pub primary_domain: Domain,
  /// Other domains with a positive score, highest first.
  pub secondary_domains: Vec<Domain>,
  pub task_type: TaskType,
  pub confidence_score: f64,
  pub security_relevance: f64,
  /// Executor names, no duplicates.
  pub required_specialists: Vec<String>,
  pub priority_level: Priority,
  pub estimated_effort: String,
  pub estimated_hours: f64,
  pub risk_assessment: RiskAssessment,
  pub recommended_approach: Strategy,
  /// Per-level and per-domain scores for diagnostics.
  #[serde(default)]
  pub extensions: BTreeMap<String, Value>,
}
