use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
  Analysis,
  Execution,
  Integration,
  Utility,
}

impl ToolCategory {
  /// Fixed category order, used to break ties.
  pub const ALL: [ToolCategory; 4] = [
    ToolCategory::Analysis,
    ToolCategory::Execution,
    ToolCategory::Integration,
    ToolCategory::Utility,
  ];

  /// Maximum number of tools of this category allocated to one executor.
  pub fn quota(&self) -> usize {
    match self {
      Self::Analysis => 3,
      Self::Execution | Self::Integration | Self::Utility => 1,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Analysis => "analysis",
      Self::Execution => "execution",
      Self::Integration => "integration",
      Self::Utility => "utility",
    }
  }

  fn patterns(&self) -> &'static [&'static str] {
    match self {
      Self::Analysis => &[
        "analy", "scan", "audit", "inspect", "review", "assess", "detect", "evaluat", "search",
        "lint", "profil",
      ],
      Self::Execution => &[
        "exec", "run", "deploy", "build", "install", "apply", "write", "create", "migrat",
      ],
      Self::Integration => &[
        "api", "connect", "sync", "fetch", "webhook", "integrat", "import", "export", "http",
      ],
      Self::Utility => &[
        "format", "convert", "parse", "util", "helper", "cache", "config", "log", "report",
      ],
    }
  }
}

impl fmt::Display for ToolCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ToolCategory {
  type Err = UnknownCategory;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ToolCategory::ALL
      .into_iter()
      .find(|c| c.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownCategory(s.to_string()))
  }
}

/// Guess a category from substrings of the tool name.
///
/// Pattern sets are tried in category order; the first match wins.
pub fn detect_category(name: &str) -> ToolCategory {
  let name = name.to_ascii_lowercase();
  ToolCategory::ALL
    .into_iter()
    .find(|category| category.patterns().iter().any(|p| name.contains(p)))
    .unwrap_or(ToolCategory::Utility)
}
