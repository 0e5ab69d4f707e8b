use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchyard_config::RegistrySettings;
use tracing::{debug, info, warn};

use crate::category::{ToolCategory, detect_category};

/// A registered tool and its running usage statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
  pub name: String,
  pub category: ToolCategory,
  pub description: Option<String>,
  pub usage_count: u64,
  pub last_used: Option<DateTime<Utc>>,
  /// Mean of all recorded outcomes. 1.0 before the first use.
  pub success_rate: f64,
  /// Mean call duration in seconds.
  pub avg_execution_time: f64,
  pub registered_at: DateTime<Utc>,
  /// Registration order. Re-registration keeps the original value.
  pub sequence: u64,
}

/// Input for [`ToolRegistry::register_with`].
#[derive(Debug, Clone, Default)]
pub struct Registration {
  pub name: String,
  /// Detected from the name when absent.
  pub category: Option<ToolCategory>,
  pub description: Option<String>,
  /// Clear usage statistics of an existing record.
  pub reset_stats: bool,
}

impl Registration {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn category(mut self, category: ToolCategory) -> Self {
    self.category = Some(category);
    self
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn reset_stats(mut self) -> Self {
    self.reset_stats = true;
    self
  }
}

#[derive(Default)]
struct Tools {
  records: HashMap<String, ToolRecord>,
  next_sequence: u64,
}

/// Registry of tools available to executors.
///
/// All mutation happens under one write lock, so concurrent
/// [`record_usage`](Self::record_usage) calls never lose updates.
pub struct ToolRegistry {
  tools: RwLock<Tools>,
  max_tools: usize,
  recent_weight: f64,
}

impl Default for ToolRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl ToolRegistry {
  pub fn new() -> Self {
    Self::with_settings(&RegistrySettings::default())
  }

  pub fn with_settings(settings: &RegistrySettings) -> Self {
    Self {
      tools: RwLock::new(Tools::default()),
      max_tools: settings.max_tools_per_agent,
      recent_weight: settings.recent_performance_weight.clamp(0.0, 1.0),
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, Tools> {
    self.tools.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, Tools> {
    self.tools.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register a tool, detecting the category from its name when omitted.
  ///
  /// Re-registering a name overwrites its metadata and keeps its statistics.
  pub fn register(&self, name: impl Into<String>, category: Option<ToolCategory>) -> ToolRecord {
    let mut registration = Registration::new(name);
    registration.category = category;
    self.register_with(registration)
  }

  pub fn register_with(&self, registration: Registration) -> ToolRecord {
    let category = registration
      .category
      .unwrap_or_else(|| detect_category(&registration.name));

    let mut tools = self.write();
    let sequence = tools.next_sequence;
    let record = match tools.records.get_mut(&registration.name) {
      Some(existing) => {
        existing.category = category;
        existing.description = registration.description;
        if registration.reset_stats {
          existing.usage_count = 0;
          existing.last_used = None;
          existing.success_rate = 1.0;
          existing.avg_execution_time = 0.0;
        }
        existing.clone()
      }
      None => {
        let record = ToolRecord {
          name: registration.name.clone(),
          category,
          description: registration.description,
          usage_count: 0,
          last_used: None,
          success_rate: 1.0,
          avg_execution_time: 0.0,
          registered_at: Utc::now(),
          sequence,
        };
        tools.next_sequence += 1;
        tools.records.insert(registration.name, record.clone());
        record
      }
    };

    debug!(tool = %record.name, category = %record.category, "tool_registered");
    record
  }

  /// Fold one call into the tool's running statistics.
  ///
  /// Returns the updated record, or `None` for an unknown tool.
  pub fn record_usage(&self, name: &str, success: bool, duration: Duration) -> Option<ToolRecord> {
    let mut tools = self.write();
    let Some(record) = tools.records.get_mut(name) else {
      warn!(tool = %name, "usage_for_unknown_tool");
      return None;
    };

    record.usage_count += 1;
    record.last_used = Some(Utc::now());
    let n = record.usage_count as f64;
    let outcome = if success { 1.0 } else { 0.0 };
    record.success_rate += (outcome - record.success_rate) / n;
    record.avg_execution_time += (duration.as_secs_f64() - record.avg_execution_time) / n;

    Some(record.clone())
  }

  pub fn get(&self, name: &str) -> Option<ToolRecord> {
    self.read().records.get(name).cloned()
  }

  /// Tools of one category in registration order.
  pub fn get_by_category(&self, category: ToolCategory) -> Vec<ToolRecord> {
    let mut records: Vec<ToolRecord> = self
      .read()
      .records
      .values()
      .filter(|r| r.category == category)
      .cloned()
      .collect();
    records.sort_by_key(|r| r.sequence);
    records
  }

  /// All tools in registration order.
  pub fn list(&self) -> Vec<ToolRecord> {
    let mut records: Vec<ToolRecord> = self.read().records.values().cloned().collect();
    records.sort_by_key(|r| r.sequence);
    records
  }

  pub fn len(&self) -> usize {
    self.read().records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Default allocation size from the registry settings.
  pub fn max_tools(&self) -> usize {
    self.max_tools
  }

  /// Category-balanced allocation in registration order.
  pub fn allocate_for_agent(&self, agent_name: &str, max_tools: usize) -> Vec<ToolRecord> {
    let allocation = self.allocate(max_tools, |candidates| candidates);
    info!(
      agent = %agent_name,
      tools = ?allocation.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
      "tools_allocated"
    );
    allocation
  }

  /// Allocation ranked by `w * recent + (1 - w) * success_rate`.
  ///
  /// Tools missing from `recent_performance` are ranked by success rate
  /// alone. Without a map this is [`allocate_for_agent`](Self::allocate_for_agent)
  /// with the configured maximum.
  pub fn optimize(
    &self,
    agent_name: &str,
    recent_performance: Option<&HashMap<String, f64>>,
  ) -> Vec<ToolRecord> {
    let Some(recent) = recent_performance else {
      return self.allocate_for_agent(agent_name, self.max_tools);
    };

    let weight = self.recent_weight;
    let score = |record: &ToolRecord| match recent.get(&record.name) {
      Some(value) => weight * value.clamp(0.0, 1.0) + (1.0 - weight) * record.success_rate,
      None => record.success_rate,
    };

    let allocation = self.allocate(self.max_tools, |mut candidates| {
      // Stable sort keeps registration order among equal scores
      candidates.sort_by(|a, b| score(b).total_cmp(&score(a)));
      candidates
    });

    info!(
      agent = %agent_name,
      tools = ?allocation.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
      "tools_optimized"
    );
    allocation
  }

  /// Visit categories by descending registered count (ties in category
  /// order), take up to each quota from the ranked candidates, then trim.
  fn allocate<F>(&self, max_tools: usize, mut rank: F) -> Vec<ToolRecord>
  where
    F: FnMut(Vec<ToolRecord>) -> Vec<ToolRecord>,
  {
    let mut by_category: Vec<(ToolCategory, Vec<ToolRecord>)> = ToolCategory::ALL
      .into_iter()
      .map(|category| (category, self.get_by_category(category)))
      .collect();
    // Stable sort keeps the fixed category order among equal counts
    by_category.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut allocation: Vec<ToolRecord> = by_category
      .into_iter()
      .flat_map(|(category, candidates)| {
        rank(candidates)
          .into_iter()
          .take(category.quota())
          .collect::<Vec<_>>()
      })
      .collect();
    allocation.truncate(max_tools);
    allocation
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;

  fn registry_with(tools: &[(&str, ToolCategory)]) -> ToolRegistry {
    let registry = ToolRegistry::new();
    for (name, category) in tools {
      registry.register(*name, Some(*category));
    }
    registry
  }

  fn names(records: &[ToolRecord]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
  }

  #[test]
  fn test_register_detects_category() {
    let registry = ToolRegistry::new();
    let record = registry.register("dependency_scanner", None);

    assert_eq!(record.category, ToolCategory::Analysis);
    assert_eq!(record.usage_count, 0);
    assert_eq!(record.success_rate, 1.0);
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn test_reregister_keeps_stats_unless_reset() {
    let registry = ToolRegistry::new();
    registry.register("scanner", None);
    registry.record_usage("scanner", false, Duration::from_secs(2));

    let record = registry.register_with(
      Registration::new("scanner")
        .category(ToolCategory::Utility)
        .description("renamed"),
    );
    assert_eq!(record.category, ToolCategory::Utility);
    assert_eq!(record.description.as_deref(), Some("renamed"));
    assert_eq!(record.usage_count, 1);
    assert_eq!(record.sequence, 0);

    let record = registry.register_with(Registration::new("scanner").reset_stats());
    assert_eq!(record.usage_count, 0);
    assert_eq!(record.success_rate, 1.0);
    assert!(record.last_used.is_none());
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn test_record_usage_running_means() {
    let registry = ToolRegistry::new();
    registry.register("scanner", None);

    registry.record_usage("scanner", true, Duration::from_secs(1));
    registry.record_usage("scanner", false, Duration::from_secs(2));
    let record = registry
      .record_usage("scanner", true, Duration::from_secs(6))
      .unwrap();

    assert_eq!(record.usage_count, 3);
    assert!((record.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((record.avg_execution_time - 3.0).abs() < 1e-9);
    assert!(record.last_used.is_some());
  }

  #[test]
  fn test_record_usage_unknown_tool() {
    let registry = ToolRegistry::new();
    assert!(
      registry
        .record_usage("ghost", true, Duration::ZERO)
        .is_none()
    );
  }

  #[test]
  fn test_concurrent_usage_is_not_lost() {
    let registry = Arc::new(ToolRegistry::new());
    registry.register("scanner", None);

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let registry = registry.clone();
        std::thread::spawn(move || {
          for _ in 0..100 {
            registry.record_usage("scanner", true, Duration::from_millis(5));
          }
        })
      })
      .collect();
    for handle in handles {
      handle.join().unwrap();
    }

    let record = registry.get("scanner").unwrap();
    assert_eq!(record.usage_count, 800);
    assert_eq!(record.success_rate, 1.0);
  }

  #[test]
  fn test_get_by_category_in_registration_order() {
    let registry = registry_with(&[
      ("b_scan", ToolCategory::Analysis),
      ("deploy", ToolCategory::Execution),
      ("a_scan", ToolCategory::Analysis),
    ]);
    assert_eq!(
      names(&registry.get_by_category(ToolCategory::Analysis)),
      vec!["b_scan", "a_scan"]
    );
  }

  #[test]
  fn test_allocation_respects_quotas() {
    let registry = registry_with(&[
      ("an1", ToolCategory::Analysis),
      ("an2", ToolCategory::Analysis),
      ("an3", ToolCategory::Analysis),
      ("an4", ToolCategory::Analysis),
      ("ex1", ToolCategory::Execution),
      ("ex2", ToolCategory::Execution),
      ("in1", ToolCategory::Integration),
      ("ut1", ToolCategory::Utility),
    ]);

    let allocation = registry.allocate_for_agent("security_specialist", 6);
    assert_eq!(
      names(&allocation),
      vec!["an1", "an2", "an3", "ex1", "in1", "ut1"]
    );
  }

  #[test]
  fn test_allocation_visits_largest_category_first() {
    let registry = registry_with(&[
      ("an1", ToolCategory::Analysis),
      ("ut1", ToolCategory::Utility),
      ("ut2", ToolCategory::Utility),
      ("ex1", ToolCategory::Execution),
    ]);

    // Utility has the most tools; analysis and execution tie and keep order
    let allocation = registry.allocate_for_agent("agent", 2);
    assert_eq!(names(&allocation), vec!["ut1", "an1"]);
  }

  #[test]
  fn test_allocation_never_pads_or_exceeds_max() {
    let registry = registry_with(&[
      ("an1", ToolCategory::Analysis),
      ("an2", ToolCategory::Analysis),
      ("an3", ToolCategory::Analysis),
      ("an4", ToolCategory::Analysis),
      ("an5", ToolCategory::Analysis),
    ]);

    let allocation = registry.allocate_for_agent("agent", 6);
    assert_eq!(names(&allocation), vec!["an1", "an2", "an3"]);
    assert!(registry.allocate_for_agent("agent", 1).len() <= 1);
    assert!(ToolRegistry::new().allocate_for_agent("agent", 6).is_empty());
  }

  #[test]
  fn test_optimize_blends_recent_performance() {
    let registry = registry_with(&[
      ("an1", ToolCategory::Analysis),
      ("an2", ToolCategory::Analysis),
      ("an3", ToolCategory::Analysis),
      ("an4", ToolCategory::Analysis),
    ]);
    // an1: 0.0 success rate
    registry.record_usage("an1", false, Duration::ZERO);
    let recent = HashMap::from([
      ("an2".to_string(), 0.0),
      ("an4".to_string(), 0.9),
    ]);

    let allocation = registry.optimize("agent", Some(&recent));
    // an3 = 1.0 (no recent), an4 = 0.97, an2 = 0.7, an1 = 0.0
    assert_eq!(names(&allocation), vec!["an3", "an4", "an2"]);
  }

  #[test]
  fn test_optimize_without_map_matches_allocation() {
    let registry = registry_with(&[
      ("an1", ToolCategory::Analysis),
      ("ex1", ToolCategory::Execution),
      ("ut1", ToolCategory::Utility),
    ]);
    assert_eq!(
      registry.optimize("agent", None),
      registry.allocate_for_agent("agent", 6)
    );
  }

  #[test]
  fn test_record_serializes() {
    let registry = ToolRegistry::new();
    let record = registry.register("api_connector", None);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["category"], "integration");
  }
}
