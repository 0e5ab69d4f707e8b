use std::collections::{HashMap, HashSet, VecDeque};

use crate::definition::WorkflowStep;
use crate::error::WorkflowError;

/// Dependency graph of a workflow's steps.
///
/// Edges point from a dependency to its dependent. Step order is the
/// definition order, which keeps traversal deterministic.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Step ids in definition order.
  order: Vec<String>,
  /// Adjacency list: step_id -> list of dependent step_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: step_id -> list of dependency step_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from validated steps.
  pub fn new(steps: &[WorkflowStep]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for step in steps {
      adjacency.entry(step.step_id.clone()).or_default();
      reverse_adjacency.entry(step.step_id.clone()).or_default();
    }

    for step in steps {
      for dependency in &step.dependencies {
        adjacency
          .entry(dependency.clone())
          .or_default()
          .push(step.step_id.clone());
        reverse_adjacency
          .entry(step.step_id.clone())
          .or_default()
          .push(dependency.clone());
      }
    }

    Self {
      order: steps.iter().map(|s| s.step_id.clone()).collect(),
      adjacency,
      reverse_adjacency,
    }
  }

  /// Steps that depend directly on `step_id`.
  pub fn downstream(&self, step_id: &str) -> &[String] {
    self
      .adjacency
      .get(step_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Direct dependencies of `step_id`.
  pub fn upstream(&self, step_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(step_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Every step reachable downstream of `step_id`, excluding itself.
  pub fn transitive_dependents(&self, step_id: &str) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([step_id]);

    while let Some(current) = queue.pop_front() {
      for next in self.downstream(current) {
        if seen.insert(next.as_str()) {
          queue.push_back(next.as_str());
        }
      }
    }

    self
      .order
      .iter()
      .filter(|id| seen.contains(id.as_str()))
      .cloned()
      .collect()
  }

  /// Kahn's algorithm. Ready steps are taken in definition order.
  ///
  /// Returns [`WorkflowError::Cycle`] naming every step that could not be
  /// ordered.
  pub fn topological_order(&self) -> Result<Vec<String>, WorkflowError> {
    let mut in_degree: HashMap<&str, usize> = self
      .order
      .iter()
      .map(|id| (id.as_str(), self.upstream(id).len()))
      .collect();

    let mut ready: VecDeque<&str> = self
      .order
      .iter()
      .filter(|id| in_degree.get(id.as_str()) == Some(&0))
      .map(|id| id.as_str())
      .collect();

    let mut sorted = Vec::with_capacity(self.order.len());
    while let Some(id) = ready.pop_front() {
      sorted.push(id.to_string());
      for next in self.downstream(id) {
        if let Some(degree) = in_degree.get_mut(next.as_str()) {
          *degree -= 1;
          if *degree == 0 {
            ready.push_back(next.as_str());
          }
        }
      }
    }

    if sorted.len() == self.order.len() {
      Ok(sorted)
    } else {
      let steps = self
        .order
        .iter()
        .filter(|id| !sorted.contains(id))
        .cloned()
        .collect();
      Err(WorkflowError::Cycle { steps })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn step(id: &str, deps: &[&str]) -> WorkflowStep {
    WorkflowStep {
      step_id: id.to_string(),
      name: id.to_string(),
      description: String::new(),
      executor: "general_specialist".to_string(),
      dependencies: deps.iter().map(|d| d.to_string()).collect(),
      max_retries: 0,
      timeout_seconds: 10,
      tools: Vec::new(),
      estimated_minutes: None,
    }
  }

  fn diamond() -> Vec<WorkflowStep> {
    vec![
      step("a", &[]),
      step("b", &["a"]),
      step("c", &["a"]),
      step("d", &["b", "c"]),
    ]
  }

  #[test]
  fn test_diamond_structure() {
    let graph = Graph::new(&diamond());

    assert_eq!(graph.downstream("a"), ["b".to_string(), "c".to_string()]);
    assert_eq!(graph.upstream("d"), ["b".to_string(), "c".to_string()]);
    assert!(graph.upstream("a").is_empty());
    assert!(graph.upstream("missing").is_empty());
  }

  #[test]
  fn test_topological_order_follows_definition_order() {
    let graph = Graph::new(&diamond());
    assert_eq!(graph.topological_order().unwrap(), vec!["a", "b", "c", "d"]);
  }

  #[test]
  fn test_topological_order_reports_cycle_members() {
    let steps = vec![
      step("a", &[]),
      step("b", &["a", "d"]),
      step("c", &["b"]),
      step("d", &["c"]),
    ];
    let err = Graph::new(&steps).topological_order().unwrap_err();
    assert_eq!(
      err,
      WorkflowError::Cycle {
        steps: vec!["b".to_string(), "c".to_string(), "d".to_string()]
      }
    );
  }

  #[test]
  fn test_transitive_dependents() {
    let graph = Graph::new(&diamond());
    assert_eq!(graph.transitive_dependents("a"), vec!["b", "c", "d"]);
    assert_eq!(graph.transitive_dependents("b"), vec!["d"]);
    assert!(graph.transitive_dependents("d").is_empty());
  }
}
