#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use switchyard_config::{EngineSettings, Priority, StepDef, Strategy, WorkflowDef};
use switchyard_engine::{Executor, ExecutorError, StepRequest, WorkflowEngine};
use switchyard_store::{MemoryStore, Store};

/// How the test executor treats one step.
#[derive(Debug, Clone, Default)]
pub struct Behavior {
  pub delay: Duration,
  /// Number of leading attempts that fail.
  pub failures: u32,
}

impl Behavior {
  pub fn delay_ms(ms: u64) -> Self {
    Self {
      delay: Duration::from_millis(ms),
      failures: 0,
    }
  }

  pub fn failing(failures: u32) -> Self {
    Self {
      delay: Duration::ZERO,
      failures,
    }
  }
}

/// Executor that records calls and answers deterministically.
#[derive(Default)]
pub struct TestExecutor {
  behaviors: HashMap<String, Behavior>,
  attempts: Mutex<HashMap<String, u32>>,
  started: Mutex<Vec<String>>,
  finished: Mutex<Vec<String>>,
  current: AtomicUsize,
  peak: AtomicUsize,
}

impl TestExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, step_id: &str, behavior: Behavior) -> Self {
    self.behaviors.insert(step_id.to_string(), behavior);
    self
  }

  pub fn started(&self) -> Vec<String> {
    self.started.lock().unwrap().clone()
  }

  pub fn finished(&self) -> Vec<String> {
    self.finished.lock().unwrap().clone()
  }

  pub fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Executor for TestExecutor {
  async fn execute(&self, request: StepRequest) -> Result<Value, ExecutorError> {
    let step_id = request.step.step_id.clone();
    let behavior = self.behaviors.get(&step_id).cloned().unwrap_or_default();
    self.started.lock().unwrap().push(step_id.clone());

    let running = self.current.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(running, Ordering::SeqCst);
    tokio::time::sleep(behavior.delay).await;
    self.current.fetch_sub(1, Ordering::SeqCst);

    let attempt = {
      let mut attempts = self.attempts.lock().unwrap();
      let count = attempts.entry(step_id.clone()).or_insert(0);
      *count += 1;
      *count
    };
    if attempt <= behavior.failures {
      return Err(ExecutorError::failed(format!("attempt {attempt} failed")));
    }

    self.finished.lock().unwrap().push(step_id.clone());
    let mut upstream: Vec<&String> = request.upstream.keys().collect();
    upstream.sort();
    Ok(json!({
      "step": step_id,
      "executor": request.step.executor,
      "upstream": upstream,
    }))
  }
}

pub fn settings() -> EngineSettings {
  EngineSettings {
    default_max_retries: 0,
    ..EngineSettings::default()
  }
}

pub fn engine_with(store: Arc<dyn Store>, executor: Arc<TestExecutor>) -> WorkflowEngine {
  WorkflowEngine::new(store, executor, settings())
}

pub fn engine(executor: Arc<TestExecutor>) -> (WorkflowEngine, Arc<MemoryStore>) {
  let store = Arc::new(MemoryStore::new());
  (engine_with(store.clone(), executor), store)
}

pub fn workflow(steps: Vec<StepDef>) -> WorkflowDef {
  WorkflowDef {
    name: "test workflow".to_string(),
    description: String::new(),
    steps,
    strategy: Strategy::Sequential,
    priority: Priority::Medium,
    max_parallel_steps: None,
    timeout_seconds: None,
    created_by: None,
  }
}

/// a -> {b, c} -> d
pub fn diamond() -> Vec<StepDef> {
  vec![
    StepDef::new("a", "A", "analysis_specialist"),
    StepDef::new("b", "B", "security_specialist").depends_on(["a"]),
    StepDef::new("c", "C", "data_specialist").depends_on(["a"]),
    StepDef::new("d", "D", "coordinator").depends_on(["b", "c"]),
  ]
}

/// a -> b -> c
pub fn chain() -> Vec<StepDef> {
  vec![
    StepDef::new("a", "A", "x"),
    StepDef::new("b", "B", "x").depends_on(["a"]),
    StepDef::new("c", "C", "x").depends_on(["b"]),
  ]
}
