use std::collections::HashMap;

use async_trait::async_trait;
use switchyard_workflow::{WorkflowDefinition, WorkflowExecution};
use tokio::sync::RwLock;

use crate::Store;
use crate::error::{Error, decode, encode};

/// In-memory store.
///
/// Records are kept encoded so reads go through the same decode path as the
/// SQLite store.
#[derive(Default)]
pub struct MemoryStore {
  definitions: RwLock<HashMap<String, String>>,
  executions: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn put_definition(&self, definition: &WorkflowDefinition) -> Result<(), Error> {
    let record = encode(&definition.workflow_id, definition)?;
    self
      .definitions
      .write()
      .await
      .insert(definition.workflow_id.clone(), record);
    Ok(())
  }

  async fn get_definition(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, Error> {
    let definitions = self.definitions.read().await;
    definitions
      .get(workflow_id)
      .map(|r| decode(workflow_id, r))
      .transpose()
  }

  async fn definition_ids(&self) -> Result<Vec<String>, Error> {
    let mut ids: Vec<String> = self.definitions.read().await.keys().cloned().collect();
    ids.sort();
    Ok(ids)
  }

  async fn delete_definition(&self, workflow_id: &str) -> Result<bool, Error> {
    Ok(self.definitions.write().await.remove(workflow_id).is_some())
  }

  async fn put_execution(&self, execution: &WorkflowExecution) -> Result<(), Error> {
    let record = encode(&execution.workflow_id, execution)?;
    self
      .executions
      .write()
      .await
      .insert(execution.workflow_id.clone(), record);
    Ok(())
  }

  async fn get_execution(&self, workflow_id: &str) -> Result<Option<WorkflowExecution>, Error> {
    let executions = self.executions.read().await;
    executions
      .get(workflow_id)
      .map(|r| decode(workflow_id, r))
      .transpose()
  }

  async fn execution_ids(&self) -> Result<Vec<String>, Error> {
    let mut ids: Vec<String> = self.executions.read().await.keys().cloned().collect();
    ids.sort();
    Ok(ids)
  }

  async fn delete_execution(&self, workflow_id: &str) -> Result<bool, Error> {
    Ok(self.executions.write().await.remove(workflow_id).is_some())
  }
}
