//! Switchyard Store
//!
//! This crate provides the storage trait and implementations for workflow
//! definitions and executions. Records are keyed by workflow id and stored as
//! whole JSON documents, so every write replaces the full record.
//!
//! The [`Store`] trait defines operations for:
//! - Upserting, loading and deleting definitions
//! - Upserting, loading and deleting executions
//! - Enumerating stored workflow ids
//!
//! Implementations: [`SqliteStore`] (durable) and [`MemoryStore`].

mod error;
mod memory;
mod sqlite;

use async_trait::async_trait;
use switchyard_workflow::{WorkflowDefinition, WorkflowExecution};

pub use error::Error;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage for workflow definitions and executions.
///
/// A record that exists but cannot be decoded is reported as
/// [`Error::Corrupt`] rather than `None`.
#[async_trait]
pub trait Store: Send + Sync {
  async fn put_definition(&self, definition: &WorkflowDefinition) -> Result<(), Error>;

  async fn get_definition(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, Error>;

  /// Ids of all stored definitions.
  async fn definition_ids(&self) -> Result<Vec<String>, Error>;

  /// Returns false when no definition was stored under the id.
  async fn delete_definition(&self, workflow_id: &str) -> Result<bool, Error>;

  async fn put_execution(&self, execution: &WorkflowExecution) -> Result<(), Error>;

  async fn get_execution(&self, workflow_id: &str) -> Result<Option<WorkflowExecution>, Error>;

  /// Ids of all stored executions.
  async fn execution_ids(&self) -> Result<Vec<String>, Error>;

  /// Returns false when no execution was stored under the id.
  async fn delete_execution(&self, workflow_id: &str) -> Result<bool, Error>;
}
