use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("failed to serialize record for workflow {workflow_id}")]
  Serialize {
    workflow_id: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("corrupt record for workflow {workflow_id}")]
  Corrupt {
    workflow_id: String,
    #[source]
    source: serde_json::Error,
  },
}

pub(crate) fn encode<T: serde::Serialize>(workflow_id: &str, record: &T) -> Result<String, Error> {
  serde_json::to_string(record).map_err(|source| Error::Serialize {
    workflow_id: workflow_id.to_string(),
    source,
  })
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
  workflow_id: &str,
  record: &str,
) -> Result<T, Error> {
  serde_json::from_str(record).map_err(|source| Error::Corrupt {
    workflow_id: workflow_id.to_string(),
    source,
  })
}
