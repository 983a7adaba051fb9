use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Empty message")]
  Empty,
}
