//! Search engine side of indexing.
//!
//! [`SearchIndex`] is the small slice of the Elasticsearch API the indexer
//! relies on. [`ElasticClient`] talks to a real cluster over REST,
//! [`MemoryIndex`] keeps documents in memory.

pub mod bootstrap;
mod elastic;
pub mod mapping;
mod memory;

pub use elastic::ElasticClient;
pub use memory::MemoryIndex;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
  #[error("Request failed: {0}")]
  Request(#[from] reqwest::Error),
  #[error("Elasticsearch returned {status}: {body}")]
  Status { status: u16, body: String },
  #[error("Bulk request rejected {failed} documents, first reason: {reason}")]
  Bulk { failed: usize, reason: String },
  #[error("Index not found: {0}")]
  IndexNotFound(String),
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
  async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

  /// Create an index from a full settings/mappings body.
  async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError>;

  /// Delete an index; deleting a missing index is not an error.
  async fn delete_index(&self, index: &str) -> Result<(), SearchError>;

  /// Index or overwrite documents keyed by source record id.
  async fn bulk_upsert(&self, index: &str, docs: Vec<(i64, Value)>) -> Result<(), SearchError>;

  /// Delete every document whose `id` field is `>= from_id`.
  async fn delete_from(&self, index: &str, from_id: i64) -> Result<(), SearchError>;

  /// Highest `id` field present in the index.
  async fn max_id(&self, index: &str) -> Result<Option<i64>, SearchError>;

  async fn get_document(&self, index: &str, id: i64) -> Result<Option<Value>, SearchError>;

  async fn count(&self, index: &str) -> Result<u64, SearchError>;
}
