//! In-memory search index.
//!
//! Mirrors the Elasticsearch behaviours the indexer depends on: bulk writes
//! create a missing index, deleting a missing index is fine, queries against a
//! missing index fail.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tokio::sync::RwLock;

use super::{SearchError, SearchIndex};

#[derive(Debug, Default)]
struct MemoryIndexData {
  body: Value,
  docs: BTreeMap<i64, Value>,
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
  indices: RwLock<HashMap<String, MemoryIndexData>>,
}

impl MemoryIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creation body of an index, if it exists.
  pub async fn index_body(&self, index: &str) -> Option<Value> {
    self.indices.read().await.get(index).map(|data| data.body.clone())
  }

  /// All documents of an index ordered by id.
  pub async fn documents(&self, index: &str) -> Vec<(i64, Value)> {
    self
      .indices
      .read()
      .await
      .get(index)
      .map(|data| data.docs.iter().map(|(id, doc)| (*id, doc.clone())).collect())
      .unwrap_or_default()
  }
}

#[async_trait::async_trait]
impl SearchIndex for MemoryIndex {
  async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
    Ok(self.indices.read().await.contains_key(index))
  }

  async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
    let mut indices = self.indices.write().await;
    if indices.contains_key(index) {
      return Err(SearchError::Status {
        status: 400,
        body: format!("resource_already_exists_exception: index [{}] already exists", index),
      });
    }
    indices.insert(
      index.to_string(),
      MemoryIndexData {
        body: body.clone(),
        docs: BTreeMap::new(),
      },
    );
    Ok(())
  }

  async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
    self.indices.write().await.remove(index);
    Ok(())
  }

  async fn bulk_upsert(&self, index: &str, docs: Vec<(i64, Value)>) -> Result<(), SearchError> {
    let mut indices = self.indices.write().await;
    let data = indices.entry(index.to_string()).or_default();
    data.docs.extend(docs);
    Ok(())
  }

  async fn delete_from(&self, index: &str, from_id: i64) -> Result<(), SearchError> {
    let mut indices = self.indices.write().await;
    let data = indices
      .get_mut(index)
      .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
    data.docs.retain(|id, _| *id < from_id);
    Ok(())
  }

  async fn max_id(&self, index: &str) -> Result<Option<i64>, SearchError> {
    let indices = self.indices.read().await;
    let data = indices
      .get(index)
      .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
    Ok(data.docs.values().filter_map(|doc| doc.get("id").and_then(Value::as_i64)).max())
  }

  async fn get_document(&self, index: &str, id: i64) -> Result<Option<Value>, SearchError> {
    Ok(
      self
        .indices
        .read()
        .await
        .get(index)
        .and_then(|data| data.docs.get(&id).cloned()),
    )
  }

  async fn count(&self, index: &str) -> Result<u64, SearchError> {
    let indices = self.indices.read().await;
    let data = indices
      .get(index)
      .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
    Ok(data.docs.len() as u64)
  }
}
