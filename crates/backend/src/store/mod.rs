//! Relational metadata and source-row store.
//!
//! The indexer only needs two things from the relational side: flipping a
//! signal set's indexing status (and reading its schema while doing so), and
//! streaming source rows in id order.

mod memory;
mod mysql;

use std::collections::BTreeMap;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use crate::domain::{
  signal::{FieldValue, IndexedField},
  signal_set::{IndexingStatus, SignalSetRecord},
};

/// Range filter for streaming source rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCursor {
  /// Only rows with `id > after` (the resume cursor)
  pub after: Option<i64>,
  /// Only rows with `id >= from` (explicit lower bound)
  pub from: Option<i64>,
}

impl RowCursor {
  pub fn admits(&self, id: i64) -> bool {
    self.after.is_none_or(|after| id > after) && self.from.is_none_or(|from| id >= from)
  }
}

/// One record of a signal set's source table.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
  pub id: i64,
  /// Values keyed by signal id
  pub values: BTreeMap<i64, FieldValue>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),
  #[error("Signal set not found: {0}")]
  NotFound(String),
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
  /// Atomically set the indexing status of a signal set.
  ///
  /// Returns the set (with the new status) and its declared signals, read
  /// in the same transaction.
  async fn set_indexing_status(&self, cid: &str, status: IndexingStatus) -> Result<SignalSetRecord, StoreError>;

  /// Fetch up to `limit` rows ordered by ascending id, decoding `fields`.
  async fn fetch_rows(
    &self,
    set_id: i64,
    fields: &[IndexedField],
    cursor: RowCursor,
    limit: usize,
  ) -> Result<Vec<SourceRow>, StoreError>;
}
