//! In-memory metadata store.
//!
//! Keeps signal sets and their rows in memory and records every status
//! transition, which makes it handy for exercising the coordinator without a
//! database.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use tracing::debug;

use super::{MetadataStore, RowCursor, SourceRow, StoreError};
use crate::domain::{
  signal::IndexedField,
  signal_set::{IndexingStatus, SignalSetRecord},
};

struct MemorySet {
  record: SignalSetRecord,
  rows: BTreeMap<i64, SourceRow>,
  history: Vec<IndexingStatus>,
}

#[derive(Default)]
pub struct MemoryStore {
  sets: RwLock<HashMap<String, MemorySet>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add (or replace) a signal set; its rows are dropped.
  pub async fn insert_signal_set(&self, record: SignalSetRecord) {
    let cid = record.set.cid.clone();
    self.sets.write().await.insert(
      cid,
      MemorySet {
        record,
        rows: BTreeMap::new(),
        history: Vec::new(),
      },
    );
  }

  /// Insert or overwrite rows of a signal set. Unknown sets are ignored.
  pub async fn insert_rows(&self, cid: &str, rows: impl IntoIterator<Item = SourceRow>) {
    if let Some(set) = self.sets.write().await.get_mut(cid) {
      for row in rows {
        set.rows.insert(row.id, row);
      }
    }
  }

  pub async fn indexing_status(&self, cid: &str) -> Option<IndexingStatus> {
    self
      .sets
      .read()
      .await
      .get(cid)
      .map(|set| set.record.set.state.status())
  }

  /// Every status written for `cid`, oldest first.
  pub async fn status_history(&self, cid: &str) -> Vec<IndexingStatus> {
    self
      .sets
      .read()
      .await
      .get(cid)
      .map(|set| set.history.clone())
      .unwrap_or_default()
  }
}

#[async_trait::async_trait]
impl MetadataStore for MemoryStore {
  async fn set_indexing_status(&self, cid: &str, status: IndexingStatus) -> Result<SignalSetRecord, StoreError> {
    let mut sets = self.sets.write().await;
    let set = sets.get_mut(cid).ok_or_else(|| StoreError::NotFound(cid.to_string()))?;
    set.record.set.state.indexing.status = status;
    set.history.push(status);
    debug!(cid, ?status, "Updated indexing status");
    Ok(set.record.clone())
  }

  async fn fetch_rows(
    &self,
    set_id: i64,
    fields: &[IndexedField],
    cursor: RowCursor,
    limit: usize,
  ) -> Result<Vec<SourceRow>, StoreError> {
    let sets = self.sets.read().await;
    let set = sets
      .values()
      .find(|set| set.record.set.id == set_id)
      .ok_or_else(|| StoreError::NotFound(format!("signal set #{}", set_id)))?;

    Ok(
      set
        .rows
        .values()
        .filter(|row| cursor.admits(row.id))
        .take(limit)
        .map(|row| SourceRow {
          id: row.id,
          values: fields
            .iter()
            .filter_map(|field| {
              row
                .values
                .get(&field.signal_id)
                .map(|value| (field.signal_id, value.clone()))
            })
            .collect(),
        })
        .collect(),
    )
  }
}
