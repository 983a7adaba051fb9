//! A single indexing pass over one signal set.
//!
//! The pass flips the persisted status to `Running`, works out where to
//! resume, (re)creates the index for full passes, then streams source rows in
//! id order and bulk-writes them as documents. It stops cooperatively when its
//! interrupt token fires; the token is checked after every await point.
//!
//! Whatever happens, the pass never leaves the status at `Running`: success
//! ends `Ready`, interruption or failure ends `Required`.

use std::sync::Arc;

use ipc::IndexMethod;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::message::IndexJob;
use crate::{
  domain::{
    signal::{IndexedField, UnknownSignalType, indexed_fields},
    signal_set::{IndexingStatus, SignalSetRecord},
  },
  search::{SearchError, SearchIndex, mapping},
  store::{MetadataStore, RowCursor, StoreError},
};

/// Errors that abort an indexing pass
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
  #[error("Store error: {0}")]
  Store(#[from] StoreError),
  #[error("Search error: {0}")]
  Search(#[from] SearchError),
  #[error("Mapping error: {0}")]
  Mapping(#[from] UnknownSignalType),
  #[error("Indexing task aborted: {0}")]
  Aborted(String),
}

/// How a pass ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
  Completed { records: u64 },
  Interrupted { records: u64 },
}

/// Best-effort downgrade after a failed or aborted pass.
pub async fn mark_required(store: &dyn MetadataStore, cid: &str) {
  if let Err(e) = store.set_indexing_status(cid, IndexingStatus::Required).await {
    error!(cid, error = %e, "Failed to mark signal set as requiring reindex");
  }
}

pub struct IndexPass {
  store: Arc<dyn MetadataStore>,
  search: Arc<dyn SearchIndex>,
  batch_size: usize,
  interrupt: CancellationToken,
}

impl IndexPass {
  pub fn new(
    store: Arc<dyn MetadataStore>,
    search: Arc<dyn SearchIndex>,
    batch_size: usize,
    interrupt: CancellationToken,
  ) -> Self {
    Self {
      store,
      search,
      batch_size: batch_size.max(1),
      interrupt,
    }
  }

  fn interrupted(&self) -> bool {
    self.interrupt.is_cancelled()
  }

  /// Run the pass to completion, interruption or failure.
  pub async fn run(self, job: IndexJob) -> Result<PassOutcome, IndexError> {
    info!(cid = %job.cid, method = %job.method, from = ?job.from, "Reindexing");

    let record = self.store.set_indexing_status(&job.cid, IndexingStatus::Running).await?;

    let records = match self.index(&record, &job).await {
      Ok(records) => records,
      Err(e) => {
        mark_required(self.store.as_ref(), &job.cid).await;
        warn!(cid = %job.cid, "Failed");
        return Err(e);
      }
    };

    if self.interrupted() {
      if let Err(e) = self.store.set_indexing_status(&job.cid, IndexingStatus::Required).await {
        error!(cid = %job.cid, error = %e, "Failed to mark interrupted signal set as requiring reindex");
        return Err(e.into());
      }
      info!(cid = %job.cid, records, "Interrupted");
      return Ok(PassOutcome::Interrupted { records });
    }

    if let Err(e) = self.store.set_indexing_status(&job.cid, IndexingStatus::Ready).await {
      mark_required(self.store.as_ref(), &job.cid).await;
      return Err(e.into());
    }
    info!(cid = %job.cid, records, "Indexed");
    Ok(PassOutcome::Completed { records })
  }

  /// Steps between the two status updates. Returns the number of records written.
  async fn index(&self, record: &SignalSetRecord, job: &IndexJob) -> Result<u64, IndexError> {
    let index = record.set.index_name();
    let fields = indexed_fields(&record.signals)?;

    let mut method = job.method;
    let mut cursor = RowCursor::default();

    if method == IndexMethod::Incremental {
      if self.search.index_exists(&index).await? {
        match job.from {
          None => {
            cursor.after = self.search.max_id(&index).await?;
            debug!(index, after = ?cursor.after, "Resuming after last indexed record");
          }
          Some(from) => {
            self.search.delete_from(&index, from).await?;
            cursor.from = Some(from);
            debug!(index, from, "Reindexing from lower bound");
          }
        }
      } else {
        debug!(index, "Index missing, switching to full reindex");
        method = IndexMethod::Full;
      }
    }

    if self.interrupted() {
      return Ok(0);
    }

    if method == IndexMethod::Full {
      self.recreate_index(&index, &fields).await?;
      cursor = RowCursor::default();
    }

    let mut records = 0u64;
    while !self.interrupted() {
      let rows = self
        .store
        .fetch_rows(record.set.id, &fields, cursor, self.batch_size)
        .await?;

      let (Some(first), Some(last)) = (rows.first().map(|r| r.id), rows.last().map(|r| r.id)) else {
        break;
      };

      if self.interrupted() {
        break;
      }

      info!(cid = %job.cid, count = rows.len(), first, last, "Indexing records");

      let docs = rows
        .iter()
        .map(|row| (row.id, mapping::document(row, &fields)))
        .collect();
      self.search.bulk_upsert(&index, docs).await?;

      records += rows.len() as u64;
      cursor.after = Some(last);

      if rows.len() < self.batch_size {
        break;
      }
    }

    Ok(records)
  }

  async fn recreate_index(&self, index: &str, fields: &[IndexedField]) -> Result<(), IndexError> {
    self.search.delete_index(index).await?;
    self.search.create_index(index, &mapping::index_body(fields)).await?;
    debug!(index, fields = fields.len(), "Created index");
    Ok(())
  }
}
