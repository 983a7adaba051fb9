//! Signal sets and their persisted indexing state.

use serde::{Deserialize, Serialize};

use super::signal::Signal;

/// Indexing status persisted in a signal set's `state` blob.
///
/// Serialized as the numeric codes the rest of the platform reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum IndexingStatus {
  /// The index is in sync with the source table
  Ready,
  /// The index is out of sync and needs a pass
  Required,
  /// A pass is in progress
  Running,
}

impl From<IndexingStatus> for u8 {
  fn from(status: IndexingStatus) -> u8 {
    match status {
      IndexingStatus::Ready => 0,
      IndexingStatus::Required => 1,
      IndexingStatus::Running => 2,
    }
  }
}

impl TryFrom<u8> for IndexingStatus {
  type Error = String;

  fn try_from(code: u8) -> Result<Self, Self::Error> {
    match code {
      0 => Ok(IndexingStatus::Ready),
      1 => Ok(IndexingStatus::Required),
      2 => Ok(IndexingStatus::Running),
      other => Err(format!("unknown indexing status code {}", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingState {
  pub status: IndexingStatus,
}

impl Default for IndexingState {
  // a set that never recorded a status has never been indexed
  fn default() -> Self {
    Self {
      status: IndexingStatus::Required,
    }
  }
}

/// The `state` JSON blob of a signal set.
///
/// Only `indexing` is interpreted here; everything else is carried through
/// unchanged when the blob is rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSetState {
  #[serde(default)]
  pub indexing: IndexingState,
  #[serde(flatten)]
  pub other: serde_json::Map<String, serde_json::Value>,
}

impl SignalSetState {
  pub fn new(status: IndexingStatus) -> Self {
    Self {
      indexing: IndexingState { status },
      other: serde_json::Map::new(),
    }
  }

  pub fn status(&self) -> IndexingStatus {
    self.indexing.status
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
  pub id: i64,
  pub cid: String,
  pub state: SignalSetState,
}

impl SignalSet {
  /// Name of the search index mirroring this set
  pub fn index_name(&self) -> String {
    index_name(self.id)
  }
}

pub fn index_name(set_id: i64) -> String {
  format!("signal_set_{}", set_id)
}

pub fn table_name(set_id: i64) -> String {
  format!("signal_set_{}", set_id)
}

/// A signal set together with its declared signals.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSetRecord {
  pub set: SignalSet,
  pub signals: Vec<Signal>,
}
