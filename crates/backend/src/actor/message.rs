//! Message types for the reindex coordinator.

use ipc::IndexMethod;
use tokio::sync::oneshot;

use super::indexer::{IndexError, PassOutcome};

/// A request to (re)index one signal set.
///
/// Identity is `cid`: the queue holds at most one job per signal set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexJob {
  pub cid: String,
  pub method: IndexMethod,
  /// Reindex records with `id >= from` (incremental only)
  pub from: Option<i64>,
}

impl IndexJob {
  pub fn new(cid: impl Into<String>, method: IndexMethod, from: Option<i64>) -> Self {
    Self {
      cid: cid.into(),
      method,
      from,
    }
  }

  pub fn full(cid: impl Into<String>) -> Self {
    Self::new(cid, IndexMethod::Full, None)
  }

  pub fn incremental(cid: impl Into<String>) -> Self {
    Self::new(cid, IndexMethod::Incremental, None)
  }

  /// Fold a newer request for the same signal set into this one.
  ///
  /// Never loses the more thorough method, and keeps the further-back lower
  /// bound, where an absent bound counts as "from the beginning".
  pub fn merge(&mut self, newer: &IndexJob) {
    self.method = self.method.escalate(newer.method);
    self.from = match (self.from, newer.from) {
      (Some(a), Some(b)) => Some(a.min(b)),
      _ => None,
    };
  }
}

/// Commands accepted by the coordinator actor.
#[derive(Debug)]
pub enum CoordinatorCommand {
  Index(IndexJob),
  Cancel { cid: String },
  CancelAll,
  Status { reply: oneshot::Sender<CoordinatorStatus> },
  Shutdown,
}

/// Process-wide coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
  /// No pass is running
  Idle,
  /// A pass is running
  Indexing,
  /// The running pass has been told to stop
  Interrupt,
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorStatus {
  pub state: CoordinatorState,
  pub active: Option<IndexJob>,
  /// Pending jobs, next to run last
  pub queued: Vec<IndexJob>,
}

impl CoordinatorStatus {
  pub fn is_idle(&self) -> bool {
    self.state == CoordinatorState::Idle && self.queued.is_empty()
  }
}

/// Result of one pass, sent from the pass task back to the coordinator.
#[derive(Debug)]
pub struct PassReport {
  pub job: IndexJob,
  pub result: Result<PassOutcome, IndexError>,
}
