use serde::{Deserialize, Serialize};

use crate::{IndexMethod, IpcError};

/// Messages sent by the parent process to the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Inbound {
  /// Schedule (or reschedule) indexing of a signal set
  Index {
    cid: String,
    method: IndexMethod,
    /// Lower bound on record ids to reindex (incremental only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<i64>,
  },
  /// Drop a queued job or interrupt the running one for `cid`
  CancelIndex { cid: String },
  /// Drop every queued job and interrupt the running one
  CancelAll,
}

/// Messages sent by the indexer to the parent process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Outbound {
  /// The indexer is up and accepting messages
  Started,
  /// An indexing pass for `cid` has finished
  Index { cid: String },
}

impl Inbound {
  /// Decode a single line of the control channel.
  pub fn from_line(line: &str) -> Result<Self, IpcError> {
    let line = line.trim();
    if line.is_empty() {
      return Err(IpcError::Empty);
    }
    Ok(serde_json::from_str(line)?)
  }
}

impl Outbound {
  /// Encode as a single line (without the trailing newline).
  pub fn to_line(&self) -> Result<String, IpcError> {
    Ok(serde_json::to_string(self)?)
  }
}
