use std::fmt;

use serde::{Deserialize, Serialize};

/// How thoroughly a signal set should be (re)indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
  /// Append records newer than what the index already holds
  Incremental,
  /// Drop the index and rebuild it from scratch
  Full,
}

impl IndexMethod {
  /// The more thorough of two methods.
  pub fn escalate(self, other: IndexMethod) -> IndexMethod {
    if self == IndexMethod::Full || other == IndexMethod::Full {
      IndexMethod::Full
    } else {
      IndexMethod::Incremental
    }
  }
}

impl fmt::Display for IndexMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IndexMethod::Incremental => f.write_str("incremental"),
      IndexMethod::Full => f.write_str("full"),
    }
  }
}
