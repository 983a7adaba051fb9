//! Signals: the typed columns of a signal set.

use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Declared type of a signal, as stored in the `signals.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
  Integer,
  Long,
  Float,
  Double,
  Boolean,
  Keyword,
  Text,
  DateTime,
  Json,
  /// Computed from other signals by a script; has no source column
  Painless,
}

/// Where a signal's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
  /// Stored in the signal set's source table
  Raw,
  /// Computed at query time
  Derived,
}

impl SignalType {
  pub fn source(self) -> SignalSource {
    match self {
      SignalType::Painless => SignalSource::Derived,
      _ => SignalSource::Raw,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      SignalType::Integer => "integer",
      SignalType::Long => "long",
      SignalType::Float => "float",
      SignalType::Double => "double",
      SignalType::Boolean => "boolean",
      SignalType::Keyword => "keyword",
      SignalType::Text => "text",
      SignalType::DateTime => "date",
      SignalType::Json => "json",
      SignalType::Painless => "painless",
    }
  }
}

impl fmt::Display for SignalType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown signal type: {0}")]
pub struct UnknownSignalType(pub String);

impl FromStr for SignalType {
  type Err = UnknownSignalType;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "integer" => Ok(SignalType::Integer),
      "long" => Ok(SignalType::Long),
      "float" => Ok(SignalType::Float),
      "double" => Ok(SignalType::Double),
      "boolean" => Ok(SignalType::Boolean),
      "keyword" => Ok(SignalType::Keyword),
      "text" => Ok(SignalType::Text),
      "date" => Ok(SignalType::DateTime),
      "json" => Ok(SignalType::Json),
      "painless" => Ok(SignalType::Painless),
      other => Err(UnknownSignalType(other.to_string())),
    }
  }
}

/// A signal declared on a signal set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
  pub id: i64,
  pub cid: String,
  /// Raw type string; parsed lazily so an unknown type only fails the pass that needs it
  pub type_name: String,
}

impl Signal {
  pub fn signal_type(&self) -> Result<SignalType, UnknownSignalType> {
    self.type_name.parse()
  }
}

/// A raw signal that is copied from the source table into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedField {
  pub signal_id: i64,
  pub signal_type: SignalType,
}

impl IndexedField {
  /// Column name in the source table and field name in the index document
  pub fn name(&self) -> String {
    field_name(self.signal_id)
  }
}

/// Pick the fields that are indexed: raw signals only.
///
/// Fails on the first signal with an unknown type.
pub fn indexed_fields(signals: &[Signal]) -> Result<Vec<IndexedField>, UnknownSignalType> {
  let mut fields = Vec::with_capacity(signals.len());
  for signal in signals {
    let signal_type = signal.signal_type()?;
    if signal_type.source() == SignalSource::Raw {
      fields.push(IndexedField {
        signal_id: signal.id,
        signal_type,
      });
    }
  }
  Ok(fields)
}

/// Name of the column/field holding a signal's values.
pub fn field_name(signal_id: i64) -> String {
  format!("s{}", signal_id)
}

/// A typed value read from a source row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Null,
  Integer(i64),
  Float(f64),
  Boolean(bool),
  Text(String),
  DateTime(NaiveDateTime),
  Json(serde_json::Value),
}
