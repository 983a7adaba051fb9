//! Translation between signal types and Elasticsearch field types/values.

use chrono::SecondsFormat;
use serde_json::{Map, Value, json};

use crate::{
  domain::signal::{FieldValue, IndexedField, SignalType},
  store::SourceRow,
};

/// Elasticsearch mapping for a signal type; `None` for derived types.
pub fn field_mapping(signal_type: SignalType) -> Option<Value> {
  let mapping = match signal_type {
    SignalType::Integer => json!({ "type": "integer" }),
    SignalType::Long => json!({ "type": "long" }),
    SignalType::Float => json!({ "type": "float" }),
    SignalType::Double => json!({ "type": "double" }),
    SignalType::Boolean => json!({ "type": "boolean" }),
    SignalType::Keyword => json!({ "type": "keyword" }),
    SignalType::Text => json!({ "type": "text" }),
    SignalType::DateTime => json!({ "type": "date" }),
    // stored and returned, never searched
    SignalType::Json => json!({ "type": "object", "enabled": false }),
    SignalType::Painless => return None,
  };
  Some(mapping)
}

/// Index creation body for a signal set.
pub fn index_body(fields: &[IndexedField]) -> Value {
  let mut properties = Map::new();
  properties.insert("id".to_string(), json!({ "type": "long" }));
  for field in fields {
    if let Some(mapping) = field_mapping(field.signal_type) {
      properties.insert(field.name(), mapping);
    }
  }

  json!({
    "mappings": {
      "properties": properties
    }
  })
}

/// Search-engine representation of a source value.
pub fn search_value(value: &FieldValue) -> Value {
  match value {
    FieldValue::Null => Value::Null,
    FieldValue::Integer(v) => Value::from(*v),
    FieldValue::Float(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
    FieldValue::Boolean(v) => Value::Bool(*v),
    FieldValue::Text(v) => Value::String(v.clone()),
    FieldValue::DateTime(v) => Value::String(v.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)),
    FieldValue::Json(v) => v.clone(),
  }
}

/// Build the document stored for a source row.
pub fn document(row: &SourceRow, fields: &[IndexedField]) -> Value {
  let mut doc = Map::new();
  doc.insert("id".to_string(), Value::from(row.id));
  for field in fields {
    let value = row.values.get(&field.signal_id).map_or(Value::Null, search_value);
    doc.insert(field.name(), value);
  }
  Value::Object(doc)
}
