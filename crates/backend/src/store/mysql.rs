use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use sqlx::{
  MySqlPool, Row,
  mysql::{MySqlPoolOptions, MySqlRow},
};
use tracing::{debug, info, trace};

use super::{MetadataStore, RowCursor, SourceRow, StoreError};
use crate::domain::{
  config::DatabaseConfig,
  signal::{FieldValue, IndexedField, Signal, SignalType},
  signal_set::{IndexingStatus, SignalSet, SignalSetRecord, SignalSetState, table_name},
};

/// Metadata store backed by the platform's MySQL database.
///
/// Ids are cast to signed integers in every query because the platform
/// creates them as unsigned auto-increment columns.
#[derive(Debug, Clone)]
pub struct MySqlStore {
  pool: MySqlPool,
}

impl MySqlStore {
  /// Open a connection pool.
  pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
    let pool = MySqlPoolOptions::new()
      .max_connections(config.max_connections)
      .connect(&config.url)
      .await?;
    info!(max_connections = config.max_connections, "Connected to metadata database");
    Ok(Self::from_pool(pool))
  }

  pub fn from_pool(pool: MySqlPool) -> Self {
    Self { pool }
  }
}

#[async_trait::async_trait]
impl MetadataStore for MySqlStore {
  async fn set_indexing_status(&self, cid: &str, status: IndexingStatus) -> Result<SignalSetRecord, StoreError> {
    let mut tx = self.pool.begin().await?;

    let row = sqlx::query("SELECT CAST(id AS SIGNED) AS id, cid, state FROM signal_sets WHERE cid = ? FOR UPDATE")
      .bind(cid)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or_else(|| StoreError::NotFound(cid.to_string()))?;

    let id: i64 = row.try_get("id")?;
    let raw_state: String = row.try_get("state")?;
    let mut state: SignalSetState = serde_json::from_str(&raw_state)?;
    state.indexing.status = status;

    sqlx::query("UPDATE signal_sets SET state = ? WHERE id = ?")
      .bind(serde_json::to_string(&state)?)
      .bind(id)
      .execute(&mut *tx)
      .await?;

    let signals = sqlx::query("SELECT CAST(id AS SIGNED) AS id, cid, type FROM signals WHERE `set` = ? ORDER BY id")
      .bind(id)
      .fetch_all(&mut *tx)
      .await?
      .iter()
      .map(|row| {
        Ok(Signal {
          id: row.try_get("id")?,
          cid: row.try_get("cid")?,
          type_name: row.try_get("type")?,
        })
      })
      .collect::<Result<Vec<_>, sqlx::Error>>()?;

    tx.commit().await?;

    debug!(cid, ?status, signals = signals.len(), "Updated indexing status");

    Ok(SignalSetRecord {
      set: SignalSet {
        id,
        cid: row.try_get("cid")?,
        state,
      },
      signals,
    })
  }

  async fn fetch_rows(
    &self,
    set_id: i64,
    fields: &[IndexedField],
    cursor: RowCursor,
    limit: usize,
  ) -> Result<Vec<SourceRow>, StoreError> {
    let sql = select_rows_sql(set_id, fields, cursor);
    trace!(%sql, "Fetching rows");

    let mut query = sqlx::query(&sql);
    if let Some(after) = cursor.after {
      query = query.bind(after);
    }
    if let Some(from) = cursor.from {
      query = query.bind(from);
    }
    let rows = query.bind(limit as u64).fetch_all(&self.pool).await?;

    rows
      .iter()
      .map(|row| {
        let mut values = BTreeMap::new();
        for field in fields {
          values.insert(field.signal_id, decode_field(row, field)?);
        }
        Ok(SourceRow {
          id: row.try_get("id")?,
          values,
        })
      })
      .collect()
  }
}

/// Build the batch query; placeholders are bound in `after`, `from`, `limit` order.
fn select_rows_sql(set_id: i64, fields: &[IndexedField], cursor: RowCursor) -> String {
  let mut columns = vec!["CAST(id AS SIGNED) AS id".to_string()];
  columns.extend(fields.iter().map(|field| format!("`{}`", field.name())));

  let mut conditions = Vec::new();
  if cursor.after.is_some() {
    conditions.push("id > ?");
  }
  if cursor.from.is_some() {
    conditions.push("id >= ?");
  }

  let mut sql = format!("SELECT {} FROM `{}`", columns.join(", "), table_name(set_id));
  if !conditions.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));
  }
  sql.push_str(" ORDER BY id ASC LIMIT ?");
  sql
}

fn decode_field(row: &MySqlRow, field: &IndexedField) -> Result<FieldValue, StoreError> {
  let name = field.name();
  let column = name.as_str();

  let value = match field.signal_type {
    SignalType::Integer | SignalType::Long => row.try_get::<Option<i64>, _>(column)?.map(FieldValue::Integer),
    SignalType::Float => row
      .try_get::<Option<f32>, _>(column)?
      .map(|v| FieldValue::Float(f64::from(v))),
    SignalType::Double => row.try_get::<Option<f64>, _>(column)?.map(FieldValue::Float),
    SignalType::Boolean => row.try_get::<Option<bool>, _>(column)?.map(FieldValue::Boolean),
    SignalType::Keyword | SignalType::Text => row.try_get::<Option<String>, _>(column)?.map(FieldValue::Text),
    SignalType::DateTime => row
      .try_get::<Option<NaiveDateTime>, _>(column)?
      .map(FieldValue::DateTime),
    SignalType::Json => match row.try_get::<Option<String>, _>(column)? {
      Some(raw) => Some(FieldValue::Json(serde_json::from_str(&raw)?)),
      None => None,
    },
    SignalType::Painless => None,
  };

  Ok(value.unwrap_or(FieldValue::Null))
}
