use std::time::Duration;

use reqwest::{Response, StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use super::{SearchError, SearchIndex};
use crate::domain::config::ElasticsearchConfig;

/// Elasticsearch REST client.
#[derive(Debug, Clone)]
pub struct ElasticClient {
  client: reqwest::Client,
  base_url: String,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
  errors: bool,
  #[serde(default)]
  items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
  hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
  hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
  #[serde(rename = "_source")]
  source: Value,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
  count: u64,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
  #[serde(rename = "_source")]
  source: Option<Value>,
}

impl ElasticClient {
  pub fn new(config: &ElasticsearchConfig) -> Result<Self, SearchError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()?;
    let base_url = config.base_url();
    info!(base_url, "Elasticsearch client initialized");
    Ok(Self { client, base_url })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }
}

/// Turn a non-success response into an error carrying the body.
async fn check(response: Response) -> Result<Response, SearchError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(SearchError::Status {
    status: status.as_u16(),
    body,
  })
}

/// Encode documents as an NDJSON `_bulk` body of `index` actions.
fn bulk_body(index: &str, docs: &[(i64, Value)]) -> Result<String, SearchError> {
  let mut body = String::new();
  for (id, doc) in docs {
    let action = json!({ "index": { "_index": index, "_id": id.to_string() } });
    body.push_str(&serde_json::to_string(&action)?);
    body.push('\n');
    body.push_str(&serde_json::to_string(doc)?);
    body.push('\n');
  }
  Ok(body)
}

/// Summarize rejected items of a bulk response.
fn bulk_failures(response: &BulkResponse) -> Option<SearchError> {
  if !response.errors {
    return None;
  }
  let failed: Vec<&Value> = response
    .items
    .iter()
    .filter_map(|item| item.get("index").and_then(|action| action.get("error")))
    .collect();
  let reason = failed
    .first()
    .and_then(|error| error.get("reason"))
    .and_then(Value::as_str)
    .unwrap_or("unknown")
    .to_string();
  Some(SearchError::Bulk {
    failed: failed.len(),
    reason,
  })
}

#[async_trait::async_trait]
impl SearchIndex for ElasticClient {
  async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
    let response = self.client.head(self.url(index)).send().await?;
    match response.status() {
      StatusCode::NOT_FOUND => Ok(false),
      _ => check(response).await.map(|_| true),
    }
  }

  async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
    debug!(index, "Creating index");
    let response = self.client.put(self.url(index)).json(body).send().await?;
    check(response).await?;
    Ok(())
  }

  async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
    debug!(index, "Deleting index");
    let response = self
      .client
      .delete(self.url(&format!("{}?ignore_unavailable=true", index)))
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(());
    }
    check(response).await?;
    Ok(())
  }

  async fn bulk_upsert(&self, index: &str, docs: Vec<(i64, Value)>) -> Result<(), SearchError> {
    if docs.is_empty() {
      return Ok(());
    }

    trace!(index, docs = docs.len(), "Bulk upsert");
    let response = self
      .client
      .post(self.url("_bulk"))
      .header(CONTENT_TYPE, "application/x-ndjson")
      .body(bulk_body(index, &docs)?)
      .send()
      .await?;
    let response: BulkResponse = check(response).await?.json().await?;

    match bulk_failures(&response) {
      Some(err) => {
        warn!(index, error = %err, "Bulk upsert partially failed");
        Err(err)
      }
      None => Ok(()),
    }
  }

  async fn delete_from(&self, index: &str, from_id: i64) -> Result<(), SearchError> {
    debug!(index, from_id, "Deleting documents at or above id");
    let body = json!({
      "query": {
        "range": { "id": { "gte": from_id } }
      }
    });
    let response = self
      .client
      .post(self.url(&format!("{}/_delete_by_query", index)))
      .json(&body)
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Err(SearchError::IndexNotFound(index.to_string()));
    }
    check(response).await?;
    Ok(())
  }

  async fn max_id(&self, index: &str) -> Result<Option<i64>, SearchError> {
    let body = json!({
      "_source": ["id"],
      "sort": [{ "id": { "order": "desc" } }],
      "size": 1
    });
    let response = self
      .client
      .post(self.url(&format!("{}/_search", index)))
      .json(&body)
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Err(SearchError::IndexNotFound(index.to_string()));
    }
    let response: SearchResponse = check(response).await?.json().await?;

    Ok(
      response
        .hits
        .hits
        .first()
        .and_then(|hit| hit.source.get("id"))
        .and_then(Value::as_i64),
    )
  }

  async fn get_document(&self, index: &str, id: i64) -> Result<Option<Value>, SearchError> {
    let response = self
      .client
      .get(self.url(&format!("{}/_doc/{}", index, id)))
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let response: GetResponse = check(response).await?.json().await?;
    Ok(response.source)
  }

  async fn count(&self, index: &str) -> Result<u64, SearchError> {
    let response = self.client.get(self.url(&format!("{}/_count", index))).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Err(SearchError::IndexNotFound(index.to_string()));
    }
    let response: CountResponse = check(response).await?.json().await?;
    Ok(response.count)
  }
}
