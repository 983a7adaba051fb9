//! Fixed auxiliary indices that the platform expects to exist.
//!
//! Workflow execution records are written straight into these indices by
//! other services, so they are created once at startup rather than mirrored
//! from a signal set.

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::SearchIndex;

pub const EXECUTED_WORKFLOWS_INDEX: &str = "executed_workflows";
pub const EXECUTED_TASKS_INDEX: &str = "executed_tasks";

fn executed_workflows_body() -> Value {
  json!({
    "mappings": {
      "properties": {
        "executedWorkflows": {
          "type": "nested",
          "properties": {
            "id": { "type": "keyword" },
            "name": { "type": "text" },
            "deployedWorkflow": { "type": "keyword" },
            "start": { "type": "date" },
            "end": { "type": "date" },
            "characteristics": { "type": "object" },
            "comment": { "type": "text" },
            "executedTasks": { "type": "keyword" }
          }
        }
      }
    }
  })
}

fn executed_tasks_body() -> Value {
  json!({
    "mappings": {
      "properties": {
        "id": { "type": "keyword" },
        "name": { "type": "text" },
        "start": { "type": "date" },
        "end": { "type": "date" },
        "characteristics": { "type": "object" },
        "comment": { "type": "text" },
        "executedWorkflow": { "type": "keyword" },
        "source_code": { "type": "text" },
        "parameters": { "type": "object" },
        "input_datasets": { "type": "object" },
        "metrics": { "type": "object" },
        "output_datasets": { "type": "object" }
      }
    }
  })
}

/// Name and creation body of every fixed index.
pub fn fixed_indices() -> Vec<(&'static str, Value)> {
  vec![
    (EXECUTED_WORKFLOWS_INDEX, executed_workflows_body()),
    (EXECUTED_TASKS_INDEX, executed_tasks_body()),
  ]
}

/// Create any missing fixed index. Returns how many were created.
///
/// Failures are logged and skipped; they never stop the indexer.
pub async fn ensure_fixed_indices(search: &dyn SearchIndex) -> usize {
  let mut created = 0;

  for (name, body) in fixed_indices() {
    match search.index_exists(name).await {
      Ok(true) => debug!(index = name, "Index already exists"),
      Ok(false) => match search.create_index(name, &body).await {
        Ok(()) => {
          info!(index = name, "Index initialized");
          created += 1;
        }
        Err(e) => warn!(index = name, error = %e, "Failed to initialize index"),
      },
      Err(e) => warn!(index = name, error = %e, "Failed to check index"),
    }
  }

  created
}
