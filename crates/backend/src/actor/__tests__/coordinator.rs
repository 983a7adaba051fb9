//! Coordinator scenario tests.
//!
//! Drive the coordinator through its handle against in-memory collaborators
//! and check queue order, interrupts, persisted statuses and notifications.

#[cfg(test)]
mod tests {
  use ipc::IndexMethod;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use crate::{
    actor::{
      __tests__::helpers::{CoordinatorTestContext, TIMEOUT, row, rows, signal_set_with},
      message::{CoordinatorState, IndexJob},
    },
    domain::signal_set::IndexingStatus::{Ready, Required, Running},
    search::SearchIndex,
  };

  // ==========================================================================
  // Indexing methods
  // ==========================================================================

  /// Test: Incremental request without an index builds it from scratch.
  #[tokio::test]
  async fn test_incremental_without_index_runs_full() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "weather", 5).await;

    ctx.request("weather", IndexMethod::Incremental, None).await;

    assert_eq!(ctx.next_finished().await, "weather");
    assert_eq!(ctx.history("weather").await, vec![Running, Ready]);
    assert_eq!(ctx.document_ids(1).await, vec![1, 2, 3, 4, 5]);

    let body = ctx.search.inner.index_body("signal_set_1").await.expect("index created");
    assert_eq!(
      body["mappings"]["properties"],
      json!({
        "id": { "type": "long" },
        "s1": { "type": "integer" },
        "s2": { "type": "keyword" }
      })
    );

    ctx.shutdown().await;
  }

  /// Test: Incremental pass picks up after the highest indexed record.
  #[tokio::test]
  async fn test_incremental_resumes_after_last_document() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "weather", 5).await;
    ctx.request("weather", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "weather");

    // record 1 changes at the source, records 6 and 7 are appended
    ctx.store.inner.insert_rows("weather", [row(1, "v2")]).await;
    ctx.store.inner.insert_rows("weather", rows(6..=7, "v2")).await;

    ctx.request("weather", IndexMethod::Incremental, None).await;
    assert_eq!(ctx.next_finished().await, "weather");

    let docs = ctx.documents(1).await;
    assert_eq!(docs.len(), 7);
    assert_eq!(docs[0].1["s2"], "v1-1");
    assert_eq!(docs[6].1, json!({ "id": 7, "s1": 70, "s2": "v2-7" }));
    assert_eq!(ctx.history("weather").await, vec![Running, Ready, Running, Ready]);

    ctx.shutdown().await;
  }

  /// Test: Incremental pass with a lower bound replaces everything from it on.
  #[tokio::test]
  async fn test_incremental_from_reindexes_tail() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "weather", 5).await;
    ctx.request("weather", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "weather");

    // a stale document that no longer exists at the source
    ctx
      .search
      .inner
      .bulk_upsert("signal_set_1", vec![(99, json!({ "id": 99 }))])
      .await
      .unwrap();
    ctx.store.inner.insert_rows("weather", [row(2, "v2"), row(4, "v2")]).await;

    ctx.request("weather", IndexMethod::Incremental, Some(4)).await;
    assert_eq!(ctx.next_finished().await, "weather");

    let docs = ctx.documents(1).await;
    assert_eq!(docs.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert_eq!(docs[1].1["s2"], "v1-2");
    assert_eq!(docs[3].1["s2"], "v2-4");

    ctx.shutdown().await;
  }

  /// Test: Full pass ignores the lower bound and rewrites every record.
  #[tokio::test]
  async fn test_full_ignores_from() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "weather", 5).await;
    ctx.request("weather", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "weather");

    ctx.store.inner.insert_rows("weather", rows(1..=5, "v2")).await;
    ctx.request("weather", IndexMethod::Full, Some(4)).await;
    assert_eq!(ctx.next_finished().await, "weather");

    let docs = ctx.documents(1).await;
    assert_eq!(docs.len(), 5);
    assert!(docs.iter().all(|(id, doc)| doc["s2"] == format!("v2-{}", id)));

    ctx.shutdown().await;
  }

  /// Test: Two full passes in a row produce the same index.
  #[tokio::test]
  async fn test_full_twice_is_idempotent() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "weather", 5).await;

    ctx.request("weather", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "weather");
    let first = ctx.documents(1).await;

    ctx.request("weather", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "weather");

    assert_eq!(ctx.documents(1).await, first);
    assert_eq!(ctx.history("weather").await, vec![Running, Ready, Running, Ready]);

    ctx.shutdown().await;
  }

  // ==========================================================================
  // Scheduling
  // ==========================================================================

  /// Test: Pending jobs run newest first.
  #[tokio::test]
  async fn test_queue_runs_newest_first() {
    let mut ctx = CoordinatorTestContext::gated();
    for (id, cid) in [(1, "a"), (2, "b"), (3, "c")] {
      ctx.seed(id, cid, 3).await;
    }

    ctx.request("a", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("b", IndexMethod::Full, None).await;
    ctx.request("c", IndexMethod::Full, None).await;

    let status = ctx.status().await;
    assert_eq!(status.state, CoordinatorState::Indexing);
    assert_eq!(status.active, Some(IndexJob::full("a")));
    assert_eq!(status.queued, vec![IndexJob::full("b"), IndexJob::full("c")]);

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "a");
    assert_eq!(ctx.next_finished().await, "c");
    assert_eq!(ctx.next_finished().await, "b");
    ctx.wait_idle().await;

    ctx.shutdown().await;
  }

  /// Test: A repeated request merges and moves to the top of the queue.
  #[tokio::test]
  async fn test_merged_request_moves_to_top() {
    let mut ctx = CoordinatorTestContext::gated();
    for (id, cid) in [(1, "a"), (2, "b"), (3, "c")] {
      ctx.seed(id, cid, 3).await;
    }

    ctx.request("a", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("b", IndexMethod::Incremental, Some(3)).await;
    ctx.request("c", IndexMethod::Full, None).await;
    ctx.request("b", IndexMethod::Full, Some(1)).await;

    let status = ctx.status().await;
    assert_eq!(
      status.queued,
      vec![IndexJob::full("c"), IndexJob::new("b", IndexMethod::Full, Some(1))]
    );

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "a");
    assert_eq!(ctx.next_finished().await, "b");
    assert_eq!(ctx.next_finished().await, "c");

    ctx.shutdown().await;
  }

  /// Test: Full request for the set under a full rebuild restarts the rebuild.
  #[tokio::test]
  async fn test_full_request_restarts_running_full() {
    let mut ctx = CoordinatorTestContext::gated();
    ctx.seed(1, "weather", 5).await;

    ctx.request("weather", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("weather", IndexMethod::Full, None).await;

    let status = ctx.status().await;
    assert_eq!(status.state, CoordinatorState::Interrupt);
    assert_eq!(status.queued, vec![IndexJob::full("weather")]);

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "weather");
    assert_eq!(ctx.next_finished().await, "weather");
    ctx.wait_idle().await;

    assert_eq!(ctx.history("weather").await, vec![Running, Required, Running, Ready]);
    assert_eq!(ctx.document_ids(1).await, vec![1, 2, 3, 4, 5]);

    ctx.shutdown().await;
  }

  /// Test: Incremental request never interrupts a running pass.
  #[tokio::test]
  async fn test_incremental_request_does_not_restart() {
    let mut ctx = CoordinatorTestContext::gated();
    ctx.seed(1, "weather", 5).await;

    ctx.request("weather", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("weather", IndexMethod::Incremental, None).await;

    let status = ctx.status().await;
    assert_eq!(status.state, CoordinatorState::Indexing);
    assert_eq!(status.queued, vec![IndexJob::incremental("weather")]);

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "weather");
    assert_eq!(ctx.next_finished().await, "weather");

    assert_eq!(ctx.history("weather").await, vec![Running, Ready, Running, Ready]);

    ctx.shutdown().await;
  }

  /// Test: A full request merged into an already queued job does not restart.
  #[tokio::test]
  async fn test_full_request_merged_into_queue_does_not_restart() {
    let mut ctx = CoordinatorTestContext::gated();
    ctx.seed(1, "weather", 5).await;

    ctx.request("weather", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("weather", IndexMethod::Incremental, None).await;
    ctx.request("weather", IndexMethod::Full, None).await;

    let status = ctx.status().await;
    assert_eq!(status.state, CoordinatorState::Indexing);
    assert_eq!(status.queued, vec![IndexJob::full("weather")]);

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "weather");
    assert_eq!(ctx.next_finished().await, "weather");
    assert_eq!(ctx.history("weather").await, vec![Running, Ready, Running, Ready]);

    ctx.shutdown().await;
  }

  // ==========================================================================
  // Cancellation
  // ==========================================================================

  /// Test: Cancelling the running job interrupts it and leaves it Required.
  #[tokio::test]
  async fn test_cancel_running_job() {
    let mut ctx = CoordinatorTestContext::gated();
    ctx.seed(1, "weather", 5).await;

    ctx.request("weather", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.handle.cancel("weather").await.unwrap();

    assert_eq!(ctx.status().await.state, CoordinatorState::Interrupt);

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "weather");
    ctx.wait_idle().await;

    assert_eq!(ctx.history("weather").await, vec![Running, Required]);
    assert!(ctx.document_ids(1).await.is_empty());
    ctx.assert_no_more_notifications();

    ctx.shutdown().await;
  }

  /// Test: Cancelling a queued job drops it without touching the running one.
  #[tokio::test]
  async fn test_cancel_queued_job() {
    let mut ctx = CoordinatorTestContext::gated();
    for (id, cid) in [(1, "a"), (2, "b"), (3, "c")] {
      ctx.seed(id, cid, 3).await;
    }

    ctx.request("a", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("b", IndexMethod::Full, None).await;
    ctx.request("c", IndexMethod::Full, None).await;
    ctx.handle.cancel("b").await.unwrap();

    let status = ctx.status().await;
    assert_eq!(status.state, CoordinatorState::Indexing);
    assert_eq!(status.queued, vec![IndexJob::full("c")]);

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "a");
    assert_eq!(ctx.next_finished().await, "c");
    ctx.wait_idle().await;

    assert_eq!(ctx.history("a").await, vec![Running, Ready]);
    assert!(ctx.history("b").await.is_empty());
    ctx.assert_no_more_notifications();

    ctx.shutdown().await;
  }

  /// Test: Cancelling an unknown signal set changes nothing.
  #[tokio::test]
  async fn test_cancel_unknown_is_noop() {
    let mut ctx = CoordinatorTestContext::gated();
    ctx.seed(1, "weather", 3).await;

    ctx.handle.cancel("nope").await.unwrap();
    let status = ctx.status().await;
    assert!(status.is_idle());
    assert_eq!(status.active, None);

    ctx.request("weather", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.handle.cancel("nope").await.unwrap();
    assert_eq!(ctx.status().await.state, CoordinatorState::Indexing);

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "weather");
    assert_eq!(ctx.history("weather").await, vec![Running, Ready]);

    ctx.shutdown().await;
  }

  /// Test: Cancel-all empties the queue and interrupts the running job.
  #[tokio::test]
  async fn test_cancel_all() {
    let mut ctx = CoordinatorTestContext::gated();
    for (id, cid) in [(1, "a"), (2, "b"), (3, "c")] {
      ctx.seed(id, cid, 3).await;
    }

    ctx.request("a", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("b", IndexMethod::Full, None).await;
    ctx.request("c", IndexMethod::Incremental, None).await;
    ctx.handle.cancel_all().await.unwrap();

    let status = ctx.status().await;
    assert_eq!(status.state, CoordinatorState::Interrupt);
    assert!(status.queued.is_empty());

    ctx.store.release();
    assert_eq!(ctx.next_finished().await, "a");
    ctx.wait_idle().await;

    assert_eq!(ctx.status().await.state, CoordinatorState::Idle);
    assert_eq!(ctx.history("a").await, vec![Running, Required]);
    assert!(ctx.history("b").await.is_empty());
    assert!(ctx.history("c").await.is_empty());
    ctx.assert_no_more_notifications();

    ctx.shutdown().await;
  }

  /// Test: Cancel-all while idle is harmless.
  #[tokio::test]
  async fn test_cancel_all_when_idle() {
    let ctx = CoordinatorTestContext::new();
    ctx.handle.cancel_all().await.unwrap();
    assert!(ctx.status().await.is_idle());
    ctx.shutdown().await;
  }

  // ==========================================================================
  // Failures
  // ==========================================================================

  /// Test: A failing pass ends Required and the worker moves on.
  #[tokio::test]
  async fn test_failed_pass_marks_required_and_continues() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "broken", 3).await;
    ctx.seed(2, "fine", 3).await;
    ctx.search.fail_bulk("signal_set_1");

    ctx.request("broken", IndexMethod::Full, None).await;
    ctx.request("fine", IndexMethod::Full, None).await;

    assert_eq!(ctx.next_finished().await, "broken");
    assert_eq!(ctx.next_finished().await, "fine");

    assert_eq!(ctx.history("broken").await, vec![Running, Required]);
    assert_eq!(ctx.history("fine").await, vec![Running, Ready]);
    assert_eq!(ctx.document_ids(2).await, vec![1, 2, 3]);

    ctx.shutdown().await;
  }

  /// Test: A pass that panics is reported and never stays Running.
  #[tokio::test]
  async fn test_panicking_pass_marks_required() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "c1", 3).await;
    ctx.seed(2, "c2", 3).await;
    ctx.store.panic_on_fetch();

    ctx.request("c1", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "c1");
    ctx.wait_idle().await;

    assert_eq!(ctx.history("c1").await, vec![Running, Required]);
    assert_eq!(ctx.store.inner.indexing_status("c1").await, Some(Required));

    // the worker survives and keeps serving requests
    ctx.request("c2", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "c2");
    assert_eq!(ctx.history("c2").await, vec![Running, Required]);

    ctx.shutdown().await;
  }

  /// Test: An unknown signal type fails the pass before the index is touched.
  #[tokio::test]
  async fn test_unknown_signal_type_fails_pass() {
    let mut ctx = CoordinatorTestContext::new();
    ctx
      .store
      .inner
      .insert_signal_set(signal_set_with(1, "odd", &[(1, "integer"), (2, "mystery")]))
      .await;

    ctx.request("odd", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "odd");

    assert_eq!(ctx.history("odd").await, vec![Running, Required]);
    assert!(!ctx.search.inner.index_exists("signal_set_1").await.unwrap());

    ctx.shutdown().await;
  }

  /// Test: A request for a missing signal set is reported and does not wedge the worker.
  #[tokio::test]
  async fn test_missing_signal_set_is_reported() {
    let mut ctx = CoordinatorTestContext::new();
    ctx.seed(1, "weather", 2).await;

    ctx.request("ghost", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "ghost");

    ctx.request("weather", IndexMethod::Full, None).await;
    assert_eq!(ctx.next_finished().await, "weather");
    assert_eq!(ctx.history("weather").await, vec![Running, Ready]);

    ctx.shutdown().await;
  }

  // ==========================================================================
  // Shutdown
  // ==========================================================================

  /// Test: Shutdown interrupts the running pass and waits for its final status.
  #[tokio::test]
  async fn test_shutdown_interrupts_running_pass() {
    let mut ctx = CoordinatorTestContext::gated();
    ctx.seed(1, "a", 3).await;
    ctx.seed(2, "b", 3).await;

    ctx.request("a", IndexMethod::Full, None).await;
    ctx.wait_for_fetch(1).await;
    ctx.request("b", IndexMethod::Full, None).await;
    ctx.handle.shutdown().await.unwrap();

    ctx.store.release();
    tokio::time::timeout(TIMEOUT, &mut ctx.task)
      .await
      .expect("coordinator should stop")
      .unwrap();

    assert_eq!(ctx.next_finished().await, "a");
    assert_eq!(ctx.history("a").await, vec![Running, Required]);
    assert!(ctx.history("b").await.is_empty());
    assert!(ctx.handle.status().await.is_err());
  }
}
