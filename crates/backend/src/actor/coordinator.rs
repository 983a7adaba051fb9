//! Reindex coordinator actor
//!
//! Owns the work queue and the coordinator state. At most one indexing pass
//! runs at a time, process-wide; passes for different signal sets are
//! serialized, newest request first.
//!
//! ```text
//!            command_rx                 done_rx
//!  handle ─────────────► Coordinator ◄──────────── pass task
//!                             │                        ▲
//!                             └── spawn + interrupt ───┘
//! ```
//!
//! Interrupting a pass cancels its token; the pass notices at its next await
//! point, persists `Required` and reports back. Every finished pass is
//! announced on the notification channel.

use std::sync::Arc;

use ipc::{IndexMethod, Outbound};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{
  handle::CoordinatorHandle,
  indexer::{IndexError, IndexPass, PassOutcome, mark_required},
  message::{CoordinatorCommand, CoordinatorState, CoordinatorStatus, IndexJob, PassReport},
  queue::{Enqueued, WorkQueue},
};
use crate::{domain::config::IndexerConfig, search::SearchIndex, store::MetadataStore};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
  /// Rows per batch
  pub batch_size: usize,
  /// Command channel capacity
  pub command_buffer: usize,
}

impl From<&IndexerConfig> for CoordinatorConfig {
  fn from(config: &IndexerConfig) -> Self {
    Self {
      batch_size: config.batch_size,
      command_buffer: config.command_buffer,
    }
  }
}

struct ActivePass {
  job: IndexJob,
  interrupt: CancellationToken,
}

pub struct Coordinator {
  config: CoordinatorConfig,
  store: Arc<dyn MetadataStore>,
  search: Arc<dyn SearchIndex>,
  queue: WorkQueue,
  state: CoordinatorState,
  active: Option<ActivePass>,
  command_rx: mpsc::Receiver<CoordinatorCommand>,
  done_tx: mpsc::Sender<PassReport>,
  done_rx: mpsc::Receiver<PassReport>,
  notify: mpsc::Sender<Outbound>,
  cancel: CancellationToken,
}

impl Coordinator {
  pub fn new(
    config: CoordinatorConfig,
    store: Arc<dyn MetadataStore>,
    search: Arc<dyn SearchIndex>,
    command_rx: mpsc::Receiver<CoordinatorCommand>,
    notify: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
  ) -> Self {
    // one pass at a time, so one report in flight at most
    let (done_tx, done_rx) = mpsc::channel(1);
    Self {
      config,
      store,
      search,
      queue: WorkQueue::new(),
      state: CoordinatorState::Idle,
      active: None,
      command_rx,
      done_tx,
      done_rx,
      notify,
      cancel,
    }
  }

  /// Spawn the actor and return a handle plus its task.
  pub fn spawn(
    config: CoordinatorConfig,
    store: Arc<dyn MetadataStore>,
    search: Arc<dyn SearchIndex>,
    notify: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
  ) -> (CoordinatorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let actor = Self::new(config, store, search, rx, notify, cancel);
    let task = tokio::spawn(actor.run());
    (CoordinatorHandle::new(tx), task)
  }

  /// Main actor loop
  ///
  /// Runs until the cancellation token fires, a `Shutdown` command arrives or
  /// every handle is dropped. A running pass is interrupted and awaited
  /// before returning, so its final status is persisted.
  pub async fn run(mut self) {
    info!(batch_size = self.config.batch_size, "Coordinator started");

    loop {
      tokio::select! {
          biased;

          _ = self.cancel.cancelled() => {
              info!("Coordinator shutting down (cancelled)");
              break;
          }

          Some(report) = self.done_rx.recv() => {
              self.finish_pass(report).await;
          }

          command = self.command_rx.recv() => {
              match command {
                  Some(CoordinatorCommand::Shutdown) => {
                      info!("Coordinator shutting down (requested)");
                      break;
                  }
                  Some(command) => self.handle_command(command),
                  None => {
                      info!("Coordinator shutting down (channel closed)");
                      break;
                  }
              }
          }
      }

      self.start_next();
    }

    self.drain().await;
    info!("Coordinator stopped");
  }

  fn handle_command(&mut self, command: CoordinatorCommand) {
    match command {
      CoordinatorCommand::Index(job) => self.request_index(job),
      CoordinatorCommand::Cancel { cid } => self.cancel_job(&cid),
      CoordinatorCommand::CancelAll => self.cancel_all(),
      CoordinatorCommand::Status { reply } => {
        let _ = reply.send(self.status());
      }
      CoordinatorCommand::Shutdown => {} // Handled in main loop
    }
  }

  // ========================================================================
  // Operations
  // ========================================================================

  fn request_index(&mut self, job: IndexJob) {
    // a full request for the set currently being fully rebuilt restarts it
    let restart = job.method == IndexMethod::Full
      && self
        .active
        .as_ref()
        .is_some_and(|active| active.job.cid == job.cid && active.job.method == IndexMethod::Full);

    let cid = job.cid.clone();
    match self.queue.push(job) {
      Enqueued::Rescheduled => info!(cid, "Rescheduled indexing"),
      Enqueued::Scheduled => {
        info!(cid, "Scheduled indexing");
        if restart {
          info!(cid, "Restarting current indexing");
          self.interrupt();
        }
      }
    }
  }

  fn cancel_job(&mut self, cid: &str) {
    if self.queue.remove(cid) {
      info!(cid, "Unscheduled indexing");
    }

    if self.active.as_ref().is_some_and(|active| active.job.cid == cid) {
      info!(cid, "Cancelling current indexing");
      self.interrupt();
    }
  }

  fn cancel_all(&mut self) {
    if self.queue.is_empty() && self.active.is_none() {
      debug!("Nothing to cancel");
      return;
    }

    let dropped = self.queue.clear();
    info!(dropped, "Cancelling all indexing");
    self.interrupt();
  }

  fn interrupt(&mut self) {
    if let Some(active) = &self.active {
      active.interrupt.cancel();
      self.state = CoordinatorState::Interrupt;
    }
  }

  fn status(&self) -> CoordinatorStatus {
    CoordinatorStatus {
      state: self.state,
      active: self.active.as_ref().map(|active| active.job.clone()),
      queued: self.queue.snapshot(),
    }
  }

  // ========================================================================
  // Worker
  // ========================================================================

  /// Start the next queued job if nothing is running.
  fn start_next(&mut self) {
    if self.active.is_some() {
      return;
    }

    let Some(job) = self.queue.pop() else {
      if self.state != CoordinatorState::Idle {
        info!("Indexing finished");
        self.state = CoordinatorState::Idle;
      }
      return;
    };

    if self.state == CoordinatorState::Idle {
      info!("Indexing started");
    }
    self.state = CoordinatorState::Indexing;

    let interrupt = self.cancel.child_token();
    let pass = IndexPass::new(
      Arc::clone(&self.store),
      Arc::clone(&self.search),
      self.config.batch_size,
      interrupt.clone(),
    );
    let done = self.done_tx.clone();
    let store = Arc::clone(&self.store);
    let pass_job = job.clone();

    tokio::spawn(async move {
      // run in its own task so a panic still produces a report
      let result = match tokio::spawn(pass.run(pass_job.clone())).await {
        Ok(result) => result,
        Err(e) => {
          // the pass died after writing Running
          mark_required(store.as_ref(), &pass_job.cid).await;
          Err(IndexError::Aborted(e.to_string()))
        }
      };
      let _ = done.send(PassReport { job: pass_job, result }).await;
    });

    debug!(cid = %job.cid, queued = self.queue.len(), "Pass spawned");
    self.active = Some(ActivePass { job, interrupt });
  }

  async fn finish_pass(&mut self, report: PassReport) {
    self.active = None;
    let cid = report.job.cid;

    match &report.result {
      Ok(PassOutcome::Completed { records }) => debug!(cid, records, "Pass completed"),
      Ok(PassOutcome::Interrupted { records }) => debug!(cid, records, "Pass interrupted"),
      Err(e) => error!(cid, error = %e, "Indexing failed"),
    }

    if self.notify.send(Outbound::Index { cid }).await.is_err() {
      debug!("Notification channel closed");
    }
  }

  /// Drop queued work and wait for the running pass to wind down.
  async fn drain(&mut self) {
    self.queue.clear();
    if self.active.is_none() {
      return;
    }

    self.interrupt();
    if let Some(report) = self.done_rx.recv().await {
      self.finish_pass(report).await;
    }
    self.state = CoordinatorState::Idle;
  }
}
