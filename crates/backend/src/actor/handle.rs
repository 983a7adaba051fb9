//! Handle for talking to the coordinator actor
//!
//! Handles are cheap to clone; every method is a message send.

use ipc::{IndexMethod, Inbound};
use tokio::sync::{mpsc, oneshot};

use super::message::{CoordinatorCommand, CoordinatorStatus, IndexJob};

#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
  pub tx: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
  pub fn new(tx: mpsc::Sender<CoordinatorCommand>) -> Self {
    Self { tx }
  }

  async fn send(&self, command: CoordinatorCommand) -> Result<(), SendError> {
    self.tx.send(command).await.map_err(|_| SendError::ActorGone)
  }

  /// Queue (or merge) an indexing request for a signal set
  pub async fn request_index(
    &self,
    cid: impl Into<String>,
    method: IndexMethod,
    from: Option<i64>,
  ) -> Result<(), SendError> {
    self
      .send(CoordinatorCommand::Index(IndexJob::new(cid, method, from)))
      .await
  }

  /// Drop the queued job for `cid`, or interrupt it if it is running
  pub async fn cancel(&self, cid: impl Into<String>) -> Result<(), SendError> {
    self.send(CoordinatorCommand::Cancel { cid: cid.into() }).await
  }

  pub async fn cancel_all(&self) -> Result<(), SendError> {
    self.send(CoordinatorCommand::CancelAll).await
  }

  pub async fn status(&self) -> Result<CoordinatorStatus, SendError> {
    let (reply, rx) = oneshot::channel();
    self.send(CoordinatorCommand::Status { reply }).await?;
    rx.await.map_err(|_| SendError::ActorGone)
  }

  /// Interrupt the running pass and stop the coordinator
  pub async fn shutdown(&self) -> Result<(), SendError> {
    self.send(CoordinatorCommand::Shutdown).await
  }

  /// Forward a control-channel message
  pub async fn dispatch(&self, message: Inbound) -> Result<(), SendError> {
    match message {
      Inbound::Index { cid, method, from } => self.request_index(cid, method, from).await,
      Inbound::CancelIndex { cid } => self.cancel(cid).await,
      Inbound::CancelAll => self.cancel_all().await,
    }
  }
}

/// Error when sending to an actor
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
  #[error("Actor has shut down")]
  ActorGone,
}
