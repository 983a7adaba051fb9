//! Control channel between the parent process and the coordinator.
//!
//! The parent drives the indexer over a pair of byte streams (stdin/stdout
//! in production) carrying newline-delimited JSON:
//!
//! - Inbound: `index`, `cancel-index` and `cancel-all` requests, forwarded to
//!   the coordinator
//! - Outbound: one `started` message when the server comes up, then an
//!   `index` notification per finished pass
//!
//! Malformed lines are logged and skipped. End of input means the parent has
//! gone away, and the server returns.

use futures::{SinkExt, StreamExt};
use ipc::{Inbound, IpcError, Outbound};
use tokio::{
  io::{AsyncRead, AsyncWrite},
  sync::mpsc,
};
use tokio_util::{
  codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError},
  sync::CancellationToken,
};
use tracing::{debug, info, trace, warn};

use crate::actor::{CoordinatorHandle, SendError};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Codec error: {0}")]
  Codec(#[from] LinesCodecError),
  #[error("Encoding error: {0}")]
  Ipc(#[from] IpcError),
  #[error("Coordinator unavailable: {0}")]
  ActorGone(#[from] SendError),
}

pub struct ControlServer {
  handle: CoordinatorHandle,
  outbound: mpsc::Receiver<Outbound>,
}

impl ControlServer {
  /// `outbound` carries the coordinator's notifications.
  pub fn new(handle: CoordinatorHandle, outbound: mpsc::Receiver<Outbound>) -> Self {
    Self { handle, outbound }
  }

  /// Serve until end of input, cancellation, or a broken channel.
  pub async fn run<R, W>(mut self, reader: R, writer: W, cancel: CancellationToken) -> Result<(), ControlError>
  where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
  {
    let mut lines = FramedRead::new(reader, LinesCodec::new());
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    sink.send(Outbound::Started.to_line()?).await?;
    info!("Control channel ready");

    let mut received = 0u64;
    loop {
      tokio::select! {
          biased;

          _ = cancel.cancelled() => {
              info!("Control channel shutting down (cancelled)");
              break;
          }

          Some(message) = self.outbound.recv() => {
              trace!(?message, "Sending notification");
              sink.send(message.to_line()?).await?;
          }

          line = lines.next() => {
              let Some(line) = line else {
                  info!("Control channel closed by parent");
                  break;
              };
              received += 1;
              self.dispatch(&line?).await?;
          }
      }
    }

    // flush whatever finished while we were winding down
    while let Ok(message) = self.outbound.try_recv() {
      sink.send(message.to_line()?).await?;
    }

    debug!(received, "Control channel stopped");
    Ok(())
  }

  async fn dispatch(&self, line: &str) -> Result<(), ControlError> {
    let message = match Inbound::from_line(line) {
      Ok(message) => message,
      Err(IpcError::Empty) => return Ok(()),
      Err(e) => {
        warn!(error = %e, line, "Ignoring malformed control message");
        return Ok(());
      }
    };

    trace!(?message, "Received control message");
    self.handle.dispatch(message).await?;
    Ok(())
  }
}
