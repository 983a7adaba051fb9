//! Daemon lifecycle management.
//!
//! The daemon wires the collaborators, the coordinator and the control
//! channel together and owns shutdown.
//!
//! # Architecture
//!
//! ```text
//! Daemon (Supervisor)
//!   ├── ControlServer (stdin/stdout, newline-delimited JSON)
//!   └── Coordinator
//!         └── IndexPass (one at a time)
//! ```
//!
//! # Lifecycle
//!
//! 1. Create master `CancellationToken`
//! 2. Connect to Elasticsearch and the metadata database
//! 3. Create the fixed platform indices if missing
//! 4. Spawn the `Coordinator` with a child token
//! 5. Run the control server until the parent closes stdin or ctrl-c
//! 6. Graceful shutdown: interrupt the running pass and wait for its final status

use std::sync::Arc;

use tokio::{
  io::{AsyncRead, AsyncWrite},
  signal,
  sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
  actor::{Coordinator, CoordinatorConfig},
  domain::config::Config,
  search::{ElasticClient, SearchError, SearchIndex, bootstrap},
  server::{ControlError, ControlServer},
  store::{MetadataStore, MySqlStore, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
  #[error("Search backend: {0}")]
  Search(#[from] SearchError),
  #[error("Metadata store: {0}")]
  Store(#[from] StoreError),
  #[error("Control channel: {0}")]
  Control(#[from] ControlError),
}

/// Daemon runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
  pub config: Config,
}

impl RuntimeConfig {
  pub fn load() -> Self {
    Self { config: Config::load() }
  }
}

pub struct Daemon {
  runtime_config: RuntimeConfig,
}

impl Daemon {
  pub fn new(runtime_config: RuntimeConfig) -> Self {
    Self { runtime_config }
  }

  pub fn with_defaults() -> Self {
    Self::new(RuntimeConfig::load())
  }

  /// Run against the configured backends, driven over stdin/stdout.
  ///
  /// Returns once the parent closes stdin or on ctrl-c.
  pub async fn run(self) -> Result<(), DaemonError> {
    info!("Starting signal set indexer");

    let config = &self.runtime_config.config;
    let search = Arc::new(ElasticClient::new(&config.elasticsearch)?);
    let store = Arc::new(MySqlStore::connect(&config.database).await?);

    let cancel = CancellationToken::new();

    // Handle ctrl-c gracefully
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        return;
      }
      info!("Received ctrl-c, shutting down...");
      cancel_for_signal.cancel();
    });

    self
      .serve(store, search, tokio::io::stdin(), tokio::io::stdout(), cancel)
      .await
  }

  /// Run with explicit collaborators and control streams.
  pub async fn serve<R, W>(
    self,
    store: Arc<dyn MetadataStore>,
    search: Arc<dyn SearchIndex>,
    reader: R,
    writer: W,
    cancel: CancellationToken,
  ) -> Result<(), DaemonError>
  where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
  {
    let indexer = &self.runtime_config.config.indexer;

    if indexer.bootstrap_indices {
      let created = bootstrap::ensure_fixed_indices(search.as_ref()).await;
      info!(created, "Fixed indices checked");
    }

    let (notify_tx, notify_rx) = mpsc::channel(indexer.command_buffer.max(1));
    let (handle, coordinator) = Coordinator::spawn(
      CoordinatorConfig::from(indexer),
      store,
      search,
      notify_tx,
      cancel.child_token(),
    );

    let server = ControlServer::new(handle.clone(), notify_rx);
    let result = server.run(reader, writer, cancel.child_token()).await;
    if let Err(e) = &result {
      warn!("Control channel error: {}", e);
    }

    info!("Shutting down...");
    cancel.cancel();

    if let Err(e) = coordinator.await {
      error!("Coordinator task failed: {}", e);
    }

    info!("Indexer shutdown complete");
    Ok(result?)
  }
}
