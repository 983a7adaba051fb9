//! sigindex - reindex worker for signal sets mirrored into Elasticsearch
//!
//! Spawned by the platform's main process, which drives it over stdin/stdout.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sigindex::{Daemon, RuntimeConfig, config::Config};

mod logging;

#[derive(Parser)]
#[command(name = "sigindex")]
#[command(about = "Reindex worker for signal sets mirrored into Elasticsearch")]
struct Cli {
  /// Config file (default: $CONFIG_DIR/config.toml)
  #[arg(long, env = "SIGINDEX_CONFIG", value_name = "FILE")]
  config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let config = match &cli.config {
    Some(path) => Config::load_from(path),
    None => Config::load(),
  };

  let _guard = logging::init_logging(&config.daemon);

  Daemon::new(RuntimeConfig { config }).run().await?;
  Ok(())
}
