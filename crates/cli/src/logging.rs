//! Logging setup for the indexer process

use sigindex::config::DaemonConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "sigindex.log";

/// Parse log level from config string
fn parse_log_level(level: &str) -> tracing::Level {
  match level.to_lowercase().as_str() {
    "off" | "error" => tracing::Level::ERROR,
    "warn" => tracing::Level::WARN,
    "info" => tracing::Level::INFO,
    "debug" => tracing::Level::DEBUG,
    "trace" => tracing::Level::TRACE,
    _ => tracing::Level::INFO,
  }
}

fn init_stderr_logging(env_filter: EnvFilter) {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_ansi(false)
    .with_writer(std::io::stderr)
    .init();
}

/// Initialize logging from the daemon config.
///
/// stdout carries the control channel, so logs go to stderr, or to a rolling
/// file when `log_dir` is set.
///
/// Returns the guard that must be kept alive for the duration of the program
pub fn init_logging(config: &DaemonConfig) -> Option<WorkerGuard> {
  let level = parse_log_level(&config.log_level);

  // Build env filter (allows RUST_LOG override)
  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let Some(log_dir) = &config.log_dir else {
    init_stderr_logging(env_filter);
    return None;
  };

  if std::fs::create_dir_all(log_dir).is_err() {
    // Fall back to stderr logging
    init_stderr_logging(env_filter);
    return None;
  }

  let file_appender = match config.log_rotation.as_str() {
    "hourly" => tracing_appender::rolling::hourly(log_dir, LOG_FILE),
    "never" => tracing_appender::rolling::never(log_dir, LOG_FILE),
    _ => tracing_appender::rolling::daily(log_dir, LOG_FILE),
  };

  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_ansi(false)
    .with_writer(file_writer)
    .init();

  Some(guard)
}
