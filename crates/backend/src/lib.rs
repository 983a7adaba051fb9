pub mod actor;
pub mod search;
pub mod server;
pub mod store;

mod domain;
pub use domain::{config, signal, signal_set};

pub mod dirs;

mod daemon;
pub use daemon::{Daemon, DaemonError, RuntimeConfig};
