//! Wire types for the control channel between the indexer process and its
//! parent orchestrator.
//!
//! Messages are JSON objects tagged by `type`, one per line.

mod error;
mod message;
mod method;

pub use error::IpcError;
pub use message::{Inbound, Outbound};
pub use method::IndexMethod;
