//! Actor-based reindex coordination
//!
//! The coordinator owns the work queue and the coordinator state; nothing is
//! shared behind a lock. Callers talk to it through a [`CoordinatorHandle`],
//! and each indexing pass runs as its own task that reports back over a
//! channel.
//!
//! # Actors
//!
//! - [`Coordinator`]: serializes passes process-wide, newest request first,
//!   and handles cancel and forced restarts
//! - [`IndexPass`]: one pass over one signal set, interruptible through its
//!   cancellation token
//!
//! ```text
//! ControlServer ──► CoordinatorHandle ──► Coordinator ──► IndexPass
//!       ▲                                      │
//!       └──────────── Outbound::Index ─────────┘
//! ```

mod coordinator;
pub mod handle;
pub mod indexer;
pub mod message;
mod queue;


pub use coordinator::{Coordinator, CoordinatorConfig};
pub use handle::{CoordinatorHandle, SendError};
pub use indexer::{IndexError, IndexPass, PassOutcome};
pub use message::{CoordinatorState, CoordinatorStatus, IndexJob};
