//! Domain types - signal sets, signals and configuration
//!
//! These types are independent of the stores that persist them and of the
//! control channel.

pub mod config;
pub mod signal;
pub mod signal_set;
