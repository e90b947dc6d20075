//! Carepass CLI
//!
//! Operator commands over the consent engine. Intended to be run from cron
//! or by hand: dispatch queued notifications, run the grant expiry and
//! reminder sweeps, and issue or inspect tokens.

#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod context;

pub use config::{CarepassConfig, StorageConfig};
pub use context::Engine;
