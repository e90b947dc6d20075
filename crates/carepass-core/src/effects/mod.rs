//! Effect interfaces
//!
//! Pure trait definitions for the I/O the engine performs. Production handlers
//! live in `carepass-effects`; deterministic mocks live in `carepass-testkit`.

pub mod directory;
pub mod storage;
pub mod time;

pub use directory::{CapabilitySet, DirectoryEffects};
pub use storage::{StorageEffects, StorageError, SwapOutcome};
pub use time::{PhysicalTimeEffects, TimeEffects, TimeError};
