//! Carepass Effects
//!
//! Production implementations of the effect interfaces declared in
//! `carepass-core`:
//!
//! - [`RealTimeHandler`]: the system clock
//! - [`FilesystemStorageHandler`]: one file per record under a data directory
//! - [`StaticDirectoryHandler`]: patients, organizations and capabilities
//!   read from a TOML roster
//!
//! Deterministic handlers for tests live in `carepass-testkit`.

#![forbid(unsafe_code)]

pub mod directory;
pub mod storage;
pub mod time;

pub use directory::{MemberEntry, OrganizationEntry, Roster, StaticDirectoryHandler};
pub use storage::FilesystemStorageHandler;
pub use time::RealTimeHandler;
