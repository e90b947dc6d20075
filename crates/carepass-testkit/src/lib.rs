//! Carepass Testkit
//!
//! Deterministic stand-ins for every effect the engine performs, plus
//! recorders for its outbound side effects (push deliveries and audit
//! events). Not for production use.

pub mod audit;
pub mod directory;
pub mod fixtures;
pub mod storage;
pub mod time;
pub mod transport;

pub use audit::{FailingAuditSink, RecordingAuditSink};
pub use directory::ScriptedDirectory;
pub use fixtures::{sample_prescription, test_token_config, T0};
pub use storage::MemoryStorageHandler;
pub use time::ControllableTimeSource;
pub use transport::{FailingTransport, RecordingTransport, StalledTransport};
