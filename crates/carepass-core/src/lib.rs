//! Carepass Core
//!
//! Shared vocabulary for the consent engine: identifiers, the unified error
//! type, wall-clock time values, configuration validation and the effect
//! interfaces (time, record storage, directory) that every I/O path goes
//! through.
//!
//! This crate performs no I/O. Production effect handlers live in
//! `carepass-effects` and deterministic test handlers in `carepass-testkit`.

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod secret;
pub mod time;

pub use config::{ConfigValidation, ConfigValidator, ValidationError, ValidationResult};
pub use errors::{CarepassError, Result};
pub use identifiers::{ActorId, GrantId, JobId, OrganizationId, SubjectId};
pub use secret::SigningSecret;
pub use time::PhysicalTime;
