//! Carepass Grants
//!
//! Time-boxed, scoped authorizations for an organization to read a patient's
//! records.
//!
//! - [`grant`]: the grant record and its pure state machine
//!   (`PENDING -> ACTIVE -> REVOKED`, with `EXPIRED` derived from the clock)
//! - [`guards`]: capability names and checks
//! - [`service`]: [`GrantService`], the only entry point that mutates grants.
//!   It prevents duplicate active grants, queues notifications and writes
//!   the audit trail.
//!
//! # Example
//!
//! ```ignore
//! let created = service.request_grant(request).await?;
//! let outcome = service
//!     .perform_action(created.grant.id, ActionRequest {
//!         action: GrantAction::Approve,
//!         actor: patient,
//!         reason: "Seeing my GP today".into(),
//!     })
//!     .await?;
//! assert_eq!(outcome.new_status, GrantStatus::Active);
//! ```

#![forbid(unsafe_code)]

pub mod audit;
pub mod config;
pub mod error;
pub mod grant;
pub mod guards;
pub mod query;
pub mod scope;
pub mod service;
pub mod store;

pub use audit::{AuditEvent, AuditKind, AuditSink, TracingAuditSink};
pub use config::GrantConfig;
pub use error::GrantError;
pub use grant::{
    transition, Grant, GrantAction, GrantStatus, RequestMetadata, UrgencyLevel,
};
pub use query::{GrantQuery, Page};
pub use scope::{AccessScope, ScopeFlag};
pub use service::{
    ActionOutcome, ActionRequest, GrantCreated, GrantRequest, GrantService, SweepReport,
};
pub use store::GrantStore;
