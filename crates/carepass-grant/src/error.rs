//! Grant errors
//!
//! Each variant maps to one remediation at the boundary: fix the input,
//! look up the right entity, inspect the blocking grant, obtain a
//! capability, or pick one of the allowed actions.

use crate::grant::{GrantAction, GrantStatus};
use carepass_core::effects::{StorageError, TimeError};
use carepass_core::{CarepassError, GrantId};
use carepass_token::TokenError;

/// Errors raised by grant operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantError {
    /// Malformed input, rejected before any mutation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced grant, subject or organization does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An unexpired active grant already covers this subject and organization
    #[error("An active grant already exists: {existing_grant_id}")]
    Conflict {
        /// The grant blocking the request
        existing_grant_id: GrantId,
    },

    /// The actor lacks a required capability
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// The action is not allowed from the grant's current status
    #[error("Cannot {action} a grant that is {current_status}")]
    GrantAction {
        /// The rejected action
        action: GrantAction,
        /// Effective status at the time of the request
        current_status: GrantStatus,
        /// Actions that would have been accepted
        allowed_actions: Vec<GrantAction>,
    },

    /// Access token issue or verification failed
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Storage, clock, directory or serialization failure
    #[error(transparent)]
    Core(#[from] CarepassError),
}

impl GrantError {
    /// Actions a client may retry with; empty for anything but a rejected action
    pub fn allowed_actions(&self) -> &[GrantAction] {
        match self {
            GrantError::GrantAction {
                allowed_actions, ..
            } => allowed_actions,
            _ => &[],
        }
    }

    /// Status carried by a rejected action
    pub fn current_status(&self) -> Option<GrantStatus> {
        match self {
            GrantError::GrantAction { current_status, .. } => Some(*current_status),
            _ => None,
        }
    }
}

impl From<StorageError> for GrantError {
    fn from(err: StorageError) -> Self {
        GrantError::Core(err.into())
    }
}

impl From<TimeError> for GrantError {
    fn from(err: TimeError) -> Self {
        GrantError::Core(err.into())
    }
}

impl From<serde_json::Error> for GrantError {
    fn from(err: serde_json::Error) -> Self {
        GrantError::Core(err.into())
    }
}
