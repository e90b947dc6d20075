//! Identifier types
//!
//! Records owned by this engine (grants, notification jobs) are keyed by
//! random UUIDs. Entities owned by external collaborators (patients,
//! organizations, practitioners) are referenced by their opaque string ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Authorization grant identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub Uuid);

impl GrantId {
    /// Create a new random grant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GrantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for GrantId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Notification job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an externally assigned identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

external_id!(
    /// Patient (grant subject) identifier
    SubjectId
);

external_id!(
    /// Healthcare organization identifier
    OrganizationId
);

external_id!(
    /// Any authenticated caller acting on a grant: a practitioner, an
    /// organization administrator or the patient themselves
    ActorId
);

impl From<&SubjectId> for ActorId {
    fn from(subject: &SubjectId) -> Self {
        Self(subject.0.clone())
    }
}

impl ActorId {
    /// Whether this actor is the given subject
    pub fn is_subject(&self, subject: &SubjectId) -> bool {
        self.0 == subject.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_id_display_round_trips() {
        let id = GrantId::new();
        let parsed: GrantId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn grant_ids_serialize_as_bare_uuid() {
        let uuid = Uuid::nil();
        let json = serde_json::to_string(&GrantId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn actor_matches_subject_by_id() {
        let subject = SubjectId::new("patient-7");
        assert!(ActorId::from(&subject).is_subject(&subject));
        assert!(!ActorId::new("dr-house").is_subject(&subject));
    }
}
