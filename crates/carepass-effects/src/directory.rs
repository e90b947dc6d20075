//! Roster-backed directory
//!
//! For deployments where patients, organizations and staff capabilities are
//! exported from the records system as a TOML file:
//!
//! ```toml
//! subjects = ["patient-1", "patient-2"]
//!
//! [[organizations]]
//! id = "org-1"
//!
//! [[organizations.members]]
//! actor = "dr-1"
//! capabilities = ["grant:request", "grant:revoke"]
//! ```

use async_trait::async_trait;
use carepass_core::effects::{CapabilitySet, DirectoryEffects};
use carepass_core::{ActorId, CarepassError, OrganizationId, SubjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// On-disk roster layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Roster {
    /// Known patients
    #[serde(default)]
    pub subjects: Vec<SubjectId>,
    /// Known organizations and their staff
    #[serde(default)]
    pub organizations: Vec<OrganizationEntry>,
}

/// One organization in the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationEntry {
    pub id: OrganizationId,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

/// An actor's capabilities at the enclosing organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberEntry {
    pub actor: ActorId,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Read-only directory built from a [`Roster`]
#[derive(Debug, Clone, Default)]
pub struct StaticDirectoryHandler {
    subjects: BTreeSet<SubjectId>,
    organizations: BTreeSet<OrganizationId>,
    capabilities: BTreeMap<(ActorId, OrganizationId), CapabilitySet>,
}

impl StaticDirectoryHandler {
    /// Index a roster. Repeated members accumulate capabilities.
    pub fn from_roster(roster: Roster) -> Self {
        let mut directory = Self {
            subjects: roster.subjects.into_iter().collect(),
            ..Self::default()
        };
        for organization in roster.organizations {
            for member in organization.members {
                directory
                    .capabilities
                    .entry((member.actor, organization.id.clone()))
                    .or_default()
                    .extend(member.capabilities);
            }
            directory.organizations.insert(organization.id);
        }
        directory
    }

    /// Parse a roster from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, CarepassError> {
        let roster: Roster = toml::from_str(text)
            .map_err(|e| CarepassError::invalid(format!("invalid roster: {e}")))?;
        Ok(Self::from_roster(roster))
    }

    /// Load a roster file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CarepassError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let directory = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            subjects = directory.subjects.len(),
            organizations = directory.organizations.len(),
            "loaded directory roster"
        );
        Ok(directory)
    }
}

#[async_trait]
impl DirectoryEffects for StaticDirectoryHandler {
    async fn subject_exists(&self, subject: &SubjectId) -> Result<bool, CarepassError> {
        Ok(self.subjects.contains(subject))
    }

    async fn organization_exists(
        &self,
        organization: &OrganizationId,
    ) -> Result<bool, CarepassError> {
        Ok(self.organizations.contains(organization))
    }

    async fn capabilities(
        &self,
        actor: &ActorId,
        organization: &OrganizationId,
    ) -> Result<CapabilitySet, CarepassError> {
        Ok(self
            .capabilities
            .get(&(actor.clone(), organization.clone()))
            .cloned()
            .unwrap_or_default())
    }
}
