//! Scripted directory

use async_lock::RwLock;
use async_trait::async_trait;
use carepass_core::effects::{CapabilitySet, DirectoryEffects};
use carepass_core::{ActorId, CarepassError, OrganizationId, SubjectId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Roster {
    subjects: BTreeSet<SubjectId>,
    organizations: BTreeSet<OrganizationId>,
    capabilities: BTreeMap<(ActorId, OrganizationId), CapabilitySet>,
    unavailable: bool,
}

/// Directory whose contents the test sets up explicitly
#[derive(Debug, Clone, Default)]
pub struct ScriptedDirectory {
    roster: Arc<RwLock<Roster>>,
}

impl ScriptedDirectory {
    /// Empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a patient
    pub async fn add_subject(&self, subject: impl Into<SubjectId>) {
        self.roster.write().await.subjects.insert(subject.into());
    }

    /// Register an organization
    pub async fn add_organization(&self, organization: impl Into<OrganizationId>) {
        self.roster
            .write()
            .await
            .organizations
            .insert(organization.into());
    }

    /// Give `actor` capabilities at `organization`, on top of any it holds
    pub async fn grant_capabilities(
        &self,
        actor: impl Into<ActorId>,
        organization: impl Into<OrganizationId>,
        capabilities: &[&str],
    ) {
        self.roster
            .write()
            .await
            .capabilities
            .entry((actor.into(), organization.into()))
            .or_default()
            .extend(capabilities.iter().map(|c| c.to_string()));
    }

    /// Make every lookup fail until switched back
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.roster.write().await.unavailable = unavailable;
    }

    async fn check_available(&self) -> Result<(), CarepassError> {
        if self.roster.read().await.unavailable {
            Err(CarepassError::internal("directory unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DirectoryEffects for ScriptedDirectory {
    async fn subject_exists(&self, subject: &SubjectId) -> Result<bool, CarepassError> {
        self.check_available().await?;
        Ok(self.roster.read().await.subjects.contains(subject))
    }

    async fn organization_exists(
        &self,
        organization: &OrganizationId,
    ) -> Result<bool, CarepassError> {
        self.check_available().await?;
        Ok(self.roster.read().await.organizations.contains(organization))
    }

    async fn capabilities(
        &self,
        actor: &ActorId,
        organization: &OrganizationId,
    ) -> Result<CapabilitySet, CarepassError> {
        self.check_available().await?;
        Ok(self
            .roster
            .read()
            .await
            .capabilities
            .get(&(actor.clone(), organization.clone()))
            .cloned()
            .unwrap_or_default())
    }
}
