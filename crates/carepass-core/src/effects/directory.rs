//! Directory interface
//!
//! Patients, organizations and practitioners are owned by the surrounding
//! records system. The consent engine only needs to know whether they exist
//! and which capabilities an actor holds at an organization.

use crate::identifiers::{ActorId, OrganizationId, SubjectId};
use crate::CarepassError;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Capability strings an actor holds at one organization
pub type CapabilitySet = BTreeSet<String>;

/// Lookup of externally owned entities
#[async_trait]
pub trait DirectoryEffects: Send + Sync {
    /// Whether the patient exists
    async fn subject_exists(&self, subject: &SubjectId) -> Result<bool, CarepassError>;

    /// Whether the organization exists
    async fn organization_exists(
        &self,
        organization: &OrganizationId,
    ) -> Result<bool, CarepassError>;

    /// Capabilities the actor holds at the organization; empty when the actor
    /// is unknown or has no membership there
    async fn capabilities(
        &self,
        actor: &ActorId,
        organization: &OrganizationId,
    ) -> Result<CapabilitySet, CarepassError>;
}

#[async_trait]
impl<T: DirectoryEffects + ?Sized> DirectoryEffects for std::sync::Arc<T> {
    async fn subject_exists(&self, subject: &SubjectId) -> Result<bool, CarepassError> {
        (**self).subject_exists(subject).await
    }

    async fn organization_exists(
        &self,
        organization: &OrganizationId,
    ) -> Result<bool, CarepassError> {
        (**self).organization_exists(organization).await
    }

    async fn capabilities(
        &self,
        actor: &ActorId,
        organization: &OrganizationId,
    ) -> Result<CapabilitySet, CarepassError> {
        (**self).capabilities(actor, organization).await
    }
}
