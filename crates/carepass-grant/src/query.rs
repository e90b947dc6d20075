//! Grant listing

use crate::grant::GrantStatus;
use carepass_core::{OrganizationId, SubjectId};
use serde::{Deserialize, Serialize};

/// Filter for [`GrantService::list_grants`](crate::GrantService::list_grants).
///
/// At least one of `subject` or `organization` is required. `status` matches
/// the effective status, so an overdue `ACTIVE` grant is found under `EXPIRED`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantQuery {
    pub subject: Option<SubjectId>,
    pub organization: Option<OrganizationId>,
    pub status: Option<GrantStatus>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl GrantQuery {
    /// Grants about one patient
    pub fn for_subject(subject: SubjectId) -> Self {
        Self {
            subject: Some(subject),
            ..Self::default()
        }
    }

    /// Grants held by one organization
    pub fn for_organization(organization: OrganizationId) -> Self {
        Self {
            organization: Some(organization),
            ..Self::default()
        }
    }

    /// Restrict to an effective status
    pub fn with_status(mut self, status: GrantStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Page window
    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Cut one page out of a full, ordered result set
    pub fn slice(all: Vec<T>, limit: usize, offset: usize) -> Self {
        let total = all.len();
        let items: Vec<T> = all.into_iter().skip(offset).take(limit).collect();
        let has_more = offset.saturating_add(items.len()) < total;
        Self {
            items,
            total,
            limit,
            offset,
            has_more,
        }
    }
}
