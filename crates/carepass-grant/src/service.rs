//! Grant orchestrator
//!
//! The only entry point that mutates grants. Each operation validates input,
//! resolves entities and capabilities through the directory, runs the pure
//! state machine, persists once, then queues the notification and emits the
//! audit event.
//!
//! Side effects after the write never undo it: a failed enqueue is logged and
//! reported as a missing job id, and a failed audit write is logged and
//! dropped.

use crate::audit::{AuditEvent, AuditKind, AuditSink, TracingAuditSink};
use crate::config::GrantConfig;
use crate::error::GrantError;
use crate::grant::{transition, Grant, GrantAction, GrantStatus, RequestMetadata};
use crate::guards::{self, capabilities::*};
use crate::query::{GrantQuery, Page};
use crate::scope::{AccessScope, ScopeFlag};
use crate::store::GrantStore;
use carepass_core::effects::{DirectoryEffects, PhysicalTimeEffects, StorageEffects};
use carepass_core::time::{MS_PER_HOUR, MS_PER_SECOND};
use carepass_core::{ActorId, GrantId, JobId, OrganizationId, PhysicalTime, SubjectId};
use carepass_queue::{EnqueueOptions, NotificationQueue, NotificationType, Priority};
use carepass_token::{AccessToken, TokenCodec};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Requests and outcomes
// =============================================================================

/// Inbound grant request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub subject: SubjectId,
    pub organization: OrganizationId,
    #[serde(default)]
    pub requesting_practitioner: Option<ActorId>,
    #[serde(default)]
    pub access_scope: AccessScope,
    pub time_window_hours: u32,
    pub justification: String,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

/// A created grant and the links the requesting side displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantCreated {
    pub grant: Grant,
    pub qr_display_url: String,
    pub scan_url: String,
    /// `None` when the access-request notification could not be queued
    pub notification_job: Option<JobId>,
}

/// Inbound grant action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: GrantAction,
    #[serde(rename = "actionBy")]
    pub actor: ActorId,
    pub reason: String,
}

/// Result of an accepted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub grant: Grant,
    pub action: GrantAction,
    pub previous_status: GrantStatus,
    pub new_status: GrantStatus,
    pub notification_job: Option<JobId>,
}

/// Result of a maintenance sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Grants the sweep selected
    pub examined: usize,
    /// Grants written back
    pub updated: usize,
    pub notifications_queued: usize,
}

// =============================================================================
// Grant Service
// =============================================================================

/// Coordinates grant requests, actions, queries and sweeps
pub struct GrantService {
    store: GrantStore,
    directory: Arc<dyn DirectoryEffects>,
    time: Arc<dyn PhysicalTimeEffects>,
    queue: NotificationQueue,
    codec: Arc<TokenCodec>,
    audit: Arc<dyn AuditSink>,
    config: GrantConfig,
}

impl GrantService {
    /// Create a service that audits to the log
    pub fn new(
        storage: Arc<dyn StorageEffects>,
        directory: Arc<dyn DirectoryEffects>,
        time: Arc<dyn PhysicalTimeEffects>,
        queue: NotificationQueue,
        codec: Arc<TokenCodec>,
        config: GrantConfig,
    ) -> Self {
        Self {
            store: GrantStore::new(storage),
            directory,
            time,
            queue,
            codec,
            audit: Arc::new(TracingAuditSink),
            config,
        }
    }

    /// Replace the audit sink
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Service configuration
    pub fn config(&self) -> &GrantConfig {
        &self.config
    }

    // =========================================================================
    // Request
    // =========================================================================

    /// Create a grant for (subject, organization)
    pub async fn request_grant(&self, request: GrantRequest) -> Result<GrantCreated, GrantError> {
        self.validate_request(&request)?;

        if !self.directory.subject_exists(&request.subject).await? {
            return Err(GrantError::NotFound(format!("subject {}", request.subject)));
        }
        if !self
            .directory
            .organization_exists(&request.organization)
            .await?
        {
            return Err(GrantError::NotFound(format!(
                "organization {}",
                request.organization
            )));
        }

        let auto_approve = request.metadata.auto_approve;
        match &request.requesting_practitioner {
            Some(practitioner) => {
                let held = self
                    .directory
                    .capabilities(practitioner, &request.organization)
                    .await?;
                guards::check_request(practitioner, &held, &request.access_scope)?;
                if auto_approve && self.config.auto_approve_requires_capability {
                    guards::check_capability(practitioner, &held, CAP_GRANT_AUTO_APPROVE)?;
                }
            }
            None if auto_approve && self.config.auto_approve_requires_capability => {
                return Err(GrantError::Authorization(format!(
                    "auto-approval requires a requesting practitioner holding '{CAP_GRANT_AUTO_APPROVE}'"
                )));
            }
            None => {}
        }

        let now = self.now().await?;
        if let Some(existing) = self
            .find_blocking(&request.subject, &request.organization, now)
            .await?
        {
            tracing::info!(
                existing_grant_id = %existing.id,
                subject = %request.subject,
                organization = %request.organization,
                "grant request conflicts with an active grant"
            );
            return Err(GrantError::Conflict {
                existing_grant_id: existing.id,
            });
        }

        let window = request.time_window_hours;
        let grant = Grant {
            id: GrantId::new(),
            subject: request.subject,
            organization: request.organization,
            requesting_practitioner: request.requesting_practitioner,
            status: if auto_approve {
                GrantStatus::Active
            } else {
                GrantStatus::Pending
            },
            access_scope: request.access_scope,
            time_window_hours: window,
            justification: request.justification.trim().to_string(),
            metadata: request.metadata,
            created_at: now.ts_ms,
            updated_at: now.ts_ms,
            expires_at: now.plus_hours(u64::from(window)).ts_ms,
            granted_at: auto_approve.then_some(now.ts_ms),
            revoked_at: None,
            deleted_at: None,
            reminder_sent_at: None,
            status_reason: None,
            last_action_by: None,
        };
        self.store.save(&grant).await?;

        tracing::info!(
            grant_id = %grant.id,
            subject = %grant.subject,
            organization = %grant.organization,
            status = %grant.status,
            time_window_hours = window,
            "grant requested"
        );

        let priority = if window <= self.config.urgent_window_hours {
            Priority::Urgent
        } else {
            Priority::High
        };
        let notification_job = self
            .notify(
                NotificationType::AuthorizationRequest,
                &grant,
                json!({
                    "grantId": grant.id,
                    "organizationId": grant.organization,
                    "requestingPractitionerId": grant.requesting_practitioner,
                    "timeWindowHours": window,
                    "justification": grant.justification,
                    "expiresAt": grant.expires_at,
                    "autoApproved": auto_approve,
                }),
                EnqueueOptions::with_priority(priority)
                    .expires_in_hours(self.config.request_notification_ttl_hours),
            )
            .await;

        self.record_audit(
            AuditKind::Requested,
            &grant,
            grant.requesting_practitioner.clone(),
            now,
            json!({
                "timeWindowHours": window,
                "accessScope": grant.access_scope.flags(),
                "autoApproved": auto_approve,
            }),
        )
        .await;

        Ok(GrantCreated {
            qr_display_url: self.qr_display_url(grant.id),
            scan_url: self.scan_url(grant.id),
            grant,
            notification_job,
        })
    }

    fn validate_request(&self, request: &GrantRequest) -> Result<(), GrantError> {
        let (min, max) = (
            self.config.min_time_window_hours,
            self.config.max_time_window_hours,
        );
        if !(min..=max).contains(&request.time_window_hours) {
            return Err(GrantError::Validation(format!(
                "timeWindowHours must be between {min} and {max}, got {}",
                request.time_window_hours
            )));
        }
        if request.justification.trim().chars().count() < self.config.min_justification_len {
            return Err(GrantError::Validation(format!(
                "justification must be at least {} characters",
                self.config.min_justification_len
            )));
        }
        if request.access_scope.is_empty() {
            return Err(GrantError::Validation(
                "accessScope must grant at least one permission".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_blocking(
        &self,
        subject: &SubjectId,
        organization: &OrganizationId,
        now: PhysicalTime,
    ) -> Result<Option<Grant>, GrantError> {
        let blocking = self
            .store
            .scan(|g| {
                &g.subject == subject && &g.organization == organization && g.blocks_new_request(now)
            })
            .await?;
        Ok(blocking.into_iter().next())
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Approve, deny or revoke a grant
    pub async fn perform_action(
        &self,
        grant_id: GrantId,
        request: ActionRequest,
    ) -> Result<ActionOutcome, GrantError> {
        let reason = request.reason.trim();
        if reason.chars().count() < self.config.min_reason_len {
            return Err(GrantError::Validation(format!(
                "reason must be at least {} characters",
                self.config.min_reason_len
            )));
        }

        let grant = self.load_live(grant_id).await?;
        self.authorize(
            &request.actor,
            &grant,
            guards::required_capability(request.action),
        )
        .await?;

        let now = self.now().await?;
        let previous_status = grant.effective_status(now);
        let updated = transition(&grant, request.action, &request.actor, Some(reason), now)
            .map_err(|e| {
                tracing::info!(%grant_id, action = %request.action, error = %e, "grant action rejected");
                e
            })?;
        self.store.save(&updated).await?;

        tracing::info!(
            %grant_id,
            action = %request.action,
            actor = %request.actor,
            from = %previous_status,
            to = %updated.status,
            "grant status changed"
        );

        let notification_job = self
            .notify(
                NotificationType::StatusUpdate,
                &updated,
                json!({
                    "grantId": updated.id,
                    "organizationId": updated.organization,
                    "status": request.action.outcome_label(),
                    "reason": reason,
                }),
                EnqueueOptions::with_priority(Priority::Normal)
                    .expires_in_hours(self.config.status_notification_ttl_hours),
            )
            .await;

        let kind = match request.action {
            GrantAction::Approve => AuditKind::Approved,
            GrantAction::Deny => AuditKind::Denied,
            GrantAction::Revoke => AuditKind::Revoked,
        };
        self.record_audit(
            kind,
            &updated,
            Some(request.actor.clone()),
            now,
            json!({ "reason": reason, "previousStatus": previous_status }),
        )
        .await;

        Ok(ActionOutcome {
            new_status: updated.status,
            grant: updated,
            action: request.action,
            previous_status,
            notification_job,
        })
    }

    /// Soft-delete a grant. Deleted grants deny every permission and vanish
    /// from queries.
    pub async fn delete_grant(&self, grant_id: GrantId, actor: &ActorId) -> Result<Grant, GrantError> {
        let mut grant = self.load_live(grant_id).await?;
        self.authorize(actor, &grant, CAP_GRANT_DELETE).await?;

        let now = self.now().await?;
        grant.deleted_at = Some(now.ts_ms);
        grant.updated_at = now.ts_ms;
        grant.last_action_by = Some(actor.clone());
        self.store.save(&grant).await?;

        tracing::info!(%grant_id, %actor, "grant deleted");
        self.record_audit(AuditKind::Deleted, &grant, Some(actor.clone()), now, json!({}))
            .await;
        Ok(grant)
    }

    async fn authorize(
        &self,
        actor: &ActorId,
        grant: &Grant,
        required: &str,
    ) -> Result<(), GrantError> {
        if actor.is_subject(&grant.subject) {
            return Ok(());
        }
        let held = self
            .directory
            .capabilities(actor, &grant.organization)
            .await?;
        guards::check_capability(actor, &held, required)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Load one grant that has not been deleted
    pub async fn get_grant(&self, grant_id: GrantId) -> Result<Grant, GrantError> {
        self.load_live(grant_id).await
    }

    async fn load_live(&self, grant_id: GrantId) -> Result<Grant, GrantError> {
        match self.store.load(grant_id).await? {
            Some(grant) if !grant.is_deleted() => Ok(grant),
            _ => Err(GrantError::NotFound(format!("grant {grant_id}"))),
        }
    }

    /// Grants by subject or organization, newest first
    pub async fn list_grants(&self, query: &GrantQuery) -> Result<Page<Grant>, GrantError> {
        if query.subject.is_none() && query.organization.is_none() {
            return Err(GrantError::Validation(
                "a subject or an organization is required".to_string(),
            ));
        }
        let limit = query.limit.unwrap_or(self.config.default_page_size);
        if limit == 0 {
            return Err(GrantError::Validation("limit must be positive".to_string()));
        }
        let limit = limit.min(self.config.max_page_size);

        let now = self.now().await?;
        let mut grants = self
            .store
            .scan(|g| {
                !g.is_deleted()
                    && query.subject.as_ref().map_or(true, |s| &g.subject == s)
                    && query
                        .organization
                        .as_ref()
                        .map_or(true, |o| &g.organization == o)
                    && query
                        .status
                        .map_or(true, |status| g.effective_status(now) == status)
            })
            .await?;
        grants.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(Page::slice(grants, limit, query.offset))
    }

    // =========================================================================
    // Scan sessions
    // =========================================================================

    /// Issue an access token for a live grant. The token never outlives the
    /// grant.
    pub async fn open_scan_session(
        &self,
        grant_id: GrantId,
        digital_identifier: &str,
        ttl_secs: Option<u64>,
    ) -> Result<AccessToken, GrantError> {
        let grant = self.load_live(grant_id).await?;
        let now = self.now().await?;

        let status = grant.effective_status(now);
        let remaining_secs = grant.expires_at.saturating_sub(now.ts_ms) / MS_PER_SECOND;
        if status != GrantStatus::Active || remaining_secs == 0 {
            return Err(GrantError::Authorization(format!(
                "grant {grant_id} is {status}, not active"
            )));
        }

        let requested = ttl_secs.unwrap_or(self.codec.config().default_access_ttl_secs);
        let token = self.codec.issue_access_token(
            digital_identifier,
            grant.id,
            Some(requested.min(remaining_secs)),
            now,
        )?;

        tracing::info!(%grant_id, expires_at = token.expires_at, "scan session opened");
        self.record_audit(
            AuditKind::ScanSessionOpened,
            &grant,
            None,
            now,
            json!({ "expiresAt": token.expires_at }),
        )
        .await;
        Ok(token)
    }

    /// Verify an access token and check its grant still allows `scope`
    pub async fn check_access(&self, token: &str, scope: ScopeFlag) -> Result<Grant, GrantError> {
        let now = self.now().await?;
        let claims = self.codec.verify_access_token(token, now)?;
        let grant = self.load_live(claims.grant_id).await?;
        if !grant.has_permission(scope, now) {
            return Err(GrantError::Authorization(format!(
                "grant {} does not allow {scope}",
                grant.id
            )));
        }
        Ok(grant)
    }

    // =========================================================================
    // Maintenance sweeps
    // =========================================================================

    /// Write `EXPIRED` onto every overdue pending or active grant and tell its
    /// subject
    pub async fn expire_overdue(&self) -> Result<SweepReport, GrantError> {
        let now = self.now().await?;
        let overdue = self
            .store
            .scan(|g| {
                !g.is_deleted()
                    && matches!(g.status, GrantStatus::Pending | GrantStatus::Active)
                    && g.is_expired(now)
            })
            .await?;

        let mut report = SweepReport {
            examined: overdue.len(),
            ..SweepReport::default()
        };
        for mut grant in overdue {
            grant.status = GrantStatus::Expired;
            grant.updated_at = now.ts_ms;
            self.store.save(&grant).await?;
            report.updated += 1;

            let job = self
                .notify(
                    NotificationType::StatusUpdate,
                    &grant,
                    json!({
                        "grantId": grant.id,
                        "organizationId": grant.organization,
                        "status": "expired",
                    }),
                    EnqueueOptions::with_priority(Priority::Normal)
                        .expires_in_hours(self.config.status_notification_ttl_hours),
                )
                .await;
            if job.is_some() {
                report.notifications_queued += 1;
            }
            self.record_audit(AuditKind::Expired, &grant, None, now, json!({}))
                .await;
        }

        tracing::info!(expired = report.updated, "expiry sweep finished");
        Ok(report)
    }

    /// Queue one reminder per active grant entering its final lead time
    pub async fn send_expiry_reminders(&self) -> Result<SweepReport, GrantError> {
        let now = self.now().await?;
        let lead_ms = self
            .config
            .reminder_lead_time_hours
            .saturating_mul(MS_PER_HOUR);
        let due = self
            .store
            .scan(|g| {
                !g.is_deleted()
                    && g.reminder_sent_at.is_none()
                    && g.effective_status(now) == GrantStatus::Active
                    && g.expires_at.saturating_sub(now.ts_ms) <= lead_ms
            })
            .await?;

        let mut report = SweepReport {
            examined: due.len(),
            ..SweepReport::default()
        };
        for mut grant in due {
            let remaining_ms = grant.expires_at.saturating_sub(now.ts_ms);
            let ttl_hours = remaining_ms.div_ceil(MS_PER_HOUR).max(1);
            let job = self
                .notify(
                    NotificationType::Reminder,
                    &grant,
                    json!({
                        "grantId": grant.id,
                        "organizationId": grant.organization,
                        "expiresAt": grant.expires_at,
                    }),
                    EnqueueOptions::with_priority(Priority::Normal).expires_in_hours(ttl_hours),
                )
                .await;
            if job.is_none() {
                continue;
            }
            report.notifications_queued += 1;

            grant.reminder_sent_at = Some(now.ts_ms);
            self.store.save(&grant).await?;
            report.updated += 1;
        }

        tracing::info!(reminded = report.updated, "reminder sweep finished");
        Ok(report)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn now(&self) -> Result<PhysicalTime, GrantError> {
        Ok(self.time.physical_time().await?)
    }

    async fn notify(
        &self,
        kind: NotificationType,
        grant: &Grant,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Option<JobId> {
        match self.queue.enqueue(kind, &grant.subject, payload, options).await {
            Ok(job) => Some(job.id),
            Err(e) => {
                tracing::error!(
                    grant_id = %grant.id,
                    notification_type = %kind,
                    error = %e,
                    "failed to queue grant notification"
                );
                None
            }
        }
    }

    async fn record_audit(
        &self,
        kind: AuditKind,
        grant: &Grant,
        actor: Option<ActorId>,
        now: PhysicalTime,
        details: serde_json::Value,
    ) {
        let event = AuditEvent {
            kind,
            grant_id: grant.id,
            subject: grant.subject.clone(),
            organization: grant.organization.clone(),
            actor,
            timestamp: now.ts_ms,
            details,
        };
        if let Err(e) = self.audit.record(&event).await {
            tracing::warn!(grant_id = %grant.id, kind = ?kind, error = %e, "audit sink failed");
        }
    }

    fn base_url(&self) -> &str {
        self.config.public_base_url.trim_end_matches('/')
    }

    fn qr_display_url(&self, grant_id: GrantId) -> String {
        format!("{}/authorization/{grant_id}/qr", self.base_url())
    }

    fn scan_url(&self, grant_id: GrantId) -> String {
        format!("{}/scan/{grant_id}", self.base_url())
    }
}
