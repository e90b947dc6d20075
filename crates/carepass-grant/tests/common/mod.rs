//! Shared harness for grant service tests

#![allow(dead_code)]

use carepass_core::{ActorId, OrganizationId, SubjectId};
use carepass_grant::guards::capabilities::*;
use carepass_grant::{
    AccessScope, ActionRequest, GrantAction, GrantConfig, GrantCreated, GrantRequest,
    GrantService, RequestMetadata,
};
use carepass_queue::{NotificationQueue, QueueConfig};
use carepass_testkit::{
    test_token_config, ControllableTimeSource, MemoryStorageHandler, RecordingAuditSink,
    RecordingTransport, ScriptedDirectory, T0,
};
use carepass_token::TokenCodec;
use std::sync::Arc;

pub const PATIENT: &str = "patient-1";
pub const OTHER_PATIENT: &str = "patient-2";
pub const CLINIC: &str = "org-1";
pub const OTHER_CLINIC: &str = "org-2";
pub const DOCTOR: &str = "dr-1";
pub const ADMIN: &str = "admin-1";
pub const NURSE: &str = "nurse-1";

pub struct Harness {
    pub service: GrantService,
    pub clock: ControllableTimeSource,
    pub directory: ScriptedDirectory,
    pub queue: NotificationQueue,
    pub transport: RecordingTransport,
    pub audit: RecordingAuditSink,
}

pub async fn harness() -> Harness {
    harness_with(GrantConfig::default()).await
}

pub async fn harness_with(config: GrantConfig) -> Harness {
    let clock = ControllableTimeSource::new(T0);
    let storage = Arc::new(MemoryStorageHandler::new());
    let directory = ScriptedDirectory::new();
    for subject in [PATIENT, OTHER_PATIENT] {
        directory.add_subject(subject).await;
    }
    for organization in [CLINIC, OTHER_CLINIC] {
        directory.add_organization(organization).await;
    }
    directory
        .grant_capabilities(
            DOCTOR,
            CLINIC,
            &[CAP_GRANT_REQUEST, CAP_GRANT_APPROVE, CAP_GRANT_DENY, CAP_GRANT_REVOKE],
        )
        .await;
    directory
        .grant_capabilities(
            ADMIN,
            CLINIC,
            &[
                CAP_GRANT_REQUEST,
                CAP_GRANT_AUTO_APPROVE,
                CAP_GRANT_DELETE,
                CAP_SCOPE_CREATE_ENCOUNTERS,
            ],
        )
        .await;
    directory
        .grant_capabilities(DOCTOR, OTHER_CLINIC, &[CAP_GRANT_REQUEST])
        .await;

    let transport = RecordingTransport::new();
    let queue = NotificationQueue::new(
        storage.clone(),
        Arc::new(clock.clone()),
        Arc::new(transport.clone()),
        QueueConfig::default(),
    );
    let audit = RecordingAuditSink::new();
    let service = GrantService::new(
        storage,
        Arc::new(directory.clone()),
        Arc::new(clock.clone()),
        queue.clone(),
        Arc::new(TokenCodec::new(test_token_config())),
        config,
    )
    .with_audit_sink(Arc::new(audit.clone()));

    Harness {
        service,
        clock,
        directory,
        queue,
        transport,
        audit,
    }
}

pub fn request(window: u32) -> GrantRequest {
    request_for(PATIENT, CLINIC, window)
}

pub fn request_for(subject: &str, organization: &str, window: u32) -> GrantRequest {
    GrantRequest {
        subject: SubjectId::new(subject),
        organization: OrganizationId::new(organization),
        requesting_practitioner: Some(ActorId::new(DOCTOR)),
        access_scope: AccessScope::default(),
        time_window_hours: window,
        justification: "Follow-up for hypertension review".into(),
        metadata: RequestMetadata::default(),
    }
}

pub fn action(action: GrantAction, actor: &str) -> ActionRequest {
    ActionRequest {
        action,
        actor: ActorId::new(actor),
        reason: "Requested at front desk".into(),
    }
}

impl Harness {
    /// Request and approve a grant as the patient
    pub async fn active_grant(&self, window: u32) -> GrantCreated {
        let created = self.service.request_grant(request(window)).await.unwrap();
        let outcome = self
            .service
            .perform_action(created.grant.id, action(GrantAction::Approve, PATIENT))
            .await
            .unwrap();
        GrantCreated {
            grant: outcome.grant,
            ..created
        }
    }
}
