//! Grant request and action flows through the service

mod common;

use assert_matches::assert_matches;
use carepass_core::time::MS_PER_HOUR;
use carepass_core::{ActorId, SubjectId};
use carepass_grant::{
    AccessScope, AuditKind, GrantAction, GrantConfig, GrantError, GrantQuery, GrantStatus,
    ScopeFlag,
};
use carepass_queue::{JobStatus, NotificationType, Priority};
use carepass_testkit::{FailingAuditSink, T0};
use common::*;
use proptest::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn request_approve_revoke_scenario() {
    let h = harness().await;

    let created = h.service.request_grant(request(24)).await.unwrap();
    let grant = &created.grant;
    assert_eq!(grant.status, GrantStatus::Pending);
    assert_eq!(grant.expires_at, T0 + 24 * MS_PER_HOUR);
    assert_eq!(grant.granted_at, None);
    assert!(created.qr_display_url.contains(&grant.id.to_string()));
    assert!(created.scan_url.starts_with("http://localhost:3000/scan/"));

    let job = h.queue.job(created.notification_job.unwrap()).await.unwrap();
    assert_eq!(job.notification_type, NotificationType::AuthorizationRequest);
    assert_eq!(job.priority, Priority::High);
    assert_eq!(job.expires_at, T0 + 48 * MS_PER_HOUR);
    assert_eq!(job.subject, SubjectId::new(PATIENT));

    h.clock.advance_hours(1);
    let approved = h
        .service
        .perform_action(grant.id, action(GrantAction::Approve, PATIENT))
        .await
        .unwrap();
    assert_eq!(approved.previous_status, GrantStatus::Pending);
    assert_eq!(approved.new_status, GrantStatus::Active);
    assert_eq!(approved.grant.granted_at, Some(T0 + MS_PER_HOUR));

    let update = h.queue.job(approved.notification_job.unwrap()).await.unwrap();
    assert_eq!(update.notification_type, NotificationType::StatusUpdate);
    assert_eq!(update.priority, Priority::Normal);
    assert_eq!(update.payload["status"], "approved");
    assert_eq!(update.expires_at, T0 + 25 * MS_PER_HOUR);

    let revoked = h
        .service
        .perform_action(grant.id, action(GrantAction::Revoke, DOCTOR))
        .await
        .unwrap();
    assert_eq!(revoked.new_status, GrantStatus::Revoked);
    assert_eq!(revoked.grant.revoked_at, Some(T0 + MS_PER_HOUR));
    assert_eq!(revoked.grant.status_reason.as_deref(), Some("Requested at front desk"));

    let err = h
        .service
        .perform_action(grant.id, action(GrantAction::Revoke, DOCTOR))
        .await
        .unwrap_err();
    assert_matches!(err, GrantError::GrantAction { current_status: GrantStatus::Revoked, .. });
    assert!(err.allowed_actions().is_empty());

    assert_eq!(
        h.audit.kinds().await,
        vec![AuditKind::Requested, AuditKind::Approved, AuditKind::Revoked]
    );
}

#[tokio::test]
async fn approving_twice_reports_allowed_actions() {
    let h = harness().await;
    let created = h.active_grant(8).await;

    let err = h
        .service
        .perform_action(created.grant.id, action(GrantAction::Approve, PATIENT))
        .await
        .unwrap_err();
    assert_eq!(err.current_status(), Some(GrantStatus::Active));
    assert_eq!(err.allowed_actions(), &[GrantAction::Revoke]);
}

#[tokio::test]
async fn deny_closes_a_pending_grant() {
    let h = harness().await;
    let created = h.service.request_grant(request(4)).await.unwrap();
    let denied = h
        .service
        .perform_action(created.grant.id, action(GrantAction::Deny, PATIENT))
        .await
        .unwrap();
    assert_eq!(denied.new_status, GrantStatus::Revoked);
    let job = h.queue.job(denied.notification_job.unwrap()).await.unwrap();
    assert_eq!(job.payload["status"], "denied");
}

#[tokio::test]
async fn window_bounds_are_enforced_before_persistence() {
    let h = harness().await;

    for window in [0, 169, 200] {
        let err = h.service.request_grant(request(window)).await.unwrap_err();
        assert_matches!(err, GrantError::Validation(_));
    }
    let page = h
        .service
        .list_grants(&GrantQuery::for_subject(SubjectId::new(PATIENT)))
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(h.queue.stats().await.unwrap().total, 0);

    let week = h.service.request_grant(request(168)).await.unwrap();
    assert_eq!(week.grant.expires_at, T0 + 168 * MS_PER_HOUR);
}

#[tokio::test]
async fn short_justification_and_reason_are_rejected() {
    let h = harness().await;
    let mut short = request(4);
    short.justification = "checkup".into();
    assert_matches!(
        h.service.request_grant(short).await,
        Err(GrantError::Validation(_))
    );

    let mut empty_scope = request(4);
    empty_scope.access_scope = AccessScope::none();
    assert_matches!(
        h.service.request_grant(empty_scope).await,
        Err(GrantError::Validation(_))
    );

    let created = h.service.request_grant(request(4)).await.unwrap();
    let mut terse = action(GrantAction::Approve, PATIENT);
    terse.reason = "ok".into();
    assert_matches!(
        h.service.perform_action(created.grant.id, terse).await,
        Err(GrantError::Validation(_))
    );
}

#[tokio::test]
async fn short_windows_are_urgent() {
    let h = harness().await;
    let urgent = h.service.request_grant(request(2)).await.unwrap();
    let job = h.queue.job(urgent.notification_job.unwrap()).await.unwrap();
    assert_eq!(job.priority, Priority::Urgent);

    let other = h
        .service
        .request_grant(request_for(OTHER_PATIENT, CLINIC, 3))
        .await
        .unwrap();
    let job = h.queue.job(other.notification_job.unwrap()).await.unwrap();
    assert_eq!(job.priority, Priority::High);
}

#[tokio::test]
async fn unknown_entities_are_not_found() {
    let h = harness().await;
    assert_matches!(
        h.service.request_grant(request_for("ghost", CLINIC, 4)).await,
        Err(GrantError::NotFound(_))
    );
    assert_matches!(
        h.service.request_grant(request_for(PATIENT, "org-404", 4)).await,
        Err(GrantError::NotFound(_))
    );
    assert_matches!(
        h.service
            .perform_action(carepass_core::GrantId::new(), action(GrantAction::Approve, PATIENT))
            .await,
        Err(GrantError::NotFound(_))
    );
}

#[tokio::test]
async fn second_request_conflicts_while_active() {
    let h = harness().await;
    let first = h.active_grant(24).await;

    let err = h.service.request_grant(request(24)).await.unwrap_err();
    assert_matches!(err, GrantError::Conflict { existing_grant_id } if existing_grant_id == first.grant.id);

    // Other organizations and other patients are unaffected.
    assert!(h
        .service
        .request_grant(request_for(PATIENT, OTHER_CLINIC, 24))
        .await
        .is_ok());
    assert!(h
        .service
        .request_grant(request_for(OTHER_PATIENT, CLINIC, 24))
        .await
        .is_ok());

    h.service
        .perform_action(first.grant.id, action(GrantAction::Revoke, PATIENT))
        .await
        .unwrap();
    assert!(h.service.request_grant(request(24)).await.is_ok());
}

#[tokio::test]
async fn pending_or_lapsed_grants_do_not_conflict() {
    let h = harness().await;
    h.service.request_grant(request(4)).await.unwrap();
    assert!(h.service.request_grant(request(4)).await.is_ok());

    let h = harness().await;
    let active = h.active_grant(1).await;
    h.clock.set_time(active.grant.expires_at + 1);
    assert!(h.service.request_grant(request(1)).await.is_ok());
}

#[tokio::test]
async fn practitioner_capabilities_are_checked() {
    let h = harness().await;

    let mut by_nurse = request(4);
    by_nurse.requesting_practitioner = Some(ActorId::new(NURSE));
    assert_matches!(
        h.service.request_grant(by_nurse).await,
        Err(GrantError::Authorization(_))
    );

    let mut write_scope = request(4);
    write_scope.access_scope =
        AccessScope::from_flags(&[ScopeFlag::ViewHistory, ScopeFlag::CreateEncounters]);
    assert_matches!(
        h.service.request_grant(write_scope.clone()).await,
        Err(GrantError::Authorization(_))
    );

    write_scope.requesting_practitioner = Some(ActorId::new(ADMIN));
    let created = h.service.request_grant(write_scope).await.unwrap();
    assert!(created.grant.access_scope.can_create_encounters);

    assert_matches!(
        h.service
            .perform_action(created.grant.id, action(GrantAction::Approve, NURSE))
            .await,
        Err(GrantError::Authorization(_))
    );
    assert!(h
        .service
        .perform_action(created.grant.id, action(GrantAction::Approve, DOCTOR))
        .await
        .is_ok());
}

#[tokio::test]
async fn auto_approve_needs_its_own_capability() {
    let h = harness().await;

    let mut anonymous = request(4);
    anonymous.requesting_practitioner = None;
    anonymous.metadata.auto_approve = true;
    assert_matches!(
        h.service.request_grant(anonymous).await,
        Err(GrantError::Authorization(_))
    );

    let mut by_doctor = request(4);
    by_doctor.metadata.auto_approve = true;
    assert_matches!(
        h.service.request_grant(by_doctor).await,
        Err(GrantError::Authorization(_))
    );

    let mut by_admin = request(4);
    by_admin.requesting_practitioner = Some(ActorId::new(ADMIN));
    by_admin.metadata.auto_approve = true;
    let created = h.service.request_grant(by_admin).await.unwrap();
    assert_eq!(created.grant.status, GrantStatus::Active);
    assert_eq!(created.grant.granted_at, Some(T0));
    assert_eq!(created.grant.expires_at, T0 + 4 * MS_PER_HOUR);
}

#[tokio::test]
async fn auto_approve_capability_can_be_waived() {
    let h = harness_with(GrantConfig {
        auto_approve_requires_capability: false,
        ..GrantConfig::default()
    })
    .await;
    let mut anonymous = request(4);
    anonymous.requesting_practitioner = None;
    anonymous.metadata.auto_approve = true;
    let created = h.service.request_grant(anonymous).await.unwrap();
    assert_eq!(created.grant.status, GrantStatus::Active);
}

#[tokio::test]
async fn overdue_grants_deny_then_sweep_to_expired() {
    let h = harness().await;
    let active = h.active_grant(2).await;
    let pending = h
        .service
        .request_grant(request_for(OTHER_PATIENT, CLINIC, 1))
        .await
        .unwrap();

    h.clock.set_time(active.grant.expires_at + 1);
    let stale = h.service.get_grant(active.grant.id).await.unwrap();
    assert_eq!(stale.status, GrantStatus::Active);
    assert!(!stale.has_permission(ScopeFlag::ViewHistory, h.clock.now()));

    let err = h
        .service
        .perform_action(pending.grant.id, action(GrantAction::Approve, OTHER_PATIENT))
        .await
        .unwrap_err();
    assert_eq!(err.current_status(), Some(GrantStatus::Expired));

    let report = h.service.expire_overdue().await.unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.notifications_queued, 2);
    assert_eq!(
        h.service.get_grant(active.grant.id).await.unwrap().status,
        GrantStatus::Expired
    );
    assert_eq!(h.service.expire_overdue().await.unwrap().examined, 0);

    let expired_page = h
        .service
        .list_grants(&GrantQuery::for_organization(CLINIC.into()).with_status(GrantStatus::Expired))
        .await
        .unwrap();
    assert_eq!(expired_page.total, 2);
}

#[tokio::test]
async fn reminders_are_sent_once_inside_the_lead_time() {
    let h = harness().await;
    let active = h.active_grant(6).await;

    assert_eq!(h.service.send_expiry_reminders().await.unwrap().updated, 0);

    h.clock.advance_hours(5);
    let report = h.service.send_expiry_reminders().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.notifications_queued, 1);
    let reminded = h.service.get_grant(active.grant.id).await.unwrap();
    assert_eq!(reminded.reminder_sent_at, Some(h.clock.now().ts_ms));

    assert_eq!(h.service.send_expiry_reminders().await.unwrap().examined, 0);
    assert_eq!(
        h.queue
            .stats()
            .await
            .unwrap()
            .by_type
            .get(&NotificationType::Reminder),
        Some(&1)
    );
}

#[tokio::test]
async fn queries_page_newest_first_and_filter_by_effective_status() {
    let h = harness().await;
    let mut ids = Vec::new();
    for organization in [CLINIC, OTHER_CLINIC] {
        let created = h
            .service
            .request_grant(request_for(PATIENT, organization, 4))
            .await
            .unwrap();
        ids.push(created.grant.id);
        h.clock.advance_ms(1_000);
    }
    let other = h
        .service
        .request_grant(request_for(OTHER_PATIENT, CLINIC, 4))
        .await
        .unwrap();

    let mine = h
        .service
        .list_grants(&GrantQuery::for_subject(PATIENT.into()).page(1, 0))
        .await
        .unwrap();
    assert_eq!(mine.total, 2);
    assert_eq!(mine.items[0].id, ids[1]);
    assert!(mine.has_more);

    let second = h
        .service
        .list_grants(&GrantQuery::for_subject(PATIENT.into()).page(1, 1))
        .await
        .unwrap();
    assert_eq!(second.items[0].id, ids[0]);
    assert!(!second.has_more);

    let clinic = h
        .service
        .list_grants(&GrantQuery::for_organization(CLINIC.into()))
        .await
        .unwrap();
    assert_eq!(clinic.total, 2);
    assert_eq!(clinic.limit, 20);
    assert_eq!(clinic.items[0].id, other.grant.id);

    let huge = h
        .service
        .list_grants(&GrantQuery::for_organization(CLINIC.into()).page(500, 0))
        .await
        .unwrap();
    assert_eq!(huge.limit, 100);

    assert_matches!(
        h.service.list_grants(&GrantQuery::default()).await,
        Err(GrantError::Validation(_))
    );
}

#[tokio::test]
async fn deleted_grants_disappear() {
    let h = harness().await;
    let active = h.active_grant(24).await;

    assert_matches!(
        h.service
            .delete_grant(active.grant.id, &ActorId::new(DOCTOR))
            .await,
        Err(GrantError::Authorization(_))
    );

    let deleted = h
        .service
        .delete_grant(active.grant.id, &ActorId::new(ADMIN))
        .await
        .unwrap();
    assert!(deleted.deleted_at.is_some());
    assert!(!deleted.has_permission(ScopeFlag::ViewHistory, h.clock.now()));

    assert_matches!(
        h.service.get_grant(active.grant.id).await,
        Err(GrantError::NotFound(_))
    );
    let page = h
        .service
        .list_grants(&GrantQuery::for_subject(PATIENT.into()))
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(h.service.request_grant(request(24)).await.is_ok());
    assert!(h.audit.kinds().await.contains(&AuditKind::Deleted));
}

#[tokio::test]
async fn audit_failures_do_not_abort_operations() {
    let h = harness().await;
    let service = h.service.with_audit_sink(Arc::new(FailingAuditSink));
    let created = service.request_grant(request(4)).await.unwrap();
    assert!(service
        .perform_action(created.grant.id, action(GrantAction::Approve, PATIENT))
        .await
        .is_ok());
}

#[tokio::test]
async fn directory_outage_surfaces_as_core_error() {
    let h = harness().await;
    h.directory.set_unavailable(true).await;
    assert_matches!(
        h.service.request_grant(request(4)).await,
        Err(GrantError::Core(_))
    );
}

#[tokio::test]
async fn request_notification_is_delivered_by_the_next_batch() {
    let h = harness().await;
    h.service.request_grant(request(24)).await.unwrap();

    let summary = h.queue.process_batch(None).await;
    assert_eq!(summary.succeeded, 1);
    let sent = h.transport.sent().await;
    assert_eq!(
        sent[0].body,
        "org-1 is requesting access to your records for 24 hours"
    );
    assert_eq!(
        h.queue.stats().await.unwrap().count(JobStatus::Completed),
        1
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn expiry_is_exactly_the_requested_window(window in 0u32..=200) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = harness().await;
            let result = h.service.request_grant(request(window)).await;
            if (1..=168).contains(&window) {
                let created = result.unwrap();
                prop_assert_eq!(created.grant.expires_at, T0 + u64::from(window) * MS_PER_HOUR);
            } else {
                prop_assert!(matches!(result, Err(GrantError::Validation(_))));
            }
            Ok(())
        })?;
    }
}
