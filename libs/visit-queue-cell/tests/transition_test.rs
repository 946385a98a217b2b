mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use futures::future::AbortHandle;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};
use serde_json::json;

use shared_utils::test_utils::{MockEmrResponses, TEST_DEFAULT_PRIORITY, TEST_DEFAULT_STATUS};
use visit_queue_cell::datetime::parse_canonical_strict;
use visit_queue_cell::*;

use common::{queue_entry, TestHarness, TRANSITION_URL};

#[tokio::test]
async fn test_blank_status_and_priority_submit_defaults() {
    let harness = TestHarness::start().await;

    Mock::given(method("POST"))
        .and(path(TRANSITION_URL))
        .and(body_partial_json(json!({
            "status": TEST_DEFAULT_STATUS,
            "priority": TEST_DEFAULT_PRIORITY,
            "previousQueueUuid": "Q1",
            "newQueueUuid": "Q1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&harness.server)
        .await;
    harness.mount_active_entries(vec![], 1).await;

    let entry = queue_entry("", "", "Q1");
    let outcome = harness
        .engine()
        .submit(&entry, &QueueEntryEdits::new(), &harness.token)
        .await
        .expect("transition should commit");

    assert_matches!(outcome, TransitionOutcome::Committed { ref request, refresh_error: None } => {
        assert_eq!(request.status, "S-DEFAULT");
        assert_eq!(request.priority, "P-DEFAULT");
        assert_eq!(request.previous_queue_uuid, "Q1");
        assert_eq!(request.new_queue_uuid, "Q1");
    });
    assert_eq!(harness.cache.invalidation_count(), 1);
}

#[tokio::test]
async fn test_priority_edit_commits_and_invalidates_once() {
    let harness = TestHarness::start().await;
    harness.mount_transition_response(201, 1).await;
    harness
        .mount_active_entries(
            vec![MockEmrResponses::visit_queue_entry(
                "entry-2", "visit-1", "patient-1", "Q1", "S-WAITING", "P-URGENT",
            )],
            1,
        )
        .await;

    let mut events = harness.cache.subscribe();
    let entry = queue_entry("S-WAITING", "P-NORMAL", "Q1");
    let edits = QueueEntryEdits::new().with_priority("P-URGENT");

    let outcome = harness
        .engine()
        .submit(&entry, &edits, &harness.token)
        .await
        .expect("transition should commit");

    assert!(outcome.is_committed());
    assert_eq!(outcome.notifications().len(), 1);
    assert_eq!(harness.cache.invalidation_count(), 1);

    let requests = harness.transition_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, "S-WAITING");
    assert_eq!(requests[0].priority, "P-URGENT");
    assert_eq!(requests[0].previous_queue_uuid, "Q1");
    assert_eq!(requests[0].new_queue_uuid, "Q1");
    assert_eq!(requests[0].queue_entry_uuid, "entry-1");

    assert_matches!(events.try_recv(), Ok(CacheEvent::Invalidated { generation: 1, .. }));
    assert_matches!(events.try_recv(), Ok(CacheEvent::Refreshed { entries: 1, .. }));
    assert!(events.try_recv().is_err());

    let refreshed = harness.cache.active_entries(&harness.token).await.unwrap();
    assert_eq!(refreshed[0].priority_uuid, "P-URGENT");
}

#[tokio::test]
async fn test_remote_failure_leaves_entry_unchanged() {
    let harness = TestHarness::start().await;
    harness.mount_transition_response(500, 1).await;
    harness.mount_active_entries(vec![], 0).await;

    let entry = queue_entry("S-WAITING", "P-NORMAL", "Q1");
    let before = entry.clone();
    let result = harness
        .engine()
        .submit(&entry, &QueueEntryEdits::new().with_status("S-IN-SERVICE"), &harness.token)
        .await;

    assert_matches!(result, Err(VisitQueueError::TransitionError(ref message)) => {
        assert_eq!(message, "Could not update queue entry");
    });
    let notification = result.unwrap_err().to_notification();
    assert!(notification.is_error());
    assert_eq!(entry, before);
    assert_eq!(harness.cache.invalidation_count(), 0);
}

#[tokio::test]
async fn test_unchanged_values_still_submit_one_transition() {
    let harness = TestHarness::start().await;
    harness.mount_transition_response(201, 1).await;
    harness.mount_active_entries(vec![], 1).await;

    let entry = queue_entry("S-WAITING", "P-NORMAL", "Q1");
    let edits = QueueEntryEdits::new()
        .with_status("S-WAITING")
        .with_priority("P-NORMAL")
        .with_target_queue("Q1");

    harness.engine().submit(&entry, &edits, &harness.token).await.unwrap();

    let requests = harness.transition_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].previous_queue_uuid, requests[0].new_queue_uuid);
}

#[tokio::test]
async fn test_move_to_other_service_keeps_previous_queue() {
    let harness = TestHarness::start().await;
    harness.mount_transition_response(201, 1).await;
    harness.mount_active_entries(vec![], 1).await;

    let entry = queue_entry("S-WAITING", "P-NORMAL", "Q-TRIAGE");
    let edits = QueueEntryEdits::new().with_target_queue("Q-CONSULTATION");

    harness.engine().submit(&entry, &edits, &harness.token).await.unwrap();

    let requests = harness.transition_requests().await;
    assert_eq!(requests[0].previous_queue_uuid, "Q-TRIAGE");
    assert_eq!(requests[0].new_queue_uuid, "Q-CONSULTATION");
    assert_eq!(requests[0].patient_uuid, "patient-1");
    assert_eq!(requests[0].visit_uuid, "visit-1");
}

#[tokio::test]
async fn test_end_date_is_canonical() {
    let harness = TestHarness::start().await;
    harness.mount_transition_response(201, 1).await;
    harness.mount_active_entries(vec![], 1).await;

    let before = chrono::Utc::now() - chrono::Duration::seconds(1);
    harness
        .engine()
        .submit(&queue_entry("S", "P", "Q1"), &QueueEntryEdits::new(), &harness.token)
        .await
        .unwrap();

    let requests = harness.transition_requests().await;
    let end_date = parse_canonical_strict(&requests[0].end_date).expect("canonical end date");
    assert!(end_date >= before);
    assert_eq!(datetime::to_canonical_string(&end_date), requests[0].end_date);
}

#[tokio::test]
async fn test_ok_without_created_is_a_failure() {
    let harness = TestHarness::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSITION_URL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&harness.server)
        .await;
    harness.mount_active_entries(vec![], 0).await;

    let result = harness
        .engine()
        .submit(&queue_entry("S", "P", "Q1"), &QueueEntryEdits::new(), &harness.token)
        .await;

    assert_matches!(result, Err(VisitQueueError::TransitionError(_)));
    assert_eq!(harness.cache.invalidation_count(), 0);
}

#[tokio::test]
async fn test_transport_failure_is_a_transition_error() {
    let harness = TestHarness::start().await;
    let config = shared_utils::test_utils::TestConfig::with_base_url("http://127.0.0.1:1").to_app_config();
    let client = std::sync::Arc::new(shared_database::RestClient::new(&config));
    let engine = QueueTransitionEngine::new(
        client,
        ConceptDefaults::from_config(&config),
        harness.cache.clone(),
    );

    let result = engine
        .submit(&queue_entry("S", "P", "Q1"), &QueueEntryEdits::new(), &harness.token)
        .await;

    assert_matches!(result, Err(VisitQueueError::TransitionError(_)));
    assert_eq!(harness.cache.invalidation_count(), 0);
}

#[tokio::test]
async fn test_refresh_failure_does_not_undo_commit() {
    let harness = TestHarness::start().await;
    harness.mount_transition_response(201, 1).await;
    Mock::given(method("GET"))
        .and(path(common::ACTIVE_ENTRIES_URL))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&harness.server)
        .await;

    let outcome = harness
        .engine()
        .submit(&queue_entry("S", "P", "Q1"), &QueueEntryEdits::new(), &harness.token)
        .await
        .expect("remote transition committed");

    assert_matches!(
        outcome,
        TransitionOutcome::Committed { refresh_error: Some(VisitQueueError::CacheRefreshError(_)), .. }
    );
    let notifications = outcome.notifications();
    assert_eq!(notifications.len(), 2);
    assert!(!notifications[1].is_error());
    assert_eq!(harness.cache.invalidation_count(), 1);
}

#[tokio::test]
async fn test_cancelled_transition_is_discarded_silently() {
    let harness = TestHarness::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSITION_URL))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
        .mount(&harness.server)
        .await;
    harness.mount_active_entries(vec![], 0).await;

    let (handle, registration) = AbortHandle::new_pair();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
    });

    let outcome = harness
        .engine()
        .submit_transition(
            &queue_entry("S-WAITING", "P-NORMAL", "Q1"),
            &QueueEntryEdits::new().with_priority("P-URGENT"),
            &harness.token,
            registration,
        )
        .await;

    assert_eq!(outcome, Ok(TransitionOutcome::Cancelled));
    assert!(outcome.unwrap().notifications().is_empty());
    assert_eq!(harness.cache.invalidation_count(), 0);
}

#[tokio::test]
async fn test_missing_defaults_are_rejected_before_network() {
    let harness = TestHarness::start().await;
    harness.mount_transition_response(201, 0).await;

    let engine = QueueTransitionEngine::new(
        harness.client.clone(),
        ConceptDefaults { status: String::new(), priority: String::new() },
        harness.cache.clone(),
    );

    let result = engine
        .submit(&queue_entry("", "", "Q1"), &QueueEntryEdits::new(), &harness.token)
        .await;

    assert_matches!(result, Err(VisitQueueError::ValidationError(_)));
}
