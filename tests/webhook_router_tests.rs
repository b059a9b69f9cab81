// Integration tests for webhook routing
//
// These tests verify that events are classified correctly and that the
// router only ever queues work or removes registry entries, never more.

use rtms_coordinator::{
    EventKind, Handoff, HandoffQueue, RouteOutcome, SessionRegistry, WebhookEvent, WebhookRouter,
};
use serde_json::json;

fn router() -> (WebhookRouter, SessionRegistry, HandoffQueue) {
    let registry = SessionRegistry::new();
    let queue = HandoffQueue::new();
    let router = WebhookRouter::new(registry.clone(), queue.clone());
    (router, registry, queue)
}

fn started(stream_id: &str) -> WebhookEvent {
    WebhookEvent::from_json(json!({
        "event": "meeting.rtms_started",
        "payload": {
            "rtms_stream_id": stream_id,
            "meeting_uuid": format!("meeting-{}", stream_id),
            "server_urls": "wss://rtms.example.com",
            "signature": "sig"
        }
    }))
}

#[tokio::test]
async fn test_started_events_are_queued_in_arrival_order() {
    let (router, registry, queue) = router();

    for id in ["a", "b", "c"] {
        assert_eq!(router.handle(started(id)).await, RouteOutcome::JoinQueued);
    }

    let order: Vec<String> = queue
        .drain_all()
        .iter()
        .map(|h| h.stream_id().to_string())
        .collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_join_request_carries_payload() {
    let (router, _, queue) = router();

    router.handle(started("s1")).await;

    match queue.drain_all().pop() {
        Some(Handoff::Join(request)) => {
            assert_eq!(request.stream_id, "s1");
            assert_eq!(request.meeting_uuid, "meeting-s1");
            assert_eq!(request.server_urls, "wss://rtms.example.com");
            assert_eq!(request.signature, "sig");
        }
        other => panic!("expected a join, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stopped_without_stream_id_changes_nothing() {
    let (router, registry, queue) = router();
    let event = WebhookEvent::from_json(json!({
        "event": "meeting.rtms_stopped",
        "payload": { "meeting_uuid": "m1" }
    }));

    assert_eq!(router.handle(event).await, RouteOutcome::MissingStreamId);
    assert!(registry.is_empty().await);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_stopped_for_unknown_stream_changes_nothing() {
    let (router, registry, queue) = router();
    let event = WebhookEvent::from_json(json!({
        "event": "meeting.rtms_stopped",
        "payload": { "rtms_stream_id": "s2" }
    }));

    assert_eq!(router.handle(event.clone()).await, RouteOutcome::UnknownStream);
    assert_eq!(router.handle(event).await, RouteOutcome::UnknownStream);
    assert!(registry.is_empty().await);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_unknown_events_are_ignored() {
    let (router, registry, queue) = router();

    let events = [
        WebhookEvent::from_json(json!({
            "event": "meeting.participant_joined",
            "payload": { "rtms_stream_id": "s1" }
        })),
        WebhookEvent::from_json(json!({ "payload": { "rtms_stream_id": "s1" } })),
        WebhookEvent::from_slice(b"not json at all"),
    ];

    for event in events {
        assert_eq!(event.kind, EventKind::Unknown);
        assert_eq!(router.handle(event).await, RouteOutcome::Ignored);
    }

    assert!(registry.is_empty().await);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_started_without_stream_id_is_not_queued() {
    let (router, _, queue) = router();
    let event = WebhookEvent::from_json(json!({
        "event": "meeting.rtms_started",
        "payload": { "meeting_uuid": "m1" }
    }));

    assert_eq!(router.handle(event).await, RouteOutcome::MissingStreamId);
    assert!(queue.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_webhooks_are_all_queued() {
    let (router, _, queue) = router();

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let router = router.clone();
            tokio::spawn(async move { router.handle(started(&format!("s{}", i))).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), RouteOutcome::JoinQueued);
    }

    let mut ids: Vec<String> = queue
        .drain_all()
        .iter()
        .map(|h| h.stream_id().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 64);
}
