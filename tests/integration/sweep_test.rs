// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, force_due, start_sink, TestApp};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use hookrs::domain::models::event::EventType;
use hookrs::domain::models::webhook::{DeliveryState, WebhookDelivery};
use hookrs::domain::repositories::delivery_repository::DeliveryRepository;
use hookrs::domain::use_cases::webhook_registry::WebhookPatch;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn trigger_and_fetch(app: &TestApp, url: &str, event: EventType) -> WebhookDelivery {
    let webhook = app
        .registry
        .create(app.owner_id, url.to_string(), vec![event], None)
        .await
        .expect("Failed to create webhook");

    app.dispatcher.trigger(event, json!({"seq": 1})).await;

    app.delivery_repo
        .find_recent_by_webhook(webhook.id, 10)
        .await
        .expect("DB error")
        .into_iter()
        .next()
        .expect("Delivery should exist")
}

async fn reload(app: &TestApp, id: Uuid) -> WebhookDelivery {
    app.delivery_repo
        .find_by_id(id)
        .await
        .expect("DB error")
        .expect("Delivery should exist")
}

#[tokio::test]
async fn test_sweep_retries_until_success() {
    let app = create_test_app().await;

    // Sink fails the first two calls and succeeds afterwards
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let sink_url = format!("{}/webhook", server.uri());

    let delivery = trigger_and_fetch(&app, &sink_url, EventType::UserCreated).await;
    assert_eq!(delivery.attempts, 1);
    assert!(!delivery.success);

    // Second attempt still fails
    force_due(&app, delivery.id).await;
    let report = app.sweeper.sweep().await.expect("sweep failed");
    assert_eq!(report.claimed, 1);
    assert_eq!(report.failed, 1);

    let delivery = reload(&app, delivery.id).await;
    assert_eq!(delivery.attempts, 2);
    assert!(!delivery.success);

    // Third attempt lands
    force_due(&app, delivery.id).await;
    let report = app.sweeper.sweep().await.expect("sweep failed");
    assert_eq!(report.succeeded, 1);

    let delivery = reload(&app, delivery.id).await;
    assert_eq!(delivery.attempts, 3);
    assert!(delivery.success);
    assert!(delivery.next_retry_at.is_none());
    assert_eq!(delivery.state(), DeliveryState::Succeeded);
}

#[tokio::test]
async fn test_sweep_ignores_retries_scheduled_in_the_future() {
    let app = create_test_app().await;
    let sink_url = start_sink(StatusCode::INTERNAL_SERVER_ERROR).await;

    let delivery = trigger_and_fetch(&app, &sink_url, EventType::MessageSent).await;
    assert!(delivery.next_retry_at.expect("scheduled") > Utc::now());

    let report = app.sweeper.sweep().await.expect("sweep failed");
    assert_eq!(report.due, 0);

    let delivery = reload(&app, delivery.id).await;
    assert_eq!(delivery.attempts, 1);
}

#[tokio::test]
async fn test_exhausted_delivery_is_terminal_and_never_reswept() {
    let app = create_test_app().await;
    let sink_url = start_sink(StatusCode::INTERNAL_SERVER_ERROR).await;

    let delivery = trigger_and_fetch(&app, &sink_url, EventType::ProfileUpdated).await;

    // Burn through the remaining four attempts
    for expected_attempts in 2..=5 {
        force_due(&app, delivery.id).await;
        app.sweeper.sweep().await.expect("sweep failed");
        let current = reload(&app, delivery.id).await;
        assert_eq!(current.attempts, expected_attempts);
    }

    let delivery = reload(&app, delivery.id).await;
    assert_eq!(delivery.attempts, 5);
    assert!(!delivery.success);
    assert!(delivery.next_retry_at.is_none());
    assert_eq!(delivery.state(), DeliveryState::FailedTerminal);

    // Even with a stale retry timestamp the exhausted row is never picked up
    let mut stale = delivery.clone();
    stale.next_retry_at = Some(Utc::now() - Duration::seconds(1));
    app.delivery_repo.update(&stale).await.expect("DB error");

    let report = app.sweeper.sweep().await.expect("sweep failed");
    assert_eq!(report.due, 0);
    assert_eq!(reload(&app, delivery.id).await.attempts, 5);
}

#[tokio::test]
async fn test_backoff_progression_follows_schedule() {
    let app = create_test_app().await;
    let sink_url = start_sink(StatusCode::INTERNAL_SERVER_ERROR).await;

    let delivery = trigger_and_fetch(&app, &sink_url, EventType::CollaborationUpdated).await;

    // Delay scheduled after each failed attempt, in seconds
    let expected = [60i64, 300, 900, 3600];
    for (index, expected_delay) in expected.iter().enumerate() {
        let current = reload(&app, delivery.id).await;
        assert_eq!(current.attempts, index as i32 + 1);

        let next_retry = current.next_retry_at.expect("retry should be scheduled");
        let delta = (next_retry - Utc::now()).num_seconds();
        assert!(
            (delta - expected_delay).abs() <= 10,
            "attempt {} should back off ~{}s, got {}s",
            index + 1,
            expected_delay,
            delta
        );

        force_due(&app, delivery.id).await;
        app.sweeper.sweep().await.expect("sweep failed");
    }

    // Fifth failure exhausts the budget
    let delivery = reload(&app, delivery.id).await;
    assert_eq!(delivery.attempts, 5);
    assert!(delivery.next_retry_at.is_none());
}

#[tokio::test]
async fn test_claim_prevents_concurrent_double_delivery() {
    let app = create_test_app().await;
    let sink_url = start_sink(StatusCode::INTERNAL_SERVER_ERROR).await;

    let delivery = trigger_and_fetch(&app, &sink_url, EventType::GroupMemberAdded).await;
    force_due(&app, delivery.id).await;

    let delivery = reload(&app, delivery.id).await;
    let expected_retry_at = delivery.next_retry_at.expect("scheduled");
    let claim_until = Utc::now() + Duration::minutes(10);

    // First sweeper wins the claim, the second loses it
    let first = app
        .delivery_repo
        .claim(delivery.id, expected_retry_at, claim_until)
        .await
        .expect("DB error");
    let second = app
        .delivery_repo
        .claim(delivery.id, expected_retry_at, claim_until)
        .await
        .expect("DB error");
    assert!(first);
    assert!(!second);

    // The claimed row is no longer due for anyone else
    let report = app.sweeper.sweep().await.expect("sweep failed");
    assert_eq!(report.due, 0);
    assert_eq!(reload(&app, delivery.id).await.attempts, 1);
}

#[tokio::test]
async fn test_sweep_defers_deliveries_of_inactive_webhooks() {
    let app = create_test_app().await;
    let sink_url = start_sink(StatusCode::INTERNAL_SERVER_ERROR).await;

    let webhook = app
        .registry
        .create(
            app.owner_id,
            sink_url,
            vec![EventType::CollaborationCompleted],
            None,
        )
        .await
        .expect("Failed to create webhook");
    app.dispatcher
        .trigger(EventType::CollaborationCompleted, json!({}))
        .await;

    let delivery = app
        .delivery_repo
        .find_recent_by_webhook(webhook.id, 10)
        .await
        .expect("DB error")
        .into_iter()
        .next()
        .expect("Delivery should exist");

    app.registry
        .update(
            app.owner_id,
            webhook.id,
            WebhookPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to deactivate webhook");

    force_due(&app, delivery.id).await;
    let report = app.sweeper.sweep().await.expect("sweep failed");

    // Claimed but deferred: no attempt is consumed while the webhook is off
    assert_eq!(report.due, 1);
    assert_eq!(report.claimed, 1);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 0);

    let delivery = reload(&app, delivery.id).await;
    assert_eq!(delivery.attempts, 1);
    assert!(delivery.next_retry_at.expect("still scheduled") > Utc::now());
}
