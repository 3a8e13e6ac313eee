// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookrs::domain::models::event::EventType;
use hookrs::domain::models::webhook::{Webhook, WebhookDelivery};
use hookrs::domain::repositories::delivery_repository::{
    DeliveryRepository, DeliveryStats,
};
use hookrs::domain::repositories::webhook_repository::{RepositoryError, WebhookRepository};
use hookrs::domain::services::signature;
use hookrs::domain::use_cases::webhook_registry::{RegistryError, WebhookPatch, WebhookRegistry};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 内存Webhook仓库，用于脱离数据库测试注册表逻辑
#[derive(Default)]
struct FakeWebhookRepo {
    store: Mutex<HashMap<Uuid, Webhook>>,
}

#[async_trait]
impl WebhookRepository for FakeWebhookRepo {
    async fn create(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError> {
        self.store
            .lock()
            .unwrap()
            .insert(webhook.id, webhook.clone());
        Ok(webhook.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Webhook>, RepositoryError> {
        Ok(self.store.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Webhook>, RepositoryError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Webhook>, RepositoryError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.is_active)
            .cloned()
            .collect())
    }

    async fn update(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        match store.get_mut(&webhook.id) {
            Some(slot) => {
                *slot = webhook.clone();
                Ok(webhook.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.store
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn mark_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        if let Some(webhook) = self.store.lock().unwrap().get_mut(&id) {
            webhook.last_triggered_at = Some(at);
        }
        Ok(())
    }
}

/// 内存投递记录仓库
#[derive(Default)]
struct FakeDeliveryRepo {
    store: Mutex<HashMap<Uuid, WebhookDelivery>>,
}

#[async_trait]
impl DeliveryRepository for FakeDeliveryRepo {
    async fn create(&self, delivery: &WebhookDelivery) -> Result<WebhookDelivery, RepositoryError> {
        self.store
            .lock()
            .unwrap()
            .insert(delivery.id, delivery.clone());
        Ok(delivery.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookDelivery>, RepositoryError> {
        Ok(self.store.lock().unwrap().get(&id).cloned())
    }

    async fn update(
        &self,
        delivery: &WebhookDelivery,
    ) -> Result<WebhookDelivery, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        match store.get_mut(&delivery.id) {
            Some(slot) => {
                *slot = delivery.clone();
                Ok(delivery.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, RepositoryError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|d| {
                !d.success
                    && d.attempts < 5
                    && d.webhook_id.is_some()
                    && d.next_retry_at.is_some_and(|at| at <= now)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn claim(
        &self,
        id: Uuid,
        expected_retry_at: DateTime<Utc>,
        claim_until: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        match store.get_mut(&id) {
            Some(delivery)
                if !delivery.success && delivery.next_retry_at == Some(expected_retry_at) =>
            {
                delivery.next_retry_at = Some(claim_until);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_recent_by_webhook(
        &self,
        webhook_id: Uuid,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, RepositoryError> {
        let mut deliveries: Vec<WebhookDelivery> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.webhook_id == Some(webhook_id))
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        deliveries.truncate(limit as usize);
        Ok(deliveries)
    }

    async fn stats_for_webhook(&self, webhook_id: Uuid) -> Result<DeliveryStats, RepositoryError> {
        let store = self.store.lock().unwrap();
        let mut stats = DeliveryStats::default();
        for delivery in store.values().filter(|d| d.webhook_id == Some(webhook_id)) {
            stats.total += 1;
            if delivery.success {
                stats.succeeded += 1;
            } else if delivery.next_retry_at.is_some() {
                stats.awaiting_retry += 1;
            } else {
                stats.failed += 1;
            }
        }
        Ok(stats)
    }

    async fn detach_webhook(&self, webhook_id: Uuid) -> Result<u64, RepositoryError> {
        let mut detached = 0;
        for delivery in self.store.lock().unwrap().values_mut() {
            if delivery.webhook_id == Some(webhook_id) {
                delivery.webhook_id = None;
                detached += 1;
            }
        }
        Ok(detached)
    }
}

fn registry() -> (
    WebhookRegistry<FakeWebhookRepo, FakeDeliveryRepo>,
    Arc<FakeWebhookRepo>,
    Arc<FakeDeliveryRepo>,
) {
    let webhooks = Arc::new(FakeWebhookRepo::default());
    let deliveries = Arc::new(FakeDeliveryRepo::default());
    let registry = WebhookRegistry::new(webhooks.clone(), deliveries.clone(), true);
    (registry, webhooks, deliveries)
}

#[tokio::test]
async fn test_create_rejects_empty_events() {
    let (registry, _, _) = registry();

    let result = registry
        .create(
            Uuid::new_v4(),
            "https://example.com/hook".to_string(),
            vec![],
            None,
        )
        .await;

    assert!(matches!(result, Err(RegistryError::Validation(_))));
}

#[tokio::test]
async fn test_create_rejects_reserved_test_event() {
    let (registry, _, _) = registry();

    let result = registry
        .create(
            Uuid::new_v4(),
            "https://example.com/hook".to_string(),
            vec![EventType::UserCreated, EventType::WebhookTest],
            None,
        )
        .await;

    assert!(matches!(result, Err(RegistryError::Validation(_))));
}

#[tokio::test]
async fn test_create_rejects_malformed_url() {
    let (registry, _, _) = registry();
    let owner = Uuid::new_v4();

    for url in ["not a url", "ftp://example.com/hook", "/relative/path"] {
        let result = registry
            .create(owner, url.to_string(), vec![EventType::UserCreated], None)
            .await;
        assert!(
            matches!(result, Err(RegistryError::Validation(_))),
            "url {:?} should be rejected",
            url
        );
    }
}

#[tokio::test]
async fn test_create_generates_secret_and_dedups_events() {
    let (registry, _, _) = registry();
    let owner = Uuid::new_v4();

    let first = registry
        .create(
            owner,
            "https://example.com/a".to_string(),
            vec![
                EventType::UserCreated,
                EventType::MessageSent,
                EventType::UserCreated,
            ],
            Some("dup events".to_string()),
        )
        .await
        .unwrap();
    let second = registry
        .create(
            owner,
            "https://example.com/b".to_string(),
            vec![EventType::UserCreated],
            None,
        )
        .await
        .unwrap();

    assert_eq!(first.secret.len(), 64);
    assert_ne!(first.secret, second.secret);
    assert_eq!(
        first.events,
        vec![EventType::UserCreated, EventType::MessageSent]
    );
    assert!(first.is_active);
}

#[tokio::test]
async fn test_get_enforces_ownership() {
    let (registry, _, _) = registry();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let webhook = registry
        .create(
            owner,
            "https://example.com/hook".to_string(),
            vec![EventType::UserCreated],
            None,
        )
        .await
        .unwrap();

    assert!(registry.get(owner, webhook.id).await.is_ok());
    assert!(matches!(
        registry.get(stranger, webhook.id).await,
        Err(RegistryError::Forbidden)
    ));
    assert!(matches!(
        registry.get(owner, Uuid::new_v4()).await,
        Err(RegistryError::NotFound)
    ));
}

#[tokio::test]
async fn test_update_patches_fields_and_preserves_secret() {
    let (registry, _, _) = registry();
    let owner = Uuid::new_v4();

    let webhook = registry
        .create(
            owner,
            "https://example.com/hook".to_string(),
            vec![EventType::UserCreated],
            None,
        )
        .await
        .unwrap();

    let updated = registry
        .update(
            owner,
            webhook.id,
            WebhookPatch {
                url: Some("https://example.org/hook2".to_string()),
                events: Some(vec![EventType::GroupCreated]),
                is_active: Some(false),
                description: Some("updated".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.url, "https://example.org/hook2");
    assert_eq!(updated.events, vec![EventType::GroupCreated]);
    assert!(!updated.is_active);
    assert_eq!(updated.description.as_deref(), Some("updated"));
    assert_eq!(updated.secret, webhook.secret);
    assert!(updated.updated_at >= webhook.updated_at);
}

#[tokio::test]
async fn test_update_revalidates_events() {
    let (registry, _, _) = registry();
    let owner = Uuid::new_v4();

    let webhook = registry
        .create(
            owner,
            "https://example.com/hook".to_string(),
            vec![EventType::UserCreated],
            None,
        )
        .await
        .unwrap();

    let result = registry
        .update(
            owner,
            webhook.id,
            WebhookPatch {
                events: Some(vec![]),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(RegistryError::Validation(_))));
}

#[tokio::test]
async fn test_rotate_secret_invalidates_old_one() {
    let (registry, _, _) = registry();
    let owner = Uuid::new_v4();

    let webhook = registry
        .create(
            owner,
            "https://example.com/hook".to_string(),
            vec![EventType::UserCreated],
            None,
        )
        .await
        .unwrap();

    let payload = b"payload bytes";
    let old_signature = signature::sign(payload, &webhook.secret);

    let rotated = registry.rotate_secret(owner, webhook.id).await.unwrap();

    assert_ne!(rotated.secret, webhook.secret);
    assert!(!signature::verify(payload, &old_signature, &rotated.secret));
    assert!(signature::verify(
        payload,
        &signature::sign(payload, &rotated.secret),
        &rotated.secret
    ));
}

#[tokio::test]
async fn test_delete_detaches_delivery_history() {
    let (registry, webhooks, deliveries) = registry();
    let owner = Uuid::new_v4();

    let webhook = registry
        .create(
            owner,
            "https://example.com/hook".to_string(),
            vec![EventType::UserCreated],
            None,
        )
        .await
        .unwrap();

    let delivery =
        WebhookDelivery::first_attempt(webhook.id, EventType::UserCreated, json!({"n": 1}));
    deliveries.create(&delivery).await.unwrap();

    registry.delete(owner, webhook.id).await.unwrap();

    assert!(webhooks.find_by_id(webhook.id).await.unwrap().is_none());
    let retained = deliveries.find_by_id(delivery.id).await.unwrap().unwrap();
    assert_eq!(retained.webhook_id, None);
}
