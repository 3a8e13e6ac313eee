// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::event::EventType;
use crate::domain::models::webhook::{DeliveryState, Webhook, WebhookDelivery};
use crate::domain::repositories::delivery_repository::DeliveryStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Webhook响应
///
/// 除创建和轮换响应外，`secret` 字段只携带脱敏前缀。
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub id: Uuid,
    pub url: String,
    pub secret: String,
    pub events: Vec<EventType>,
    pub is_active: bool,
    pub description: Option<String>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookResponse {
    /// 构造脱敏响应（常规读取）
    pub fn redacted(webhook: &Webhook) -> Self {
        Self::build(webhook, webhook.secret_preview())
    }

    /// 构造携带完整密钥的响应（仅创建和轮换时使用一次）
    pub fn with_secret(webhook: &Webhook) -> Self {
        Self::build(webhook, webhook.secret.clone())
    }

    fn build(webhook: &Webhook, secret: String) -> Self {
        Self {
            id: webhook.id,
            url: webhook.url.clone(),
            secret,
            events: webhook.events.clone(),
            is_active: webhook.is_active,
            description: webhook.description.clone(),
            last_triggered_at: webhook.last_triggered_at,
            created_at: webhook.created_at,
            updated_at: webhook.updated_at,
        }
    }
}

/// 投递记录响应
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub event: EventType,
    pub state: DeliveryState,
    pub attempts: i32,
    pub success: bool,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&WebhookDelivery> for DeliveryResponse {
    fn from(delivery: &WebhookDelivery) -> Self {
        Self {
            id: delivery.id,
            event: delivery.event,
            state: delivery.state(),
            attempts: delivery.attempts,
            success: delivery.success,
            response_status: delivery.response_status,
            response_body: delivery.response_body.clone(),
            next_retry_at: delivery.next_retry_at,
            created_at: delivery.created_at,
        }
    }
}

/// 单个Webhook的详情响应：配置、统计与最近的投递记录
#[derive(Debug, Serialize)]
pub struct WebhookDetailResponse {
    #[serde(flatten)]
    pub webhook: WebhookResponse,
    pub stats: DeliveryStats,
    pub recent_deliveries: Vec<DeliveryResponse>,
}

/// 测试投递响应
#[derive(Debug, Serialize)]
pub struct TestWebhookResponse {
    pub success: bool,
    pub delivery: DeliveryResponse,
}
