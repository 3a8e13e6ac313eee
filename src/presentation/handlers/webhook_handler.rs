// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::application::dto::webhook_request::{CreateWebhookRequest, UpdateWebhookRequest};
use crate::application::dto::webhook_response::{
    DeliveryResponse, TestWebhookResponse, WebhookDetailResponse, WebhookResponse,
};
use crate::delivery::dispatcher::Dispatcher;
use crate::domain::models::event::EventType;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::use_cases::webhook_registry::{RegistryError, WebhookPatch, WebhookRegistry};
use crate::presentation::errors::AppError;
use crate::presentation::extractors::owner_id::OwnerId;
use axum::extract::Path;
use axum::{http::StatusCode, Extension, Json};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 详情接口返回的最近投递记录条数
const RECENT_DELIVERIES_LIMIT: u64 = 20;

pub async fn list_webhooks<W, D>(
    Extension(registry): Extension<Arc<WebhookRegistry<W, D>>>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<Vec<WebhookResponse>>, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    let webhooks = registry.list(owner_id).await?;
    Ok(Json(webhooks.iter().map(WebhookResponse::redacted).collect()))
}

pub async fn create_webhook<W, D>(
    Extension(registry): Extension<Arc<WebhookRegistry<W, D>>>,
    OwnerId(owner_id): OwnerId,
    Json(payload): Json<CreateWebhookRequest>,
) -> Result<(StatusCode, Json<WebhookResponse>), AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    payload
        .validate()
        .map_err(|e| RegistryError::Validation(e.to_string()))?;
    let events = parse_events(payload.events)?;

    let webhook = registry
        .create(owner_id, payload.url, events, payload.description)
        .await?;

    // The only response that ever carries the full secret (besides rotation)
    Ok((StatusCode::CREATED, Json(WebhookResponse::with_secret(&webhook))))
}

pub async fn get_webhook<W, D>(
    Extension(registry): Extension<Arc<WebhookRegistry<W, D>>>,
    Extension(deliveries): Extension<Arc<D>>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<WebhookDetailResponse>, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    let webhook = registry.get(owner_id, id).await?;

    let stats = deliveries.stats_for_webhook(webhook.id).await?;
    let recent = deliveries
        .find_recent_by_webhook(webhook.id, RECENT_DELIVERIES_LIMIT)
        .await?;

    Ok(Json(WebhookDetailResponse {
        webhook: WebhookResponse::redacted(&webhook),
        stats,
        recent_deliveries: recent.iter().map(DeliveryResponse::from).collect(),
    }))
}

pub async fn update_webhook<W, D>(
    Extension(registry): Extension<Arc<WebhookRegistry<W, D>>>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWebhookRequest>,
) -> Result<Json<WebhookResponse>, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    payload
        .validate()
        .map_err(|e| RegistryError::Validation(e.to_string()))?;

    let patch = WebhookPatch {
        url: payload.url,
        events: payload.events.map(parse_events).transpose()?,
        is_active: payload.is_active,
        description: payload.description,
    };

    let webhook = registry.update(owner_id, id, patch).await?;
    Ok(Json(WebhookResponse::redacted(&webhook)))
}

pub async fn delete_webhook<W, D>(
    Extension(registry): Extension<Arc<WebhookRegistry<W, D>>>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    registry.delete(owner_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rotate_secret<W, D>(
    Extension(registry): Extension<Arc<WebhookRegistry<W, D>>>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<WebhookResponse>, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    let webhook = registry.rotate_secret(owner_id, id).await?;
    Ok(Json(WebhookResponse::with_secret(&webhook)))
}

/// 同步测试投递
///
/// 对指定Webhook内联执行一次测试事件投递并返回真实结果，
/// 避免"先发送后轮询"方式固有的竞态。
pub async fn test_webhook<W, D>(
    Extension(registry): Extension<Arc<WebhookRegistry<W, D>>>,
    Extension(dispatcher): Extension<Arc<Dispatcher<W, D>>>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<TestWebhookResponse>, AppError>
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    let webhook = registry.get(owner_id, id).await?;

    let delivery = dispatcher.send_test(&webhook).await?;
    Ok(Json(TestWebhookResponse {
        success: delivery.success,
        delivery: DeliveryResponse::from(&delivery),
    }))
}

fn parse_events(names: Vec<String>) -> Result<Vec<EventType>, RegistryError> {
    names
        .into_iter()
        .map(|name| {
            name.parse::<EventType>()
                .map_err(|e| RegistryError::Validation(e.to_string()))
        })
        .collect()
}
