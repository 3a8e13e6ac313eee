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

use crate::domain::models::event::EventType;
use crate::domain::models::webhook::{Webhook, WebhookDelivery, NETWORK_FAILURE_STATUS};
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::services::retry_policy::RetryPolicy;
use crate::domain::services::signature;
use chrono::{SecondsFormat, Utc};
use futures::StreamExt;
use metrics::{counter, histogram};
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 签名请求头
pub const SIGNATURE_HEADER: &str = "X-Hookrs-Signature";
/// 事件类型请求头
pub const EVENT_HEADER: &str = "X-Hookrs-Event";
/// Webhook ID请求头
pub const WEBHOOK_ID_HEADER: &str = "X-Hookrs-Webhook-Id";
/// 投递记录ID请求头
pub const DELIVERY_ID_HEADER: &str = "X-Hookrs-Delivery-Id";

/// 响应体保留的最大字符数
pub const RESPONSE_BODY_LIMIT: usize = 1000;

/// 出站负载的线上格式
///
/// 签名针对该结构序列化后的精确字节计算，请求体发送的也是
/// 同一份字节，保证接收方重算时字节一致。
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload<'a> {
    event: EventType,
    timestamp: String,
    data: &'a serde_json::Value,
    webhook_id: Uuid,
    delivery_id: Uuid,
}

/// Webhook投递分发器
///
/// 负责把领域事件扇出到所有匹配的启用订阅，并执行单次投递尝试。
/// 所有依赖（仓库、HTTP客户端、重试策略）在构造时显式注入，
/// 不持有任何全局状态。
#[derive(Clone)]
pub struct Dispatcher<W, D>
where
    W: WebhookRepository,
    D: DeliveryRepository,
{
    /// Webhook仓库
    webhooks: Arc<W>,
    /// 投递记录仓库
    deliveries: Arc<D>,
    /// 重试策略
    policy: RetryPolicy,
    /// HTTP客户端
    client: Client,
    /// 扇出并发上限
    fanout_concurrency: usize,
}

impl<W, D> Dispatcher<W, D>
where
    W: WebhookRepository,
    D: DeliveryRepository,
{
    /// 创建新的分发器实例
    ///
    /// # 参数
    ///
    /// * `webhooks` - Webhook仓库
    /// * `deliveries` - 投递记录仓库
    /// * `timeout` - 单次投递请求的超时时间
    pub fn new(webhooks: Arc<W>, deliveries: Arc<D>, timeout: Duration) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("Hookrs-Webhook/0.1.0"),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            webhooks,
            deliveries,
            policy: RetryPolicy::default(),
            client,
            fanout_concurrency: 8,
        }
    }

    /// 触发领域事件
    ///
    /// 查询所有启用且订阅了该事件的Webhook并并发投递。对触发方
    /// 而言是即发即忘：单个投递的失败只记录日志，绝不向上传播。
    pub async fn trigger(&self, event: EventType, data: serde_json::Value) {
        let webhooks = match self.webhooks.list_active().await {
            Ok(webhooks) => webhooks,
            Err(e) => {
                error!("Failed to load active webhooks for {}: {}", event, e);
                return;
            }
        };

        let matching: Vec<Webhook> = webhooks
            .into_iter()
            .filter(|w| w.is_subscribed(event))
            .collect();

        if matching.is_empty() {
            debug!("No active subscriptions for event {}", event);
            return;
        }

        info!("Dispatching {} to {} webhooks", event, matching.len());

        let dispatcher = self;
        let data = &data;
        futures::stream::iter(matching)
            .for_each_concurrent(self.fanout_concurrency, |webhook| async move {
                if let Err(e) = dispatcher.deliver(webhook.id, event, data.clone()).await {
                    error!("Failed to deliver {} to webhook {}: {}", event, webhook.id, e);
                }
            })
            .await;
    }

    /// 执行首次投递尝试
    ///
    /// 重新加载Webhook（停用则静默跳过），以 `attempts = 1` 创建
    /// 投递记录并在网络调用之前持久化，然后执行尝试。
    ///
    /// # 返回值
    ///
    /// 返回投递记录；Webhook不存在或已停用时返回 `None`
    pub async fn deliver(
        &self,
        webhook_id: Uuid,
        event: EventType,
        data: serde_json::Value,
    ) -> anyhow::Result<Option<WebhookDelivery>> {
        let webhook = match self.webhooks.find_by_id(webhook_id).await? {
            Some(webhook) => webhook,
            None => return Ok(None),
        };
        if !webhook.is_active {
            debug!("Webhook {} is inactive, skipping delivery", webhook.id);
            return Ok(None);
        }

        let mut delivery = WebhookDelivery::first_attempt(webhook.id, event, data);
        self.deliveries.create(&delivery).await?;

        self.attempt(&webhook, &mut delivery, true).await?;
        Ok(Some(delivery))
    }

    /// 重试一条已认领的投递记录
    ///
    /// 在网络调用之前先持久化递增后的尝试次数，保证崩溃时
    /// 计数不丢失。Webhook已删除或停用时不消耗尝试次数。
    ///
    /// # 返回值
    ///
    /// 返回是否实际执行了尝试
    pub async fn retry(&self, delivery: &mut WebhookDelivery) -> anyhow::Result<bool> {
        let webhook_id = match delivery.webhook_id {
            Some(id) => id,
            None => return Ok(false),
        };
        let webhook = match self.webhooks.find_by_id(webhook_id).await? {
            Some(webhook) if webhook.is_active => webhook,
            _ => {
                debug!(
                    "Webhook {} is gone or inactive, deferring delivery {}",
                    webhook_id, delivery.id
                );
                return Ok(false);
            }
        };

        delivery.attempts += 1;
        delivery.updated_at = Utc::now();
        self.deliveries.update(delivery).await?;

        self.attempt(&webhook, delivery, true).await?;
        Ok(true)
    }

    /// 同步执行一次测试投递
    ///
    /// 向指定Webhook发送保留的测试事件并返回真实结果。测试投递
    /// 不调度重试，失败即为终态。
    pub async fn send_test(&self, webhook: &Webhook) -> anyhow::Result<WebhookDelivery> {
        let payload = json!({
            "message": "This is a test delivery",
            "webhook_id": webhook.id,
        });

        let mut delivery =
            WebhookDelivery::first_attempt(webhook.id, EventType::WebhookTest, payload);
        self.deliveries.create(&delivery).await?;

        self.attempt(webhook, &mut delivery, false).await?;
        Ok(delivery)
    }

    async fn attempt(
        &self,
        webhook: &Webhook,
        delivery: &mut WebhookDelivery,
        schedule_retries: bool,
    ) -> anyhow::Result<()> {
        info!(
            "Delivering {} (attempt {}) to {}",
            delivery.id, delivery.attempts, webhook.url
        );
        counter!("webhook_delivery_attempts_total").increment(1);

        let start = std::time::Instant::now();

        let payload = WirePayload {
            event: delivery.event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data: &delivery.payload,
            webhook_id: webhook.id,
            delivery_id: delivery.id,
        };
        let body = serde_json::to_vec(&payload)?;
        let signature_hex = signature::sign(&body, &webhook.secret);

        let response = self
            .client
            .post(&webhook.url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature_hex)
            .header(EVENT_HEADER, delivery.event.as_str())
            .header(WEBHOOK_ID_HEADER, webhook.id.to_string())
            .header(DELIVERY_ID_HEADER, delivery.id.to_string())
            .body(body)
            .send()
            .await;

        let duration = start.elapsed();
        histogram!("webhook_delivery_duration_seconds").record(duration.as_secs_f64());

        let now = Utc::now();
        match response {
            Ok(resp) => {
                let status = resp.status();
                delivery.response_status = Some(status.as_u16() as i32);
                delivery.response_body = Some(truncate_body(resp.text().await.unwrap_or_default()));

                if status.is_success() {
                    delivery.success = true;
                    delivery.next_retry_at = None;
                    info!("Delivery {} succeeded with status {}", delivery.id, status);
                    counter!("webhook_delivery_success_total").increment(1);
                } else {
                    error!("Delivery {} failed with status {}", delivery.id, status);
                    self.record_failure(delivery, schedule_retries, now);
                    counter!("webhook_delivery_failed_total", "reason" => "http_error")
                        .increment(1);
                }
            }
            Err(e) => {
                error!("Delivery {} failed with error: {}", delivery.id, e);
                delivery.response_status = Some(NETWORK_FAILURE_STATUS);
                delivery.response_body = Some(truncate_body(e.to_string()));
                self.record_failure(delivery, schedule_retries, now);
                counter!("webhook_delivery_failed_total", "reason" => "network_error").increment(1);
            }
        }

        delivery.updated_at = now;
        self.deliveries.update(delivery).await?;
        self.webhooks.mark_triggered(webhook.id, now).await?;

        Ok(())
    }

    fn record_failure(
        &self,
        delivery: &mut WebhookDelivery,
        schedule_retries: bool,
        now: chrono::DateTime<Utc>,
    ) {
        delivery.success = false;

        if !schedule_retries {
            delivery.next_retry_at = None;
            return;
        }

        if self.policy.is_exhausted(delivery.attempts) {
            delivery.next_retry_at = None;
            info!(
                "Delivery {} terminally failed after {} attempts",
                delivery.id, delivery.attempts
            );
            counter!("webhook_dead_letter_total").increment(1);
        } else {
            delivery.next_retry_at = Some(self.policy.next_retry_at(delivery.attempts, now));
        }
    }
}

fn truncate_body(body: String) -> String {
    if body.chars().count() <= RESPONSE_BODY_LIMIT {
        body
    } else {
        body.chars().take(RESPONSE_BODY_LIMIT).collect()
    }
}
