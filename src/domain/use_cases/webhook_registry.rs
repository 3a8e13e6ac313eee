// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::event::EventType;
use crate::domain::models::webhook::Webhook;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::{RepositoryError, WebhookRepository};
use crate::domain::services::signature;
use crate::utils::validators;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// 注册表错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    /// 校验失败（URL格式、事件列表等）
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Webhook不存在
    #[error("Webhook not found")]
    NotFound,
    /// 调用者不是Webhook的所有者
    #[error("Forbidden")]
    Forbidden,
    /// 仓库层错误
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Webhook更新补丁
///
/// 所有字段均为可选，仅更新给定的字段。密钥不可通过补丁修改，
/// 只能通过轮换操作重新生成。
#[derive(Debug, Default, Clone)]
pub struct WebhookPatch {
    pub url: Option<String>,
    pub events: Option<Vec<EventType>>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

/// Webhook注册表用例
///
/// 封装Webhook订阅的全部生命周期操作，并在每个操作上强制
/// 所有者隔离：非所有者的访问返回 `Forbidden`。
pub struct WebhookRegistry<W, D>
where
    W: WebhookRepository,
    D: DeliveryRepository,
{
    webhooks: Arc<W>,
    deliveries: Arc<D>,
    /// 是否允许回调URL解析到私有地址（测试环境使用）
    allow_private_urls: bool,
}

impl<W, D> WebhookRegistry<W, D>
where
    W: WebhookRepository,
    D: DeliveryRepository,
{
    /// 创建新的Webhook注册表用例
    pub fn new(webhooks: Arc<W>, deliveries: Arc<D>, allow_private_urls: bool) -> Self {
        Self {
            webhooks,
            deliveries,
            allow_private_urls,
        }
    }

    /// 创建Webhook订阅
    ///
    /// 校验URL和事件列表，生成新的随机密钥。返回的记录包含完整
    /// 密钥，这是密钥唯一一次完整返回（轮换除外）。
    pub async fn create(
        &self,
        owner_id: Uuid,
        url: String,
        events: Vec<EventType>,
        description: Option<String>,
    ) -> Result<Webhook, RegistryError> {
        self.validate_url(&url).await?;
        let events = Self::validate_events(events)?;

        let webhook = Webhook::new(owner_id, url, signature::generate_secret(), events, description);
        Ok(self.webhooks.create(&webhook).await?)
    }

    /// 读取单个Webhook，强制所有者校验
    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Webhook, RegistryError> {
        let webhook = self
            .webhooks
            .find_by_id(id)
            .await?
            .ok_or(RegistryError::NotFound)?;

        if webhook.owner_id != owner_id {
            return Err(RegistryError::Forbidden);
        }

        Ok(webhook)
    }

    /// 列出调用者的全部Webhook
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Webhook>, RegistryError> {
        Ok(self.webhooks.list_by_owner(owner_id).await?)
    }

    /// 更新Webhook的URL、事件集合、启用状态或描述
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        patch: WebhookPatch,
    ) -> Result<Webhook, RegistryError> {
        let mut webhook = self.get(owner_id, id).await?;

        if let Some(url) = patch.url {
            self.validate_url(&url).await?;
            webhook.url = url;
        }
        if let Some(events) = patch.events {
            webhook.events = Self::validate_events(events)?;
        }
        if let Some(is_active) = patch.is_active {
            webhook.is_active = is_active;
        }
        if let Some(description) = patch.description {
            webhook.description = Some(description);
        }
        webhook.updated_at = Utc::now();

        Ok(self.webhooks.update(&webhook).await?)
    }

    /// 轮换Webhook密钥
    ///
    /// 生成新的随机密钥并覆盖旧值，旧密钥签名立即失效。返回的
    /// 记录是新密钥最后一次完整展示。
    pub async fn rotate_secret(&self, owner_id: Uuid, id: Uuid) -> Result<Webhook, RegistryError> {
        let mut webhook = self.get(owner_id, id).await?;

        webhook.secret = signature::generate_secret();
        webhook.updated_at = Utc::now();

        Ok(self.webhooks.update(&webhook).await?)
    }

    /// 删除Webhook
    ///
    /// 投递历史保留用于审计：删除前先将全部投递记录的
    /// `webhook_id` 置空。
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), RegistryError> {
        let webhook = self.get(owner_id, id).await?;

        self.deliveries.detach_webhook(webhook.id).await?;
        self.webhooks.delete(webhook.id).await?;
        Ok(())
    }

    async fn validate_url(&self, url: &str) -> Result<(), RegistryError> {
        validators::validate_webhook_url(url, self.allow_private_urls)
            .await
            .map_err(|e| RegistryError::Validation(e.to_string()))
    }

    fn validate_events(events: Vec<EventType>) -> Result<Vec<EventType>, RegistryError> {
        if events.is_empty() {
            return Err(RegistryError::Validation(
                "events must not be empty".to_string(),
            ));
        }
        if let Some(reserved) = events.iter().find(|e| e.is_reserved()) {
            return Err(RegistryError::Validation(format!(
                "event '{}' is reserved and cannot be subscribed",
                reserved
            )));
        }

        // Dedup while keeping the caller's order
        let mut seen = Vec::with_capacity(events.len());
        for event in events {
            if !seen.contains(&event) {
                seen.push(event);
            }
        }
        Ok(seen)
    }
}
