// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::WebhookDelivery;
use crate::domain::repositories::webhook_repository::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 某个Webhook的投递统计
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DeliveryStats {
    /// 投递记录总数
    pub total: u64,
    /// 已成功的记录数
    pub succeeded: u64,
    /// 等待重试的记录数
    pub awaiting_retry: u64,
    /// 终态失败的记录数
    pub failed: u64,
}

/// Webhook投递记录仓库特质
///
/// 定义投递记录的数据访问接口。单条记录的更新必须是原子的，
/// 重试认领通过条件更新实现，保证并发清扫不会重复投递。
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// 创建投递记录
    async fn create(&self, delivery: &WebhookDelivery) -> Result<WebhookDelivery, RepositoryError>;
    /// 根据ID查找投递记录
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookDelivery>, RepositoryError>;
    /// 更新投递记录（尝试次数、响应、成功标志、下次重试时间）
    async fn update(&self, delivery: &WebhookDelivery)
        -> Result<WebhookDelivery, RepositoryError>;
    /// 查找到期待重试的投递记录
    ///
    /// 条件：未成功、尝试次数未达上限、`next_retry_at <= now`、
    /// 且尚未与已删除的Webhook脱离关联。
    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, RepositoryError>;
    /// 认领一条到期的投递记录
    ///
    /// 仅当存储中的 `next_retry_at` 仍等于调用方读到的值时，将其
    /// 原子地推进到 `claim_until`。返回是否认领成功；并发清扫中
    /// 只有一方会得到 `true`。
    async fn claim(
        &self,
        id: Uuid,
        expected_retry_at: DateTime<Utc>,
        claim_until: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
    /// 查询某Webhook最近的投递记录
    async fn find_recent_by_webhook(
        &self,
        webhook_id: Uuid,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, RepositoryError>;
    /// 统计某Webhook的投递结果
    async fn stats_for_webhook(&self, webhook_id: Uuid) -> Result<DeliveryStats, RepositoryError>;
    /// 将某Webhook的全部投递记录脱离关联（`webhook_id` 置空）
    ///
    /// 在删除Webhook时调用，投递历史保留用于审计。
    async fn detach_webhook(&self, webhook_id: Uuid) -> Result<u64, RepositoryError>;
}
