// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::Webhook;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// Webhook仓库特质
///
/// 定义Webhook订阅数据访问接口
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// 创建Webhook
    async fn create(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError>;
    /// 根据ID查找Webhook
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Webhook>, RepositoryError>;
    /// 列出某账户的全部Webhook
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Webhook>, RepositoryError>;
    /// 列出所有启用的Webhook
    async fn list_active(&self) -> Result<Vec<Webhook>, RepositoryError>;
    /// 更新Webhook（URL、事件集合、启用状态、描述、密钥）
    async fn update(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError>;
    /// 删除Webhook
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 记录最近一次投递尝试时间
    async fn mark_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}
