// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::event::EventType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 展示密钥前缀时保留的十六进制字符数
pub const SECRET_PREVIEW_LEN: usize = 8;

/// Webhook实体
///
/// 表示一个Webhook订阅配置，用于接收平台事件通知。
/// 每个Webhook归属于一个账户，只有所有者可以读取和修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    /// Webhook唯一标识符
    pub id: Uuid,
    /// 所属账户ID，用于权限隔离和归属管理
    pub owner_id: Uuid,
    /// Webhook回调URL，接收通知的目标地址
    pub url: String,
    /// 签名密钥（32字节随机数的十六进制编码），仅在创建和轮换时完整返回
    pub secret: String,
    /// 订阅的事件类型集合，非空
    pub events: Vec<EventType>,
    /// 是否启用；停用的Webhook不参与投递和重试
    pub is_active: bool,
    /// 可选的描述文本
    pub description: Option<String>,
    /// 最近一次投递尝试时间（无论成功或失败）
    pub last_triggered_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// 创建一个新的Webhook订阅
    ///
    /// # 参数
    ///
    /// * `owner_id` - 所属账户ID
    /// * `url` - 回调URL
    /// * `secret` - 已生成的签名密钥
    /// * `events` - 订阅的事件类型集合
    /// * `description` - 可选描述
    pub fn new(
        owner_id: Uuid,
        url: String,
        secret: String,
        events: Vec<EventType>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            url,
            secret,
            events,
            is_active: true,
            description,
            last_triggered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 密钥的脱敏前缀，用于除创建/轮换之外的所有读取场景
    pub fn secret_preview(&self) -> String {
        let prefix: String = self.secret.chars().take(SECRET_PREVIEW_LEN).collect();
        format!("{}…", prefix)
    }

    /// 是否订阅了指定事件
    pub fn is_subscribed(&self, event: EventType) -> bool {
        self.events.contains(&event)
    }
}

/// Webhook投递记录实体
///
/// 表示某次事件发生对某个Webhook的一次逻辑投递，可能跨越多次
/// 重试尝试。每次尝试原地更新同一条记录，而不是新建记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    /// 投递记录唯一标识符
    pub id: Uuid,
    /// 所属Webhook ID；Webhook删除后置空，记录保留用于审计
    pub webhook_id: Option<Uuid>,
    /// 触发本次投递的事件类型
    pub event: EventType,
    /// 事件负载数据，保留用于审计和重放
    pub payload: serde_json::Value,
    /// 已进行的投递尝试次数，首次发送时为1，上限为5
    pub attempts: i32,
    /// 最近一次响应的HTTP状态码；网络层失败记为0
    pub response_status: Option<i32>,
    /// 截断后的响应体（前1000个字符），用于诊断
    pub response_body: Option<String>,
    /// 是否已成功（任一次尝试收到2xx响应）
    pub success: bool,
    /// 下次计划重试时间；成功或达到尝试上限后置空
    pub next_retry_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 网络层失败的状态码哨兵值
pub const NETWORK_FAILURE_STATUS: i32 = 0;

impl WebhookDelivery {
    /// 为首次投递尝试创建记录
    ///
    /// 记录以 `attempts = 1` 创建，并在网络调用之前持久化，
    /// 保证崩溃时尝试次数不会丢失。
    pub fn first_attempt(webhook_id: Uuid, event: EventType, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            webhook_id: Some(webhook_id),
            event,
            payload,
            attempts: 1,
            response_status: None,
            response_body: None,
            success: false,
            next_retry_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 计算投递记录的派生状态
    pub fn state(&self) -> DeliveryState {
        if self.success {
            DeliveryState::Succeeded
        } else if self.next_retry_at.is_some() {
            DeliveryState::AwaitingRetry
        } else if self.attempts == 0 {
            DeliveryState::Pending
        } else {
            DeliveryState::FailedTerminal
        }
    }
}

/// 投递记录状态枚举
///
/// 由 `success` / `attempts` / `next_retry_at` 派生，不单独存储。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// 待首次尝试
    Pending,
    /// 已成功
    Succeeded,
    /// 等待重试
    AwaitingRetry,
    /// 终态失败，不再重试
    FailedTerminal,
}
