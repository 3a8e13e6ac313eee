// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 平台事件类型枚举
///
/// 定义了系统中支持订阅的全部事件类型，构成一个封闭集合。
/// Webhook在创建或更新时只能订阅该集合中的事件，集合之外的
/// 事件名称会被校验拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 用户创建
    #[serde(rename = "user.created")]
    UserCreated,
    /// 用户更新
    #[serde(rename = "user.updated")]
    UserUpdated,
    /// 用户删除
    #[serde(rename = "user.deleted")]
    UserDeleted,
    /// 个人资料更新
    #[serde(rename = "profile.updated")]
    ProfileUpdated,
    /// 协作创建
    #[serde(rename = "collaboration.created")]
    CollaborationCreated,
    /// 协作更新
    #[serde(rename = "collaboration.updated")]
    CollaborationUpdated,
    /// 协作完成
    #[serde(rename = "collaboration.completed")]
    CollaborationCompleted,
    /// 群组创建
    #[serde(rename = "group.created")]
    GroupCreated,
    /// 群组成员加入
    #[serde(rename = "group.member_added")]
    GroupMemberAdded,
    /// 群组成员移除
    #[serde(rename = "group.member_removed")]
    GroupMemberRemoved,
    /// 消息发送
    #[serde(rename = "message.sent")]
    MessageSent,
    /// 通知发送
    #[serde(rename = "notification.sent")]
    NotificationSent,
    /// 测试事件，仅由测试投递接口使用，不可订阅
    #[serde(rename = "webhook.test")]
    WebhookTest,
}

/// 未知事件类型错误
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl EventType {
    /// 可订阅的事件类型全集（不含保留的测试事件）
    pub const SUBSCRIBABLE: &'static [EventType] = &[
        EventType::UserCreated,
        EventType::UserUpdated,
        EventType::UserDeleted,
        EventType::ProfileUpdated,
        EventType::CollaborationCreated,
        EventType::CollaborationUpdated,
        EventType::CollaborationCompleted,
        EventType::GroupCreated,
        EventType::GroupMemberAdded,
        EventType::GroupMemberRemoved,
        EventType::MessageSent,
        EventType::NotificationSent,
    ];

    /// 事件名称字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserCreated => "user.created",
            EventType::UserUpdated => "user.updated",
            EventType::UserDeleted => "user.deleted",
            EventType::ProfileUpdated => "profile.updated",
            EventType::CollaborationCreated => "collaboration.created",
            EventType::CollaborationUpdated => "collaboration.updated",
            EventType::CollaborationCompleted => "collaboration.completed",
            EventType::GroupCreated => "group.created",
            EventType::GroupMemberAdded => "group.member_added",
            EventType::GroupMemberRemoved => "group.member_removed",
            EventType::MessageSent => "message.sent",
            EventType::NotificationSent => "notification.sent",
            EventType::WebhookTest => "webhook.test",
        }
    }

    /// 是否为保留事件类型
    ///
    /// 保留事件仅供系统内部使用（测试投递），不允许出现在订阅列表中。
    pub fn is_reserved(&self) -> bool {
        matches!(self, EventType::WebhookTest)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user.created" => Ok(EventType::UserCreated),
            "user.updated" => Ok(EventType::UserUpdated),
            "user.deleted" => Ok(EventType::UserDeleted),
            "profile.updated" => Ok(EventType::ProfileUpdated),
            "collaboration.created" => Ok(EventType::CollaborationCreated),
            "collaboration.updated" => Ok(EventType::CollaborationUpdated),
            "collaboration.completed" => Ok(EventType::CollaborationCompleted),
            "group.created" => Ok(EventType::GroupCreated),
            "group.member_added" => Ok(EventType::GroupMemberAdded),
            "group.member_removed" => Ok(EventType::GroupMemberRemoved),
            "message.sent" => Ok(EventType::MessageSent),
            "notification.sent" => Ok(EventType::NotificationSent),
            "webhook.test" => Ok(EventType::WebhookTest),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}
