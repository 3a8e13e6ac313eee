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

use serde::Deserialize;
use validator::Validate;

/// 创建Webhook请求
///
/// 事件名称以字符串接收，在处理器中解析为封闭的事件枚举，
/// 未知名称会作为校验错误返回给调用方。
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWebhookRequest {
    /// 回调URL
    #[validate(url)]
    pub url: String,
    /// 订阅的事件名称列表
    pub events: Vec<String>,
    /// 可选描述
    pub description: Option<String>,
}

/// 更新Webhook请求
///
/// 所有字段可选，仅更新给定字段；密钥只能通过轮换接口更换。
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateWebhookRequest {
    /// 回调URL
    #[validate(url)]
    pub url: Option<String>,
    /// 订阅的事件名称列表
    pub events: Option<Vec<String>>,
    /// 是否启用
    pub is_active: Option<bool>,
    /// 描述
    pub description: Option<String>,
}
