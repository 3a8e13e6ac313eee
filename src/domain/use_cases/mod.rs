// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域用例模块
///
/// 该模块包含具体的业务用例实现，每个用例代表一个完整的业务流程。
/// 领域用例协调领域对象和服务来完成特定的业务目标。
///
/// 当前的用例：
/// - Webhook注册表（webhook_registry）：订阅的创建、查询、更新、
///   密钥轮换与删除，并强制所有者隔离
pub mod webhook_registry;
