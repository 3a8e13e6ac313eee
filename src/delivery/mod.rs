// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 投递模块
///
/// 实现事件到订阅方的扇出投递与重试清扫：
/// - 分发器（dispatcher）：事件扇出、签名投递、结果记录
/// - 清扫器（sweeper）：到期重试的认领与再投递
pub mod dispatcher;
pub mod sweeper;
