// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};

/// 单条投递记录的最大尝试次数
pub const MAX_ATTEMPTS: i32 = 5;

/// 退避时间表（秒）：1分钟、5分钟、15分钟、1小时、6小时
///
/// 按刚刚失败的尝试序号索引；超出表长时取最后一项。
pub const BACKOFF_SCHEDULE: [i64; 5] = [60, 300, 900, 3600, 21600];

/// 重试策略
///
/// 固定时间表的有界重试策略。与进程内的重试组合器不同，
/// 退避结果持久化在投递记录上，由外部触发的清扫执行。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 退避时间表（秒）
    schedule: &'static [i64],
    /// 最大尝试次数
    max_attempts: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            schedule: &BACKOFF_SCHEDULE,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// 计算某次失败后的退避时长
    ///
    /// # 参数
    ///
    /// * `failed_attempts` - 已失败的尝试次数（从1开始）
    pub fn backoff_for(&self, failed_attempts: i32) -> Duration {
        let index = (failed_attempts.max(1) as usize - 1).min(self.schedule.len() - 1);
        Duration::seconds(self.schedule[index])
    }

    /// 计算下次重试时间
    pub fn next_retry_at(&self, failed_attempts: i32, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.backoff_for(failed_attempts)
    }

    /// 尝试次数是否已耗尽
    ///
    /// 耗尽后投递进入终态失败，不再调度重试。这是预期的终止
    /// 状态，不是错误。
    pub fn is_exhausted(&self, attempts: i32) -> bool {
        attempts >= self.max_attempts
    }
}
