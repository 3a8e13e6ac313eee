// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::delivery::dispatcher::Dispatcher;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use chrono::{Duration, Utc};
use futures::StreamExt;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// 一次清扫的结果汇总
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepReport {
    /// 到期的投递记录数
    pub due: usize,
    /// 成功认领的记录数
    pub claimed: usize,
    /// 重试后成功的记录数
    pub succeeded: usize,
    /// 重试后仍失败的记录数
    pub failed: usize,
}

enum SweepOutcome {
    Succeeded,
    Failed,
    /// 已认领但未消耗尝试（Webhook已删除或停用）
    Deferred,
    Skipped,
}

/// 重试清扫器
///
/// 幂等的清扫操作，由进程外的调度器（cron等）周期性触发，本身
/// 不拥有任何后台任务。每条到期记录先通过条件更新原子认领，
/// 并发清扫中输掉认领的一方直接跳过，保证不会重复投递。
pub struct RetrySweeper<W, D>
where
    W: WebhookRepository,
    D: DeliveryRepository,
{
    /// 投递记录仓库
    deliveries: Arc<D>,
    /// 分发器，执行实际的重试尝试
    dispatcher: Arc<Dispatcher<W, D>>,
    /// 单次清扫的批量上限
    batch_size: u64,
    /// 重试并发上限
    concurrency: usize,
    /// 认领窗口：认领时把 `next_retry_at` 推进到未来的该时长处
    claim_window: Duration,
}

impl<W, D> RetrySweeper<W, D>
where
    W: WebhookRepository,
    D: DeliveryRepository,
{
    /// 创建新的重试清扫器
    ///
    /// # 参数
    ///
    /// * `deliveries` - 投递记录仓库
    /// * `dispatcher` - 分发器
    /// * `batch_size` - 单次清扫处理的记录上限
    /// * `concurrency` - 重试并发上限
    pub fn new(
        deliveries: Arc<D>,
        dispatcher: Arc<Dispatcher<W, D>>,
        batch_size: u64,
        concurrency: usize,
    ) -> Self {
        Self {
            deliveries,
            dispatcher,
            batch_size,
            concurrency,
            claim_window: Duration::minutes(10),
        }
    }

    /// 执行一次清扫
    ///
    /// 找出所有到期待重试的投递记录，逐条认领并重试。
    pub async fn sweep(&self) -> anyhow::Result<SweepReport> {
        let now = Utc::now();
        let due = self.deliveries.find_due(now, self.batch_size).await?;

        let mut report = SweepReport {
            due: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        info!("Sweeping {} due deliveries", due.len());
        counter!("webhook_sweep_due_total").increment(due.len() as u64);

        let claim_until = now + self.claim_window;
        let deliveries = &self.deliveries;
        let dispatcher = &self.dispatcher;

        let outcomes: Vec<SweepOutcome> = futures::stream::iter(due)
            .map(|mut delivery| async move {
                // The loaded next_retry_at is the optimistic-claim token: a
                // concurrent sweeper that already claimed the row has moved
                // it, so our conditional update matches zero rows.
                let expected = match delivery.next_retry_at {
                    Some(at) => at,
                    None => return SweepOutcome::Skipped,
                };

                match deliveries.claim(delivery.id, expected, claim_until).await {
                    Ok(true) => {}
                    Ok(false) => return SweepOutcome::Skipped,
                    Err(e) => {
                        error!("Failed to claim delivery {}: {}", delivery.id, e);
                        return SweepOutcome::Skipped;
                    }
                }
                counter!("webhook_sweep_claimed_total").increment(1);
                delivery.next_retry_at = Some(claim_until);

                match dispatcher.retry(&mut delivery).await {
                    Ok(true) if delivery.success => SweepOutcome::Succeeded,
                    Ok(true) => SweepOutcome::Failed,
                    Ok(false) => SweepOutcome::Deferred,
                    Err(e) => {
                        error!("Failed to retry delivery {}: {}", delivery.id, e);
                        SweepOutcome::Failed
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                SweepOutcome::Succeeded => {
                    report.claimed += 1;
                    report.succeeded += 1;
                }
                SweepOutcome::Failed => {
                    report.claimed += 1;
                    report.failed += 1;
                }
                SweepOutcome::Deferred => report.claimed += 1,
                SweepOutcome::Skipped => {}
            }
        }

        Ok(report)
    }
}
