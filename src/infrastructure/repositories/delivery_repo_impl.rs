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

use crate::domain::models::webhook::WebhookDelivery;
use crate::domain::repositories::delivery_repository::{DeliveryRepository, DeliveryStats};
use crate::domain::repositories::webhook_repository::RepositoryError;
use crate::domain::services::retry_policy::MAX_ATTEMPTS;
use crate::infrastructure::database::entities::webhook_delivery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// 投递记录仓库实现
#[derive(Clone)]
pub struct DeliveryRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl DeliveryRepoImpl {
    /// 创建新的投递记录仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeliveryRepository for DeliveryRepoImpl {
    async fn create(&self, delivery: &WebhookDelivery) -> Result<WebhookDelivery, RepositoryError> {
        let model = webhook_delivery::ActiveModel {
            id: Set(delivery.id),
            webhook_id: Set(delivery.webhook_id),
            event: Set(delivery.event.to_string()),
            payload: Set(delivery.payload.clone()),
            attempts: Set(delivery.attempts),
            response_status: Set(delivery.response_status),
            response_body: Set(delivery.response_body.clone()),
            success: Set(delivery.success),
            next_retry_at: Set(delivery.next_retry_at.map(Into::into)),
            created_at: Set(delivery.created_at.into()),
            updated_at: Set(delivery.updated_at.into()),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(delivery.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookDelivery>, RepositoryError> {
        let model = webhook_delivery::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        model.map(model_to_delivery).transpose()
    }

    async fn update(
        &self,
        delivery: &WebhookDelivery,
    ) -> Result<WebhookDelivery, RepositoryError> {
        let mut active: webhook_delivery::ActiveModel =
            webhook_delivery::Entity::find_by_id(delivery.id)
                .one(self.db.as_ref())
                .await?
                .ok_or(RepositoryError::NotFound)?
                .into();

        active.attempts = Set(delivery.attempts);
        active.response_status = Set(delivery.response_status);
        active.response_body = Set(delivery.response_body.clone());
        active.success = Set(delivery.success);
        active.next_retry_at = Set(delivery.next_retry_at.map(Into::into));
        active.updated_at = Set(delivery.updated_at.into());

        let updated_model = active.update(self.db.as_ref()).await?;

        model_to_delivery(updated_model)
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, RepositoryError> {
        let now: DateTimeWithTimeZone = now.into();

        let models = webhook_delivery::Entity::find()
            .filter(webhook_delivery::Column::Success.eq(false))
            .filter(webhook_delivery::Column::Attempts.lt(MAX_ATTEMPTS))
            .filter(webhook_delivery::Column::NextRetryAt.lte(now))
            .filter(webhook_delivery::Column::WebhookId.is_not_null())
            .order_by_asc(webhook_delivery::Column::NextRetryAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(model_to_delivery).collect()
    }

    async fn claim(
        &self,
        id: Uuid,
        expected_retry_at: DateTime<Utc>,
        claim_until: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let expected: DateTimeWithTimeZone = expected_retry_at.into();
        let claim_until: DateTimeWithTimeZone = claim_until.into();

        // Conditional update: only the sweeper that still sees the loaded
        // next_retry_at wins the row; everyone else matches zero rows.
        let result = webhook_delivery::Entity::update_many()
            .col_expr(
                webhook_delivery::Column::NextRetryAt,
                Expr::value(Some(claim_until)),
            )
            .filter(webhook_delivery::Column::Id.eq(id))
            .filter(webhook_delivery::Column::Success.eq(false))
            .filter(webhook_delivery::Column::NextRetryAt.eq(expected))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn find_recent_by_webhook(
        &self,
        webhook_id: Uuid,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, RepositoryError> {
        let models = webhook_delivery::Entity::find()
            .filter(webhook_delivery::Column::WebhookId.eq(webhook_id))
            .order_by_desc(webhook_delivery::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(model_to_delivery).collect()
    }

    async fn stats_for_webhook(&self, webhook_id: Uuid) -> Result<DeliveryStats, RepositoryError> {
        let base = webhook_delivery::Entity::find()
            .filter(webhook_delivery::Column::WebhookId.eq(webhook_id));

        let total = base.clone().count(self.db.as_ref()).await?;
        let succeeded = base
            .clone()
            .filter(webhook_delivery::Column::Success.eq(true))
            .count(self.db.as_ref())
            .await?;
        let awaiting_retry = base
            .clone()
            .filter(webhook_delivery::Column::Success.eq(false))
            .filter(webhook_delivery::Column::NextRetryAt.is_not_null())
            .count(self.db.as_ref())
            .await?;
        let failed = base
            .filter(webhook_delivery::Column::Success.eq(false))
            .filter(webhook_delivery::Column::NextRetryAt.is_null())
            .count(self.db.as_ref())
            .await?;

        Ok(DeliveryStats {
            total,
            succeeded,
            awaiting_retry,
            failed,
        })
    }

    async fn detach_webhook(&self, webhook_id: Uuid) -> Result<u64, RepositoryError> {
        let result = webhook_delivery::Entity::update_many()
            .col_expr(
                webhook_delivery::Column::WebhookId,
                Expr::value(Option::<Uuid>::None),
            )
            .filter(webhook_delivery::Column::WebhookId.eq(webhook_id))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}

fn model_to_delivery(model: webhook_delivery::Model) -> Result<WebhookDelivery, RepositoryError> {
    let event = model
        .event
        .parse()
        .map_err(|e: crate::domain::models::event::UnknownEventType| {
            RepositoryError::Database(DbErr::Custom(e.to_string()))
        })?;

    Ok(WebhookDelivery {
        id: model.id,
        webhook_id: model.webhook_id,
        event,
        payload: model.payload,
        attempts: model.attempts,
        response_status: model.response_status,
        response_body: model.response_body,
        success: model.success,
        next_retry_at: model.next_retry_at.map(Into::into),
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    })
}
