// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::event::EventType;
use crate::domain::models::webhook::Webhook;
use crate::domain::repositories::webhook_repository::{RepositoryError, WebhookRepository};
use crate::infrastructure::database::entities::webhook;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// Webhook仓库实现
#[derive(Clone)]
pub struct WebhookRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl WebhookRepoImpl {
    /// 创建新的Webhook仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WebhookRepository for WebhookRepoImpl {
    async fn create(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError> {
        let model = webhook::ActiveModel {
            id: Set(webhook.id),
            owner_id: Set(webhook.owner_id),
            url: Set(webhook.url.clone()),
            secret: Set(webhook.secret.clone()),
            events: Set(events_to_json(&webhook.events)?),
            is_active: Set(webhook.is_active),
            description: Set(webhook.description.clone()),
            last_triggered_at: Set(webhook.last_triggered_at.map(Into::into)),
            created_at: Set(webhook.created_at.into()),
            updated_at: Set(webhook.updated_at.into()),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(webhook.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Webhook>, RepositoryError> {
        let model = webhook::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        model.map(model_to_webhook).transpose()
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Webhook>, RepositoryError> {
        let models = webhook::Entity::find()
            .filter(webhook::Column::OwnerId.eq(owner_id))
            .order_by_asc(webhook::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(model_to_webhook).collect()
    }

    async fn list_active(&self) -> Result<Vec<Webhook>, RepositoryError> {
        let models = webhook::Entity::find()
            .filter(webhook::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(model_to_webhook).collect()
    }

    async fn update(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError> {
        let mut active: webhook::ActiveModel = webhook::Entity::find_by_id(webhook.id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        active.url = Set(webhook.url.clone());
        active.secret = Set(webhook.secret.clone());
        active.events = Set(events_to_json(&webhook.events)?);
        active.is_active = Set(webhook.is_active);
        active.description = Set(webhook.description.clone());
        active.updated_at = Set(webhook.updated_at.into());

        let updated_model = active.update(self.db.as_ref()).await?;

        model_to_webhook(updated_model)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = webhook::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let at: DateTimeWithTimeZone = at.into();

        // Single-column update; a concurrently deleted webhook is not an error
        webhook::Entity::update_many()
            .col_expr(webhook::Column::LastTriggeredAt, Expr::value(Some(at)))
            .filter(webhook::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        Ok(())
    }
}

fn events_to_json(events: &[EventType]) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(events)
        .map_err(|e| RepositoryError::Database(DbErr::Custom(e.to_string())))
}

fn model_to_webhook(model: webhook::Model) -> Result<Webhook, RepositoryError> {
    let events: Vec<EventType> = serde_json::from_value(model.events)
        .map_err(|e| RepositoryError::Database(DbErr::Custom(e.to_string())))?;

    Ok(Webhook {
        id: model.id,
        owner_id: model.owner_id,
        url: model.url,
        secret: model.secret,
        events,
        is_active: model.is_active,
        description: model.description,
        last_triggered_at: model.last_triggered_at.map(Into::into),
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    })
}
