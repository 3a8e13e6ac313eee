use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_webhooks_owner")
                    .table(Webhooks::Table)
                    .col(Webhooks::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_webhooks_active")
                    .table(Webhooks::Table)
                    .col(Webhooks::IsActive)
                    .to_owned(),
            )
            .await?;

        // Sweep query: success = false AND next_retry_at <= now
        manager
            .create_index(
                Index::create()
                    .name("idx_deliveries_retry")
                    .table(WebhookDeliveries::Table)
                    .col(WebhookDeliveries::Success)
                    .col(WebhookDeliveries::NextRetryAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deliveries_webhook")
                    .table(WebhookDeliveries::Table)
                    .col(WebhookDeliveries::WebhookId)
                    .col(WebhookDeliveries::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_deliveries_webhook").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_deliveries_retry").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_webhooks_active").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_webhooks_owner").to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Webhooks {
    Table,
    OwnerId,
    IsActive,
}

#[derive(DeriveIden)]
enum WebhookDeliveries {
    Table,
    WebhookId,
    Success,
    NextRetryAt,
    CreatedAt,
}
