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

use axum::Extension;
use hookrs::config::settings::Settings;
use hookrs::delivery::dispatcher::Dispatcher;
use hookrs::delivery::sweeper::RetrySweeper;
use hookrs::domain::use_cases::webhook_registry::WebhookRegistry;
use hookrs::infrastructure::database::connection;
use hookrs::infrastructure::repositories::delivery_repo_impl::DeliveryRepoImpl;
use hookrs::infrastructure::repositories::webhook_repo_impl::WebhookRepoImpl;
use hookrs::presentation::middleware::auth_middleware::AuthState;
use hookrs::presentation::routes;
use hookrs::utils::telemetry;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting hookrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Initialize Prometheus metrics
    if settings.metrics.enabled {
        let addr = settings.metrics.listen.parse()?;
        hookrs::infrastructure::metrics::init_metrics(addr);
    }

    // 4. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 5. Initialize repositories
    let webhook_repository = Arc::new(WebhookRepoImpl::new(db.clone()));
    let delivery_repository = Arc::new(DeliveryRepoImpl::new(db.clone()));

    // 6. Initialize registry, dispatcher and sweeper
    let registry = Arc::new(WebhookRegistry::new(
        webhook_repository.clone(),
        delivery_repository.clone(),
        settings.webhook.allow_private_urls,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        webhook_repository.clone(),
        delivery_repository.clone(),
        Duration::from_secs(settings.webhook.delivery_timeout),
    ));
    let sweeper = Arc::new(RetrySweeper::new(
        delivery_repository.clone(),
        dispatcher.clone(),
        settings.webhook.sweep_batch_size,
        settings.webhook.sweep_concurrency,
    ));

    // 7. Setup auth state
    let auth_state = AuthState { db: db.clone() };

    // 8. Build HTTP router
    let app = routes::routes(auth_state)
        .layer(Extension(registry))
        .layer(Extension(dispatcher))
        .layer(Extension(sweeper))
        .layer(Extension(webhook_repository))
        .layer(Extension(delivery_repository))
        .layer(Extension(settings.clone()))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    // 9. Start HTTP server
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
