// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Extension, Router};
use axum_test::TestServer;
use chrono::{Duration as ChronoDuration, Utc};
use hookrs::config::settings::{
    DatabaseSettings, MetricsSettings, ServerSettings, Settings, WebhookSettings,
};
use hookrs::delivery::dispatcher::Dispatcher;
use hookrs::delivery::sweeper::RetrySweeper;
use hookrs::domain::repositories::delivery_repository::DeliveryRepository;
use hookrs::domain::use_cases::webhook_registry::WebhookRegistry;
use hookrs::infrastructure::database::entities::{account, api_key};
use hookrs::infrastructure::repositories::delivery_repo_impl::DeliveryRepoImpl;
use hookrs::infrastructure::repositories::webhook_repo_impl::WebhookRepoImpl;
use hookrs::presentation::middleware::auth_middleware::AuthState;
use hookrs::presentation::routes;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;

pub type TestRegistry = WebhookRegistry<WebhookRepoImpl, DeliveryRepoImpl>;
pub type TestDispatcher = Dispatcher<WebhookRepoImpl, DeliveryRepoImpl>;
pub type TestSweeper = RetrySweeper<WebhookRepoImpl, DeliveryRepoImpl>;

/// 测试用的清扫令牌
pub const SWEEP_TOKEN: &str = "test-sweep-token";

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<DatabaseConnection>,
    pub owner_id: Uuid,
    pub api_key: String,
    pub webhook_repo: Arc<WebhookRepoImpl>,
    pub delivery_repo: Arc<DeliveryRepoImpl>,
    pub registry: Arc<TestRegistry>,
    pub dispatcher: Arc<TestDispatcher>,
    pub sweeper: Arc<TestSweeper>,
}

pub async fn create_test_app() -> TestApp {
    // In-memory sqlite: a single connection so every query sees the same
    // database
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1);
    let db = Arc::new(
        Database::connect(opt)
            .await
            .expect("Failed to connect to sqlite"),
    );

    Migrator::up(db.as_ref(), None)
        .await
        .expect("Failed to run migrations");

    let (owner_id, api_key) = seed_owner(&db, "test-account").await;

    let webhook_repo = Arc::new(WebhookRepoImpl::new(db.clone()));
    let delivery_repo = Arc::new(DeliveryRepoImpl::new(db.clone()));

    // Private URLs allowed so deliveries can hit loopback sinks
    let registry = Arc::new(WebhookRegistry::new(
        webhook_repo.clone(),
        delivery_repo.clone(),
        true,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        webhook_repo.clone(),
        delivery_repo.clone(),
        Duration::from_secs(5),
    ));
    let sweeper = Arc::new(RetrySweeper::new(
        delivery_repo.clone(),
        dispatcher.clone(),
        50,
        5,
    ));

    let settings = Arc::new(Settings {
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: None,
            min_connections: None,
            connect_timeout: None,
            idle_timeout: None,
        },
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        metrics: MetricsSettings {
            enabled: false,
            listen: "127.0.0.1:9000".to_string(),
        },
        webhook: WebhookSettings {
            delivery_timeout: 5,
            sweep_token: SWEEP_TOKEN.to_string(),
            sweep_batch_size: 50,
            sweep_concurrency: 5,
            allow_private_urls: true,
        },
    });

    let auth_state = AuthState { db: db.clone() };
    let app = routes::routes(auth_state)
        .layer(Extension(registry.clone()))
        .layer(Extension(dispatcher.clone()))
        .layer(Extension(sweeper.clone()))
        .layer(Extension(webhook_repo.clone()))
        .layer(Extension(delivery_repo.clone()))
        .layer(Extension(settings));

    let server = TestServer::new(app).expect("Failed to start test server");

    TestApp {
        server,
        db,
        owner_id,
        api_key,
        webhook_repo,
        delivery_repo,
        registry,
        dispatcher,
        sweeper,
    }
}

/// 创建账户和API密钥
pub async fn seed_owner(db: &DatabaseConnection, name: &str) -> (Uuid, String) {
    let owner_id = Uuid::new_v4();
    account::ActiveModel {
        id: Set(owner_id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to seed account");

    let key = format!("test-key-{}", Uuid::new_v4());
    api_key::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        key: Set(key.clone()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to seed api key");

    (owner_id, key)
}

/// 启动一个固定响应状态的HTTP回调端点
pub async fn start_sink(status: StatusCode) -> String {
    let app = Router::new().route("/webhook", post(move || async move { status }));
    serve_sink(app).await
}

/// 启动一个返回固定响应体的HTTP回调端点
pub async fn start_sink_with_body(status: StatusCode, body: String) -> String {
    let app = Router::new().route(
        "/webhook",
        post(move || {
            let body = body.clone();
            async move { (status, body) }
        }),
    );
    serve_sink(app).await
}

pub struct CapturedRequest {
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// 启动一个记录请求头和请求体的HTTP回调端点
pub async fn start_capture_sink() -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let captured: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let store = captured.clone();

    let app = Router::new().route(
        "/webhook",
        post(move |headers: HeaderMap, body: Bytes| {
            let store = store.clone();
            async move {
                store.lock().unwrap().push(CapturedRequest {
                    headers,
                    body: body.to_vec(),
                });
                StatusCode::OK
            }
        }),
    );

    (serve_sink(app).await, captured)
}

async fn serve_sink(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/webhook", addr)
}

/// 把投递记录的下次重试时间强制改到过去，使其对清扫可见
pub async fn force_due(app: &TestApp, delivery_id: Uuid) {
    let mut delivery = app
        .delivery_repo
        .find_by_id(delivery_id)
        .await
        .expect("DB error")
        .expect("Delivery should exist");
    delivery.next_retry_at = Some(Utc::now() - ChronoDuration::seconds(1));
    app.delivery_repo
        .update(&delivery)
        .await
        .expect("Failed to update delivery");
}
