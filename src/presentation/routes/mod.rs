// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::repositories::delivery_repo_impl::DeliveryRepoImpl;
use crate::infrastructure::repositories::webhook_repo_impl::WebhookRepoImpl;
use crate::presentation::handlers::{sweep_handler, webhook_handler};
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use axum::{
    routing::{get, post},
    Router,
};

/// 创建应用路由
///
/// 公开路由（健康检查、版本）不需要认证；`/internal/sweep` 使用
/// 独立的清扫令牌；其余Webhook接口经过API密钥认证中间件。
///
/// # 参数
///
/// * `auth_state` - 认证状态
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(auth_state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let internal_routes = Router::new().route(
        "/internal/sweep",
        post(sweep_handler::run_sweep::<WebhookRepoImpl, DeliveryRepoImpl>),
    );

    let protected_routes = Router::new()
        .route(
            "/v1/webhooks",
            get(webhook_handler::list_webhooks::<WebhookRepoImpl, DeliveryRepoImpl>)
                .post(webhook_handler::create_webhook::<WebhookRepoImpl, DeliveryRepoImpl>),
        )
        .route(
            "/v1/webhooks/{id}",
            get(webhook_handler::get_webhook::<WebhookRepoImpl, DeliveryRepoImpl>)
                .patch(webhook_handler::update_webhook::<WebhookRepoImpl, DeliveryRepoImpl>)
                .delete(webhook_handler::delete_webhook::<WebhookRepoImpl, DeliveryRepoImpl>),
        )
        .route(
            "/v1/webhooks/{id}/rotate-secret",
            post(webhook_handler::rotate_secret::<WebhookRepoImpl, DeliveryRepoImpl>),
        )
        .route(
            "/v1/webhooks/{id}/test",
            post(webhook_handler::test_webhook::<WebhookRepoImpl, DeliveryRepoImpl>),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(internal_routes)
        .merge(protected_routes)
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
