// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::delivery::sweeper::RetrySweeper;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// 重试清扫接口
///
/// 由进程外的定时任务周期性调用，使用独立的清扫令牌认证，
/// 与账户API密钥无关。操作幂等：没有到期记录时是一次空清扫。
pub async fn run_sweep<W, D>(
    Extension(sweeper): Extension<Arc<RetrySweeper<W, D>>>,
    Extension(settings): Extension<Arc<Settings>>,
    headers: HeaderMap,
) -> Response
where
    W: WebhookRepository + 'static,
    D: DeliveryRepository + 'static,
{
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == settings.webhook.sweep_token)
        .unwrap_or(false);

    if !authorized {
        let body = Json(json!({ "error": "Invalid sweep token" }));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }

    match sweeper.sweep().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Sweep failed: {}", e);
            let body = Json(json!({ "error": e.to_string() }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}
