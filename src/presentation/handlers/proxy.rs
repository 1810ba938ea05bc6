//! 上游代理处理器

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::Response,
    Extension,
};
use tracing::{info, instrument};

use crate::auth::Principal;
use crate::presentation::routes::AppState;
use crate::shared::{AppError, AppResult};

/// 将已认证请求转发到上游，回传状态码、content-type和响应体
#[instrument(skip_all, fields(path = %uri.path(), user_id = %principal.user_id()))]
pub async fn forward(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    uri: Uri,
    headers: HeaderMap,
) -> AppResult<Response> {
    let forwarder = app_state
        .proxy
        .as_ref()
        .ok_or_else(|| AppError::ExternalService("upstream proxy is not configured".to_string()))?;

    let upstream = forwarder.forward(uri.path(), uri.query(), &headers).await?;
    info!("📡 上游返回: {}", upstream.status);

    let status = StatusCode::from_u16(upstream.status)
        .map_err(|e| AppError::ExternalService(format!("invalid upstream status: {}", e)))?;

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = upstream.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder
        .body(Body::from(upstream.body))
        .map_err(|e| AppError::Internal(format!("failed to build response: {}", e)))
}
