//! 认证中间件模块

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::{AuthError, TokenKind};
use crate::presentation::routes::AppState;
use crate::shared::types::UserId;
use crate::shared::AppError;

/// 通过access token认证的调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub UserId);

impl Principal {
    pub fn user_id(&self) -> &str {
        &self.0
    }
}

/// JWT认证中间件
///
/// 缺少头部、格式错误、签名无效、过期、类型错误一律返回同样的401。
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = {
        let token = extract_bearer_token(request.headers()).ok_or_else(|| {
            debug!("缺少或格式错误的Authorization头部");
            AppError::Authentication(AuthError::InvalidToken)
        })?;

        app_state
            .tokens
            .validate(token, TokenKind::Access)
            .map_err(|e| {
                debug!("access token校验失败: {}", e);
                AppError::Authentication(AuthError::InvalidToken)
            })?
    };

    request.extensions_mut().insert(Principal(claims.sub.clone()));
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// 从Authorization header中提取Bearer token，格式必须为 `Bearer {token}`
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme != "Bearer" || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}
