//! 认证处理器
//!
//! 处理注册、登录、微信登录、token刷新、登出和当前用户查询

use axum::{extract::State, http::StatusCode, response::Json, Extension};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::auth::Principal;
use crate::business::domain::UserProfile;
use crate::business::services::{AccessGrant, Registration, TokenPair};
use crate::presentation::dto::{
    AppJson, LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse, WeChatLoginRequest,
};
use crate::presentation::routes::AppState;
use crate::shared::{AppResult, MessageResponse};
use crate::validation_error;

/// 用户注册
#[instrument(skip(app_state, request), fields(username = %request.username))]
pub async fn register(
    State(app_state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    info!("📝 用户注册请求");

    let user_id = app_state
        .session
        .register(Registration {
            username: request.username,
            password: request.password,
            email: request.email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "user registered successfully".to_string(),
            user_id,
        }),
    ))
}

/// 用户名密码登录
#[instrument(skip(app_state, request), fields(username = %request.username))]
pub async fn login(
    State(app_state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    info!("🔐 用户登录请求");

    if request.username.is_empty() || request.password.is_empty() {
        return Err(validation_error!("username and password are required"));
    }

    let pair = app_state
        .session
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(pair))
}

/// 微信小程序登录
#[instrument(skip(app_state, request))]
pub async fn wechat_login(
    State(app_state): State<AppState>,
    AppJson(request): AppJson<WeChatLoginRequest>,
) -> AppResult<Json<TokenPair>> {
    info!("🔐 微信登录请求");

    if request.code.is_empty() {
        return Err(validation_error!("code is required"));
    }

    let pair = app_state.session.wechat_login(&request.code).await?;
    Ok(Json(pair))
}

/// 刷新access token
#[instrument(skip(app_state, request))]
pub async fn refresh_token(
    State(app_state): State<AppState>,
    AppJson(request): AppJson<RefreshRequest>,
) -> AppResult<Json<AccessGrant>> {
    if request.refresh_token.is_empty() {
        return Err(validation_error!("refresh_token is required"));
    }

    let grant = app_state.session.refresh(&request.refresh_token).await?;
    Ok(Json(grant))
}

/// 登出
#[instrument(skip(app_state, request))]
pub async fn logout(
    State(app_state): State<AppState>,
    AppJson(request): AppJson<RefreshRequest>,
) -> AppResult<Json<MessageResponse>> {
    if request.refresh_token.is_empty() {
        return Err(validation_error!("refresh_token is required"));
    }

    app_state.session.logout(&request.refresh_token).await?;
    Ok(Json(MessageResponse::new("logged out successfully")))
}

/// 获取当前用户信息
#[instrument(skip(app_state, principal), fields(user_id = %principal.user_id()))]
pub async fn get_current_user(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<UserProfile>> {
    let user = app_state.session.current_user(principal.user_id()).await?;
    Ok(Json(user.profile()))
}

/// 受保护的示例接口
pub async fn protected(Extension(principal): Extension<Principal>) -> Json<Value> {
    Json(json!({
        "message": "this is a protected endpoint",
        "user_id": principal.user_id(),
    }))
}
