//! 统一错误处理模块
//!
//! 定义系统中所有错误类型，提供统一的错误处理机制

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::{AuthError, TokenError};
use crate::infrastructure::{ExchangeError, StoreError};

/// 应用程序统一错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 存储相关错误（Redis不可用、超时等，调用方可重试）
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 认证相关错误
    #[error("认证错误: {0}")]
    Authentication(#[from] AuthError),

    /// 验证错误
    #[error("验证错误: {0}")]
    Validation(String),

    /// 资源冲突错误
    #[error("冲突: {0}")]
    Conflict(String),

    /// 第三方身份交换错误
    #[error("身份交换错误: {0}")]
    IdentityExchange(#[from] ExchangeError),

    /// 外部服务错误（上游代理）
    #[error("外部服务错误: {0}")]
    ExternalService(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取HTTP状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::IdentityExchange(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Store(_) => "STORE_ERROR",
            AppError::Authentication(_) => "AUTH_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::IdentityExchange(_) => "IDENTITY_EXCHANGE_ERROR",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 返回给客户端的消息
    ///
    /// 认证错误只暴露通用文案；存储错误不暴露内部细节。
    pub fn client_message(&self) -> String {
        match self {
            AppError::Store(_) => "storage unavailable, please retry".to_string(),
            AppError::Authentication(AuthError::Password(_)) => {
                AuthError::InvalidCredentials.to_string()
            }
            AppError::Authentication(e) => e.to_string(),
            AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::IdentityExchange(e) => format!("failed to exchange code: {}", e),
            AppError::ExternalService(_) => "upstream service unavailable".to_string(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

/// 签发阶段的Token错误只可能来自服务端
impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        AppError::Internal(format!("failed to generate token: {}", e))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_code = self.error_code();

        if status_code.is_server_error() {
            tracing::error!(
                status = ?status_code,
                error_code = error_code,
                error = %self,
                "处理请求时发生错误"
            );
        } else {
            tracing::debug!(
                status = ?status_code,
                error_code = error_code,
                error = %self,
                "请求被拒绝"
            );
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.client_message(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status_code, body).into_response()
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 验证错误构造宏
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::shared::error::AppError::Validation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::Validation(format!($fmt, $($arg)*))
    };
}

/// 内部错误构造宏
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::shared::error::AppError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::shared::error::AppError::Internal(format!($fmt, $($arg)*))
    };
}
