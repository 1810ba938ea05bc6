//! 认证和授权模块
//!
//! 提供Token签发校验、refresh token台账、密码哈希和Bearer认证中间件

pub mod middleware;
pub mod jwt;
pub mod password;
pub mod revocation;

// 重新导出常用类型
pub use jwt::{Claims, IssuedToken, JwtService, TokenError, TokenKind};
pub use middleware::Principal;
pub use revocation::RevocationLedger;

use thiserror::Error;

/// 认证失败
///
/// Display 文案直接返回给客户端，刻意不区分具体失败原因。
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    /// 密码哈希/校验本身失败，不直接返回给客户端
    #[error("密码处理失败: {0}")]
    Password(String),
}
