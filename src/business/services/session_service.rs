//! 会话服务
//!
//! 编排凭证校验、Token签发和refresh token台账，实现注册、登录、微信登录、
//! 刷新、登出五个流程。服务本身不持有请求级可变状态。

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::auth::{password, AuthError, JwtService, RevocationLedger, TokenKind};
use crate::business::domain::User;
use crate::infrastructure::{IdentityExchange, UserRepository};
use crate::shared::constants::wechat::USER_ID_PREFIX;
use crate::shared::types::UserId;
use crate::shared::utils::{is_valid_email, validation};
use crate::shared::{AppError, AppResult};
use crate::{internal_error, validation_error};

/// 登录成功后返回的token对
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// access token有效期（秒）
    pub expires_in: u64,
}

/// 刷新后返回的access token
#[derive(Debug, Clone, Serialize)]
pub struct AccessGrant {
    pub access_token: String,
    pub expires_in: u64,
}

/// 注册参数
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

pub type SharedSessionService = Arc<SessionService>;

pub struct SessionService {
    users: UserRepository,
    tokens: Arc<JwtService>,
    ledger: RevocationLedger,
    exchange: Arc<dyn IdentityExchange>,
    bcrypt_cost: u32,
}

impl SessionService {
    pub fn new(
        users: UserRepository,
        tokens: Arc<JwtService>,
        ledger: RevocationLedger,
        exchange: Arc<dyn IdentityExchange>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            tokens,
            ledger,
            exchange,
            bcrypt_cost,
        }
    }

    /// 用户注册，返回新用户ID
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> AppResult<UserId> {
        let Registration {
            username,
            password,
            email,
        } = registration;

        if !validation::is_valid_username(&username) {
            return Err(validation_error!("username must be between 3 and 30 characters"));
        }
        if username.starts_with(USER_ID_PREFIX) {
            return Err(validation_error!("username prefix '{}' is reserved", USER_ID_PREFIX));
        }
        if !validation::is_valid_password(&password) {
            return Err(validation_error!("password must be at least 6 characters"));
        }
        if !is_valid_email(&email) {
            return Err(validation_error!("invalid email address"));
        }

        if self.users.get_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("username already exists".to_string()));
        }

        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
            .await
            .map_err(|e| internal_error!("password hashing task failed: {}", e))?
            .map_err(|e| {
                warn!("密码哈希失败: {}", e);
                internal_error!("failed to hash password")
            })?;

        let mut user = User::with_password(&username, password_hash, &email);
        self.users.create(&mut user).await?;

        info!("✅ 用户注册成功: {}", user.id);
        Ok(user.id)
    }

    /// 用户名密码登录
    ///
    /// 用户不存在与密码错误返回完全相同的错误。
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let Some(user) = self.users.get_by_username(username).await? else {
            warn!("用户不存在: {}", username);
            return Err(AuthError::InvalidCredentials.into());
        };

        if !user.has_password() {
            warn!("用户没有设置密码: {}", username);
            return Err(AuthError::InvalidCredentials.into());
        }

        let password = password.to_string();
        let password_hash = user.password.clone();
        let is_valid = tokio::task::spawn_blocking(move || {
            password::verify_password(&password, &password_hash)
        })
        .await
        .map_err(|e| internal_error!("password verification task failed: {}", e))?
        .unwrap_or_else(|e| {
            warn!("密码校验异常: {}", e);
            false
        });

        if !is_valid {
            warn!("密码错误: {}", username);
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.start_session(&user.id).await?;
        info!("✅ 用户登录成功: {}", user.id);
        Ok(pair)
    }

    /// 微信小程序登录，首次登录自动创建用户
    #[instrument(skip(self, code))]
    pub async fn wechat_login(&self, code: &str) -> AppResult<TokenPair> {
        let session = self.exchange.code_to_session(code).await?;
        let user = self
            .users
            .find_or_create_wechat_user(&session.open_id)
            .await?;

        let pair = self.start_session(&user.id).await?;
        info!("✅ 微信登录成功: {}", user.id);
        Ok(pair)
    }

    /// 用refresh token换取新的access token
    ///
    /// 需要同时满足：签名与有效期合法、类型为refresh、台账中存在且归属一致。
    /// refresh token本身不轮换。
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AccessGrant> {
        let claims = self
            .tokens
            .validate(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                warn!("refresh token校验失败: {}", e);
                AuthError::InvalidRefreshToken
            })?;

        match self.ledger.lookup(refresh_token).await? {
            Some(owner) if owner == claims.sub => {}
            Some(owner) => {
                warn!("refresh token归属不一致: claims={}, ledger={}", claims.sub, owner);
                return Err(AuthError::InvalidRefreshToken.into());
            }
            None => {
                warn!("refresh token已撤销: user_id={}", claims.sub);
                return Err(AuthError::InvalidRefreshToken.into());
            }
        }

        let access = self.tokens.issue(&claims.sub, TokenKind::Access)?;
        info!("✅ Token刷新成功: 用户ID {}", claims.sub);

        Ok(AccessGrant {
            access_token: access.token,
            expires_in: access.ttl.as_secs(),
        })
    }

    /// 登出：无条件删除台账记录，不校验token本身
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        self.ledger.revoke(refresh_token).await?;
        info!("👋 refresh token已撤销");
        Ok(())
    }

    /// 获取当前用户
    pub async fn current_user(&self, user_id: &str) -> AppResult<User> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| internal_error!("failed to get user"))
    }

    /// 签发access + refresh token，并登记refresh token
    async fn start_session(&self, user_id: &str) -> AppResult<TokenPair> {
        let access = self.tokens.issue(user_id, TokenKind::Access)?;
        let refresh = self.tokens.issue(user_id, TokenKind::Refresh)?;

        self.ledger
            .record(&refresh.token, user_id, refresh.ttl)
            .await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: access.ttl.as_secs(),
        })
    }
}
