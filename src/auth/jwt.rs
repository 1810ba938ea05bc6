//! JWT Token处理模块
//!
//! 签发与校验 access / refresh 两类 token。两类 token 使用同一个 HMAC 密钥，
//! 通过 `type` 声明区分用途，校验时必须与期望类型一致。

use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::config::JwtConfig;
use crate::shared::types::UserId;
use crate::shared::utils::time::now_timestamp;

/// 签名算法
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// 可接受的算法（HMAC族）
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT Claims结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Token签发/校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("签名密钥未配置")]
    MissingSecret,
    #[error("Token签名失败: {0}")]
    Signing(String),
    #[error("Token格式错误")]
    Malformed,
    #[error("不支持的签名算法")]
    UnsupportedAlgorithm,
    #[error("Token签名无效")]
    InvalidSignature,
    #[error("Token已过期")]
    Expired,
    #[error("Token尚未生效")]
    NotYetValid,
    #[error("Token类型错误: 期望 {expected}, 实际 {actual}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            _ => TokenError::Malformed,
        }
    }
}

/// 签发结果
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub ttl: Duration,
}

/// JWT Token服务
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// 创建新的JWT服务，密钥为空视为配置错误
    pub fn new(config: &JwtConfig) -> Result<Self, TokenError> {
        Self::with_ttls(
            &config.secret_key,
            config.access_token_ttl(),
            config.refresh_token_ttl(),
        )
    }

    pub fn with_ttls(
        secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// 签发指定类型的Token
    pub fn issue(&self, subject: &str, kind: TokenKind) -> Result<IssuedToken, TokenError> {
        let ttl = self.ttl(kind);
        let now = now_timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| TokenError::Signing(format!("{} token有效期溢出: {:?}", kind, ttl)))?;
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            iat: now,
            nbf: now,
            exp,
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, claims, ttl })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// 校验Token的签名、有效期和类型
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)?;

        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }

        Ok(claims)
    }
}
