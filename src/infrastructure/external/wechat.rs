//! 微信小程序登录凭证校验
//!
//! 调用 `code2session` 接口将一次性 code 换成稳定的 OpenID

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::infrastructure::config::WeChatConfig;
use crate::shared::constants::wechat::CODE2SESSION_PATH;

/// 身份交换错误
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("请求微信接口失败: {0}")]
    Transport(String),
    #[error("解析微信响应失败: {0}")]
    InvalidResponse(String),
    #[error("WeChat API error: {code} - {message}")]
    Api { code: i64, message: String },
    #[error("微信返回的OpenID为空")]
    EmptyOpenId,
}

/// code2session 返回的会话信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeChatSession {
    pub open_id: String,
    pub session_key: String,
    pub union_id: Option<String>,
}

/// 第三方身份交换接口
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// 用一次性 code 换取稳定的外部身份
    async fn code_to_session(&self, code: &str) -> Result<WeChatSession, ExchangeError>;
}

#[derive(Debug, Deserialize)]
struct Code2SessionResponse {
    #[serde(default)]
    openid: String,
    #[serde(default)]
    session_key: String,
    #[serde(default)]
    unionid: Option<String>,
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl Code2SessionResponse {
    fn into_session(self) -> Result<WeChatSession, ExchangeError> {
        if self.errcode != 0 {
            return Err(ExchangeError::Api {
                code: self.errcode,
                message: self.errmsg,
            });
        }
        if self.openid.is_empty() {
            return Err(ExchangeError::EmptyOpenId);
        }
        Ok(WeChatSession {
            open_id: self.openid,
            session_key: self.session_key,
            union_id: self.unionid.filter(|u| !u.is_empty()),
        })
    }
}

/// 微信接口客户端
#[derive(Debug, Clone)]
pub struct WeChatClient {
    client: Client,
    app_id: String,
    app_secret: String,
    endpoint: String,
}

impl WeChatClient {
    pub fn new(config: &WeChatConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            endpoint: format!(
                "{}{}",
                config.api_base_url.trim_end_matches('/'),
                CODE2SESSION_PATH
            ),
        })
    }
}

#[async_trait]
impl IdentityExchange for WeChatClient {
    #[instrument(skip(self, code))]
    async fn code_to_session(&self, code: &str) -> Result<WeChatSession, ExchangeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("❌ 请求微信 code2session 失败: {}", e);
                ExchangeError::Transport(e.to_string())
            })?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let parsed: Code2SessionResponse = serde_json::from_slice(&body)
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))?;

        let session = parsed.into_session()?;
        debug!("微信 code2session 成功");
        Ok(session)
    }
}
