use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::time::Duration;

use crate::shared::constants;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub wechat: WeChatConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub password: Option<String>,
    pub db: Option<i64>,
    /// 所有键的公共前缀，默认为空
    pub key_prefix: String,
    pub operation_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeChatConfig {
    pub app_id: String,
    #[serde(skip_serializing)]
    pub app_secret: String,
    pub api_base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 上游地址，为空时不注册代理路由
    pub upstream_url: Option<String>,
    pub paths: Vec<String>,
    pub timeout_seconds: u64,
}

/// 配置加载错误（启动时致命）
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("缺少必需的配置项: {0}")]
    Missing(&'static str),
    #[error("配置项 {key} 无效: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl JwtConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_seconds)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_seconds)
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_key = get("JWT_SECRET_KEY").ok_or(ConfigError::Missing("JWT_SECRET_KEY"))?;
        if secret_key.len() < constants::jwt::JWT_SECRET_MIN_LENGTH {
            tracing::warn!(
                "⚠️ JWT_SECRET_KEY 长度不足 {} 字节，建议使用更长的密钥",
                constants::jwt::JWT_SECRET_MIN_LENGTH
            );
        }

        let jwt = JwtConfig {
            secret_key,
            access_token_ttl_seconds: parse_or(
                get("ACCESS_TOKEN_TTL_SECONDS"),
                "ACCESS_TOKEN_TTL_SECONDS",
                constants::jwt::ACCESS_TOKEN_EXPIRES_IN_SECONDS,
            )?,
            refresh_token_ttl_seconds: parse_or(
                get("REFRESH_TOKEN_TTL_SECONDS"),
                "REFRESH_TOKEN_TTL_SECONDS",
                constants::jwt::REFRESH_TOKEN_EXPIRES_IN_SECONDS,
            )?,
        };

        if jwt.access_token_ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "ACCESS_TOKEN_TTL_SECONDS",
                reason: "必须大于0".to_string(),
            });
        }
        if jwt.refresh_token_ttl_seconds > constants::jwt::MAX_TOKEN_TTL_SECONDS {
            return Err(ConfigError::Invalid {
                key: "REFRESH_TOKEN_TTL_SECONDS",
                reason: format!("不能超过 {} 秒", constants::jwt::MAX_TOKEN_TTL_SECONDS),
            });
        }
        if jwt.access_token_ttl_seconds >= jwt.refresh_token_ttl_seconds {
            return Err(ConfigError::Invalid {
                key: "REFRESH_TOKEN_TTL_SECONDS",
                reason: "必须大于 ACCESS_TOKEN_TTL_SECONDS".to_string(),
            });
        }

        let bcrypt_cost = parse_or(get("BCRYPT_COST"), "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: "取值范围为 4-31".to_string(),
            });
        }

        let proxy_paths = get("PROXY_PATHS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| {
                constants::proxy::DEFAULT_PATHS
                    .iter()
                    .map(|p| p.to_string())
                    .collect()
            });
        if let Some(bad) = proxy_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                key: "PROXY_PATHS",
                reason: format!("路径必须以 / 开头: {}", bad),
            });
        }
        if let Some(reserved) = proxy_paths
            .iter()
            .find(|p| constants::proxy::RESERVED_PATHS.contains(&p.as_str()))
        {
            return Err(ConfigError::Invalid {
                key: "PROXY_PATHS",
                reason: format!("路径已被服务占用: {}", reserved),
            });
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = proxy_paths.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(ConfigError::Invalid {
                key: "PROXY_PATHS",
                reason: format!("路径重复: {}", duplicate),
            });
        }

        let config = Config {
            server: ServerConfig {
                port: parse_or(get("PORT"), "PORT", 8080)?,
                host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            },

            redis: RedisConfig {
                url: get("REDIS_URL").unwrap_or_else(|| constants::redis::DEFAULT_URL.to_string()),
                password: get("REDIS_PASSWORD"),
                db: get("REDIS_DB")
                    .map(|v| {
                        v.parse().map_err(|_| ConfigError::Invalid {
                            key: "REDIS_DB",
                            reason: format!("无法解析: {}", v),
                        })
                    })
                    .transpose()?,
                key_prefix: lookup("REDIS_KEY_PREFIX").unwrap_or_default(),
                operation_timeout_seconds: parse_or(
                    get("REDIS_TIMEOUT_SECONDS"),
                    "REDIS_TIMEOUT_SECONDS",
                    constants::redis::OPERATION_TIMEOUT_SECONDS,
                )?,
            },

            jwt,

            auth: AuthConfig { bcrypt_cost },

            wechat: WeChatConfig {
                app_id: get("WECHAT_APPID").unwrap_or_default(),
                app_secret: get("WECHAT_APPSECRET").unwrap_or_default(),
                api_base_url: get("WECHAT_API_BASE_URL")
                    .unwrap_or_else(|| constants::wechat::API_BASE_URL.to_string()),
                timeout_seconds: parse_or(
                    get("WECHAT_TIMEOUT_SECONDS"),
                    "WECHAT_TIMEOUT_SECONDS",
                    constants::wechat::REQUEST_TIMEOUT_SECONDS,
                )?,
            },

            proxy: ProxyConfig {
                upstream_url: match lookup("PROXY_URL") {
                    Some(v) if v.trim().is_empty() => None,
                    Some(v) => Some(v),
                    None => Some(constants::proxy::DEFAULT_UPSTREAM_URL.to_string()),
                },
                paths: proxy_paths,
                timeout_seconds: parse_or(
                    get("PROXY_TIMEOUT_SECONDS"),
                    "PROXY_TIMEOUT_SECONDS",
                    constants::proxy::DEFAULT_TIMEOUT_SECONDS,
                )?,
            },
        };

        if config.wechat.app_id.is_empty() || config.wechat.app_secret.is_empty() {
            tracing::warn!("⚠️ 未配置 WECHAT_APPID/WECHAT_APPSECRET，微信登录将不可用");
        }

        Ok(config)
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("无法解析: {}", raw),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET_KEY"))));
        assert!(matches!(
            load(&[("JWT_SECRET_KEY", "  ")]),
            Err(ConfigError::Missing("JWT_SECRET_KEY"))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET_KEY", "k")]).unwrap();
        assert_eq!(config.jwt.access_token_ttl_seconds, 900);
        assert_eq!(config.jwt.refresh_token_ttl_seconds, 7 * 24 * 3600);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.redis.key_prefix, "");
        assert_eq!(config.proxy.paths.len(), 7);
        assert_eq!(
            config.proxy.upstream_url.as_deref(),
            Some(constants::proxy::DEFAULT_UPSTREAM_URL)
        );
    }

    #[test]
    fn test_access_ttl_must_be_shorter_than_refresh_ttl() {
        let result = load(&[
            ("JWT_SECRET_KEY", "k"),
            ("ACCESS_TOKEN_TTL_SECONDS", "3600"),
            ("REFRESH_TOKEN_TTL_SECONDS", "3600"),
        ]);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET_KEY", "k"),
            ("PORT", "9000"),
            ("REDIS_DB", "2"),
            ("PROXY_URL", ""),
            ("PROXY_PATHS", "/a, /b"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.redis.db, Some(2));
        assert!(config.proxy.upstream_url.is_none());
        assert_eq!(config.proxy.paths, vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        for ttl in ["18446744073709551615", "9223372036854775807", "315360001"] {
            assert!(matches!(
                load(&[("JWT_SECRET_KEY", "k"), ("REFRESH_TOKEN_TTL_SECONDS", ttl)]),
                Err(ConfigError::Invalid { key: "REFRESH_TOKEN_TTL_SECONDS", .. })
            ));
        }
        let config = load(&[("JWT_SECRET_KEY", "k"), ("REFRESH_TOKEN_TTL_SECONDS", "315360000")]).unwrap();
        assert_eq!(config.jwt.refresh_token_ttl_seconds, 315360000);
    }

    #[test]
    fn test_proxy_paths_must_not_clash() {
        for paths in ["/a,/a", "/me", "/v1/x, /health", "/login"] {
            assert!(matches!(
                load(&[("JWT_SECRET_KEY", "k"), ("PROXY_PATHS", paths)]),
                Err(ConfigError::Invalid { key: "PROXY_PATHS", .. })
            ));
        }
    }

    #[test]
    fn test_invalid_number() {
        assert!(matches!(
            load(&[("JWT_SECRET_KEY", "k"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
    }
}
