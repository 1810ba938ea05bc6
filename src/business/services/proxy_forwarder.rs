//! 上游转发服务
//!
//! 将已认证的GET请求原样转发到配置的上游服务，并回传状态码、
//! content-type 和响应体。

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, error, info};
use url::Url;
use uuid::Uuid;

use crate::infrastructure::config::ProxyConfig;
use crate::shared::{AppError, AppResult};

/// 不向上游透传的逐跳头部
const SKIPPED_HEADERS: &[&str] = &["host", "connection", "content-length", "transfer-encoding"];

pub type SharedProxyForwarder = Arc<ProxyForwarder>;

/// 上游响应
#[derive(Debug)]
pub struct ForwardedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ProxyForwarder {
    client: Client,
    upstream: Url,
}

impl ProxyForwarder {
    /// 根据配置创建转发器，未配置上游时返回 `None`
    pub fn from_config(config: &ProxyConfig) -> AppResult<Option<Self>> {
        let Some(upstream) = config.upstream_url.as_deref() else {
            info!("🔗 未配置上游地址，代理路由不启用");
            return Ok(None);
        };

        let upstream = Url::parse(upstream)
            .map_err(|e| AppError::Internal(format!("invalid upstream url '{}': {}", upstream, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .no_gzip()
            .build()
            .map_err(|e| {
                error!("❌ 创建HTTP客户端失败: {}", e);
                AppError::Internal(format!("failed to build http client: {}", e))
            })?;

        info!("🔗 上游代理已启用: {}", upstream);
        Ok(Some(Self { client, upstream }))
    }

    /// 拼接上游地址：上游路径 + 请求路径 + 原始查询串
    fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let base = self.upstream.as_str().trim_end_matches('/');
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", base, path, q),
            _ => format!("{}{}", base, path),
        }
    }

    /// 转发GET请求
    pub async fn forward(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> AppResult<ForwardedResponse> {
        let request_id = Uuid::new_v4();
        let target = self.target_url(path, query);
        debug!(%request_id, "➡️  转发请求: {}", target);

        let mut builder = self.client.get(&target);
        for (name, value) in headers {
            if SKIPPED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        if let Some(host) = headers.get(header::HOST) {
            builder = builder.header("X-Forwarded-Host", host.as_bytes());
        }

        let response = builder.send().await.map_err(|e| {
            error!(%request_id, "❌ 上游请求失败: {}", e);
            AppError::ExternalService(format!("upstream request failed: {}", e))
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| {
            error!(%request_id, "❌ 读取上游响应失败: {}", e);
            AppError::ExternalService(format!("failed to read upstream response: {}", e))
        })?;

        debug!(%request_id, status, "⬅️  上游响应 {} 字节", body.len());
        Ok(ForwardedResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::RawQuery, routing::get, Json, Router};
    use axum::http::HeaderValue;
    use serde_json::{json, Value};

    fn config(upstream: Option<String>) -> ProxyConfig {
        ProxyConfig {
            upstream_url: upstream,
            paths: vec!["/v1/daily_house".to_string()],
            timeout_seconds: 5,
        }
    }

    /// 启动一个回显请求信息的上游服务
    async fn spawn_upstream() -> String {
        async fn echo(RawQuery(query): RawQuery, headers: HeaderMap) -> Json<Value> {
            let forwarded = headers
                .get("x-forwarded-host")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Json(json!({ "query": query, "forwarded_host": forwarded }))
        }

        let app = Router::new()
            .route("/v1/daily_house", get(echo))
            .route(
                "/v1/month_house",
                get(|| async { (axum::http::StatusCode::IM_A_TEAPOT, "short and stout") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_disabled_without_upstream() {
        assert!(ProxyForwarder::from_config(&config(None)).unwrap().is_none());
    }

    #[test]
    fn test_invalid_upstream_rejected() {
        assert!(ProxyForwarder::from_config(&config(Some("not a url".into()))).is_err());
    }

    #[test]
    fn test_target_url() {
        let forwarder = ProxyForwarder::from_config(&config(Some("http://upstream:8081/".into())))
            .unwrap()
            .unwrap();
        assert_eq!(
            forwarder.target_url("/v1/daily_house", Some("city=sh")),
            "http://upstream:8081/v1/daily_house?city=sh"
        );
        assert_eq!(
            forwarder.target_url("/v1/daily_house", None),
            "http://upstream:8081/v1/daily_house"
        );
    }

    #[tokio::test]
    async fn test_forward_relays_query_and_host() {
        let upstream = spawn_upstream().await;
        let forwarder = ProxyForwarder::from_config(&config(Some(upstream)))
            .unwrap()
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.example.com"));

        let response = forwarder
            .forward("/v1/daily_house", Some("date=2024-01-01"), &headers)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert!(response.content_type.unwrap().starts_with("application/json"));

        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["query"], "date=2024-01-01");
        assert_eq!(body["forwarded_host"], "api.example.com");
    }

    #[tokio::test]
    async fn test_forward_relays_upstream_status() {
        let upstream = spawn_upstream().await;
        let forwarder = ProxyForwarder::from_config(&config(Some(upstream)))
            .unwrap()
            .unwrap();

        let response = forwarder
            .forward("/v1/month_house", None, &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status, 418);
        assert_eq!(&response.body[..], b"short and stout");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_external_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = ProxyForwarder::from_config(&config(Some(format!("http://{}", addr))))
            .unwrap()
            .unwrap();
        let err = forwarder
            .forward("/v1/daily_house", None, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }
}
