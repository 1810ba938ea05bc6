//! Redis存储实现
//!
//! 所有命令都在超时内完成，超时和连接错误统一转换为 `StoreError`

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::IntoConnectionInfo;
use tracing::{debug, error, info};

use super::{KeyValueStore, StoreError};
use crate::infrastructure::config::RedisConfig;

/// Redis客户端封装
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    operation_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl RedisStore {
    /// 根据配置建立连接
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let mut info = config.url.as_str().into_connection_info()?;
        if let Some(password) = &config.password {
            info.redis.password = Some(password.clone());
        }
        if let Some(db) = config.db {
            info.redis.db = db;
        }

        let client = redis::Client::open(info)?;
        let operation_timeout = Duration::from_secs(config.operation_timeout_seconds.max(1));

        let conn = tokio::time::timeout(operation_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout)??;

        info!("Redis连接建立成功");
        Ok(Self {
            conn,
            operation_timeout,
        })
    }

    /// 在超时限制内执行一条命令
    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Redis {}操作失败: error={}", op, e);
                Err(e.into())
            }
            Err(_) => {
                error!("Redis {}操作超时: timeout={:?}", op, self.operation_timeout);
                Err(StoreError::Timeout)
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value = self
            .run(
                "GET",
                redis::cmd("GET")
                    .arg(key)
                    .query_async::<_, Option<String>>(&mut conn),
            )
            .await?;
        debug!("Redis GET: hit={}", value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(
            "SET",
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // Redis的EX不接受0
        let seconds = ttl.as_secs().max(1);
        self.run(
            "SETEX",
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(seconds)
                .query_async::<_, ()>(&mut conn),
        )
        .await?;
        debug!("Redis SETEX: ttl={}s", seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted = self
            .run(
                "DEL",
                redis::cmd("DEL").arg(key).query_async::<_, i64>(&mut conn),
            )
            .await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists = self
            .run(
                "EXISTS",
                redis::cmd("EXISTS").arg(key).query_async::<_, i64>(&mut conn),
            )
            .await?;
        Ok(exists > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.run(
            "PING",
            redis::cmd("PING").query_async::<_, String>(&mut conn),
        )
        .await?;
        Ok(())
    }
}
