//! 键值存储基础设施模块
//!
//! 用户记录、二级索引和refresh token台账都建立在同一个键值存储之上：
//! - Redis: 生产环境，依赖Redis原生的按键TTL
//! - 内存: 本地开发和测试

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

/// 存储错误，调用方可重试
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("存储后端错误: {0}")]
    Backend(String),
    #[error("存储操作超时")]
    Timeout,
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// 键值存储接口
///
/// 每个操作都是单键原子操作，不使用多键事务。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取键值，不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 写入键值（永不过期），覆盖已有值
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// 写入键值并设置过期时间，覆盖已有值
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// 删除键，返回是否确实删除了数据；删除不存在的键不是错误
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// 检查键是否存在
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// 连通性检查
    async fn ping(&self) -> Result<(), StoreError>;
}

/// 存储键构建器
#[derive(Debug, Clone, Default)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn build(&self, namespace: &str, id: &str) -> String {
        format!("{}{}{}", self.prefix, namespace, id)
    }
}
