//! 基础设施层模块
//!
//! 负责数据持久化、外部服务调用、配置管理等基础设施相关功能

pub mod config;
pub mod store;
pub mod repositories;
pub mod external;

// 重新导出常用类型和错误
pub use config::{Config, ConfigError};
pub use store::{KeyBuilder, KeyValueStore, MemoryStore, RedisStore, StoreError};
pub use repositories::UserRepository;
pub use external::{ExchangeError, IdentityExchange, WeChatClient, WeChatSession};
