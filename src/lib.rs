//! 认证服务
//!
//! 基于Redis的用户注册、登录、微信登录与JWT会话管理，附带Bearer保护的上游代理

// 核心模块
pub mod shared;          // 共享模块（错误处理、类型定义、工具函数）
pub mod infrastructure;  // 基础设施层（存储、配置、外部服务）
pub mod business;        // 业务逻辑层（领域模型、会话服务、上游转发）
pub mod presentation;    // 表示层（HTTP处理、路由）
pub mod auth;            // 认证和授权模块

// 重新导出核心类型
pub use infrastructure::Config;
pub use presentation::{create_routes, AppState};
pub use shared::{AppError, AppResult};
