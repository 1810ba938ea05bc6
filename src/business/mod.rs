//! 业务逻辑层模块
//!
//! 包含领域模型和服务编排

pub mod domain;
pub mod services;

pub use domain::{User, UserProfile};
pub use services::{ProxyForwarder, SessionService, TokenPair};
