//! 业务服务模块
//!
//! 会话编排与上游转发

pub mod proxy_forwarder;
pub mod session_service;

pub use proxy_forwarder::{ProxyForwarder, SharedProxyForwarder};
pub use session_service::{
    AccessGrant, Registration, SessionService, SharedSessionService, TokenPair,
};
