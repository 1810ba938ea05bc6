//! 外部服务模块

pub mod wechat;

pub use wechat::{ExchangeError, IdentityExchange, WeChatClient, WeChatSession};
