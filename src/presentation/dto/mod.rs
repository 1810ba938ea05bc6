//! 请求/响应数据结构

pub mod auth;

pub use auth::*;
