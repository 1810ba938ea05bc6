//! 共享类型定义模块

use serde::{Deserialize, Serialize};

/// 用户ID类型（身份主键，作为所有token的subject）
pub type UserId = String;

/// 简单消息响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
