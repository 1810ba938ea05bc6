//! 用户身份领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::constants::wechat::USER_ID_PREFIX;
use crate::shared::types::UserId;

/// 持久化的用户身份记录
///
/// 主ID创建后不可变；密码登录用户持有 username + password，
/// 微信用户持有 open_id。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// bcrypt哈希，微信用户为空
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 创建密码登录用户，主ID即用户名
    pub fn with_password(username: &str, password_hash: String, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: username.to_string(),
            username: username.to_string(),
            password: password_hash,
            email: email.to_string(),
            open_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 创建微信用户，主ID为 `wx_{openid}`，用户名与主ID相同
    pub fn with_open_id(open_id: &str) -> Self {
        let now = Utc::now();
        let id = format!("{}{}", USER_ID_PREFIX, open_id);
        Self {
            id: id.clone(),
            username: id,
            password: String::new(),
            email: String::new(),
            open_id: Some(open_id.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// 对外返回的用户信息（不含密码哈希）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            open_id: user.open_id.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wechat_user_ids() {
        let user = User::with_open_id("o6_bmjrPTlm6_2sgVt7hMZOPfL2M");
        assert_eq!(user.id, "wx_o6_bmjrPTlm6_2sgVt7hMZOPfL2M");
        assert_eq!(user.username, user.id);
        assert!(!user.has_password());
    }

    #[test]
    fn test_profile_omits_password() {
        let user = User::with_password("alice", "$2b$04$hash".to_string(), "a@x.com");
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("open_id").is_none());
        assert_eq!(json["id"], "alice");
    }
}
