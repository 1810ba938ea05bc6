//! 工具函数模块

/// 验证邮箱格式
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// 时间戳工具
pub mod time {
    use chrono::Utc;

    /// 当前Unix时间戳（秒）
    pub fn now_timestamp() -> i64 {
        Utc::now().timestamp()
    }
}

/// 验证工具
pub mod validation {
    use crate::shared::constants::register::*;

    /// 验证用户名长度（3-30位，按字符计）
    pub fn is_valid_username(username: &str) -> bool {
        let len = username.chars().count();
        (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len)
    }

    /// 验证密码长度（至少6位）
    pub fn is_valid_password(password: &str) -> bool {
        password.chars().count() >= PASSWORD_MIN_LENGTH
    }
}
