//! 常量定义模块

/// JWT相关常量
pub mod jwt {
    pub const JWT_SECRET_MIN_LENGTH: usize = 32;
    pub const ACCESS_TOKEN_EXPIRES_IN_SECONDS: u64 = 15 * 60; // 15分钟
    pub const REFRESH_TOKEN_EXPIRES_IN_SECONDS: u64 = 86400 * 7; // 7天
    /// Token有效期上限（10年）
    pub const MAX_TOKEN_TTL_SECONDS: u64 = 86400 * 365 * 10;
}

/// 存储键前缀
pub mod keys {
    pub const USER: &str = "user:";
    pub const USERNAME_INDEX: &str = "username:";
    pub const OPENID_INDEX: &str = "openid:";
    pub const REFRESH_TOKEN: &str = "refresh_token:";
}

/// 注册校验相关常量
pub mod register {
    pub const USERNAME_MIN_LENGTH: usize = 3;
    pub const USERNAME_MAX_LENGTH: usize = 30;
    pub const PASSWORD_MIN_LENGTH: usize = 6;
}

/// 微信小程序相关常量
pub mod wechat {
    pub const API_BASE_URL: &str = "https://api.weixin.qq.com";
    pub const CODE2SESSION_PATH: &str = "/sns/jscode2session";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;
    /// 微信用户的主ID前缀
    pub const USER_ID_PREFIX: &str = "wx_";
}

/// Redis相关常量
pub mod redis {
    pub const DEFAULT_URL: &str = "redis://localhost:6379";
    pub const OPERATION_TIMEOUT_SECONDS: u64 = 5;
}

/// 反向代理相关常量
pub mod proxy {
    pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8081";
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
    pub const DEFAULT_PATHS: &[&str] = &[
        "/v1/daily_house",
        "/v1/daily_new_house",
        "/v1/daily_unfinished_house",
        "/v1/month_house",
        "/v2/sh/new_daily_house",
        "/v2/sh/old_daily_house",
        "/v3/fortune/daily",
    ];
    /// 服务自身占用的路径，不能配置为代理路径
    pub const RESERVED_PATHS: &[&str] = &[
        "/health",
        "/register",
        "/login",
        "/wechat/login",
        "/refresh",
        "/logout",
        "/me",
        "/api/protected",
    ];
}
