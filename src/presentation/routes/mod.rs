//! 路由配置模块
//!
//! 组织共享状态和所有HTTP路由

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::middleware::auth_middleware;
use crate::auth::{JwtService, RevocationLedger};
use crate::business::services::{ProxyForwarder, SessionService, SharedProxyForwarder, SharedSessionService};
use crate::infrastructure::{Config, IdentityExchange, KeyBuilder, KeyValueStore, UserRepository};
use crate::presentation::handlers;
use crate::shared::AppResult;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub session: SharedSessionService,
    pub tokens: Arc<JwtService>,
    pub proxy: Option<SharedProxyForwarder>,
    pub proxy_paths: Arc<Vec<String>>,
}

impl AppState {
    /// 由配置、存储后端和身份交换实现组装全部服务
    pub fn build(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        exchange: Arc<dyn IdentityExchange>,
    ) -> AppResult<Self> {
        let keys = KeyBuilder::new(&config.redis.key_prefix);
        let tokens = Arc::new(JwtService::new(&config.jwt)?);

        let session = SessionService::new(
            UserRepository::new(store.clone(), keys.clone()),
            tokens.clone(),
            RevocationLedger::new(store, keys),
            exchange,
            config.auth.bcrypt_cost,
        );

        let proxy = ProxyForwarder::from_config(&config.proxy)?.map(Arc::new);

        Ok(Self {
            session: Arc::new(session),
            tokens,
            proxy,
            proxy_paths: Arc::new(config.proxy.paths.clone()),
        })
    }
}

/// 创建应用路由
pub fn create_routes(app_state: AppState) -> Router {
    // 公开路由
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/wechat/login", post(handlers::auth::wechat_login))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route("/logout", post(handlers::auth::logout));

    // 需要access token的路由
    let mut protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_current_user))
        .route("/api/protected", get(handlers::auth::protected));

    if app_state.proxy.is_some() {
        for path in app_state.proxy_paths.iter() {
            protected_routes = protected_routes.route(path, get(handlers::proxy::forward));
        }
        tracing::info!("🔗 已注册 {} 条代理路由", app_state.proxy_paths.len());
    }

    let protected_routes = protected_routes.route_layer(middleware::from_fn_with_state(
        app_state.clone(),
        auth_middleware,
    ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
        // 全局中间件
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
