//! 认证服务主入口

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service::infrastructure::{KeyValueStore, MemoryStore, RedisStore, WeChatClient};
use auth_service::{create_routes, AppState, Config};

/// 命令行参数，优先级高于环境变量
#[derive(Parser, Debug)]
#[command(name = "auth-service", about = "Token-based authentication service")]
struct Args {
    /// 监听地址
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(long)]
    port: Option<u16>,

    /// 使用进程内存储代替Redis（仅用于本地开发）
    #[arg(long, default_value_t = false)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 先加载.env，使其中的RUST_LOG生效
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("🚀 启动认证服务");

    let mut config = Config::load().context("加载配置失败")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!("✅ 配置加载成功");

    let store: Arc<dyn KeyValueStore> = if args.memory_store {
        warn!("⚠️ 使用内存存储，重启后数据丢失");
        Arc::new(MemoryStore::new())
    } else {
        let redis = RedisStore::connect(&config.redis)
            .await
            .with_context(|| format!("连接Redis失败: {}", config.redis.url))?;
        redis.ping().await.context("Redis PING失败")?;
        info!("✅ Redis连接成功");
        Arc::new(redis)
    };

    let exchange = Arc::new(WeChatClient::new(&config.wechat).context("创建微信客户端失败")?);

    let app_state = AppState::build(&config, store, exchange).context("初始化服务失败")?;
    let app = create_routes(app_state);
    info!("✅ 路由创建成功");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("无效的监听地址: {}:{}", config.server.host, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 服务器启动成功，监听: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 服务器已关闭");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("无法监听SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 接收到关闭信号，正在优雅关闭服务器...");
}
