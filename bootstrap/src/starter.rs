//! 服务启动器
//!
//! 提供统一的 HTTP 服务启动模式

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use procure_config::AppConfig;
use procure_errors::AppResult;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::infrastructure::Infrastructure;
use crate::runtime::{init_runtime, shutdown_signal};

/// 服务启动器配置
pub struct ServiceConfig {
    /// 配置目录
    pub config_dir: String,
    /// 服务内嵌的数据库迁移
    pub migrator: Option<&'static Migrator>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
            migrator: None,
        }
    }
}

impl ServiceConfig {
    /// 设置数据库迁移
    pub fn with_migrator(mut self, migrator: &'static Migrator) -> Self {
        self.migrator = Some(migrator);
        self
    }
}

/// 运行 HTTP 服务
///
/// 所有服务的统一入口点：
/// 1. 加载 `.env` 与配置
/// 2. 初始化运行时（日志、追踪）
/// 3. 创建基础设施资源（数据库连接池、迁移、metrics）
/// 4. 调用服务提供的闭包构建路由
/// 5. 启动服务器并处理 graceful shutdown
///
/// # 示例
///
/// ```ignore
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run_http_server(ServiceConfig::default(), |infra| async move {
///         Ok(my_routes(infra.postgres_pool()))
///     })
///     .await
/// }
/// ```
pub async fn run_http_server<F, Fut>(
    service_config: ServiceConfig,
    router_builder: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(Infrastructure) -> Fut,
    Fut: Future<Output = AppResult<Router>>,
{
    // 1. 加载配置
    let dotenv_path = dotenvy::dotenv().ok();
    let config = AppConfig::load(&service_config.config_dir)?;

    // 2. 初始化运行时
    init_runtime(&config);
    if let Some(path) = dotenv_path {
        info!(path = %path.display(), "Loaded .env file");
    }

    info!("Starting {} service", config.app_name);

    // 3. 创建基础设施（带重试）
    let infra = Infrastructure::from_config(&config, service_config.migrator).await?;

    // 4. 构建服务地址与路由
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = router_builder(infra)
        .await?
        .layer(TraceLayer::new_for_http());

    info!(%addr, "HTTP server starting");

    // 5. 启动服务器
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Service stopped");

    Ok(())
}
