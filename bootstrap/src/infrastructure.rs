//! 基础设施资源管理
//!
//! 统一管理服务共享的基础设施资源

use metrics_exporter_prometheus::PrometheusHandle;
use procure_adapter_postgres::{PostgresConfig, apply_migrations, check_connection, create_pool};
use procure_config::AppConfig;
use procure_errors::AppResult;
use procure_telemetry::{HealthStatus, init_metrics};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::{info, warn};

use crate::retry::{RetryPolicy, retry_startup};

/// 就绪检查失败时对外的固定说明
const UNAVAILABLE: &str = "unavailable";

/// 基础设施资源容器
///
/// 由 bootstrap 统一初始化后交给服务构建路由
#[derive(Clone)]
pub struct Infrastructure {
    /// PostgreSQL 连接池
    postgres_pool: PgPool,
    /// Prometheus 渲染句柄（recorder 安装失败时为空）
    metrics_handle: Option<PrometheusHandle>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    pub async fn from_config(config: &AppConfig, migrator: Option<&Migrator>) -> AppResult<Self> {
        // 1. 创建 PostgreSQL 连接池（必需，带重试）
        let pg_config = PostgresConfig::from_app_config(config);
        let policy = RetryPolicy::for_database(&config.database);
        let postgres_pool =
            retry_startup(&policy, "postgres", || create_pool(&pg_config)).await?;
        info!(
            max_connections = pg_config.max_connections,
            "PostgreSQL connection pool created"
        );

        // 2. 执行迁移（可选）
        match migrator {
            Some(migrator) if config.database.run_migrations => {
                apply_migrations(&postgres_pool, migrator).await?;
            }
            Some(_) => info!("Database migrations disabled by configuration"),
            None => {}
        }

        // 3. 安装 Prometheus recorder
        let metrics_handle = match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Metrics recorder not installed, continuing without it");
                None
            }
        };

        Ok(Self {
            postgres_pool,
            metrics_handle,
        })
    }

    /// 获取 PostgreSQL 连接池
    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    /// 获取 Prometheus 渲染句柄
    pub fn metrics_handle(&self) -> Option<PrometheusHandle> {
        self.metrics_handle.clone()
    }

    /// 就绪检查
    pub async fn readiness(&self) -> HealthStatus {
        let mut status = HealthStatus::new();
        record_check(&mut status, "postgres", check_connection(&self.postgres_pool).await);
        status
    }
}

/// 记录一项检查结果；失败原因只写日志，不进入响应体
fn record_check(status: &mut HealthStatus, name: &'static str, result: AppResult<()>) {
    match result {
        Ok(()) => status.add_check(name, true, None),
        Err(e) => {
            warn!(check = name, error = %e, "Readiness check failed");
            status.add_check(name, false, Some(UNAVAILABLE.to_string()));
        }
    }
}
