//! PostgreSQL 连接管理

use std::str::FromStr;
use std::time::Duration;

use procure_config::AppConfig;
use procure_errors::{AppError, AppResult};
use secrecy::{ExposeSecret, Secret};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// 空闲连接回收时间
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// PostgreSQL 连接池配置
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: Secret<String>,
    /// 写入 `application_name`，便于在 `pg_stat_activity` 中区分服务
    pub application_name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
}

impl PostgresConfig {
    /// 从应用配置构建，最小连接数不超过最大连接数
    pub fn from_app_config(config: &AppConfig) -> Self {
        let database = &config.database;
        Self {
            url: database.url.clone(),
            application_name: config.app_name.clone(),
            max_connections: database.max_connections,
            min_connections: database.min_connections.min(database.max_connections),
            connect_timeout: Duration::from_secs(database.connect_timeout_secs),
        }
    }

    /// 解析连接串；格式错误属于配置问题，返回 Validation
    pub fn connect_options(&self) -> AppResult<PgConnectOptions> {
        let options = PgConnectOptions::from_str(self.url.expose_secret())
            .map_err(|_| AppError::validation("Invalid database url"))?;
        Ok(options.application_name(&self.application_name))
    }
}

/// 创建 PostgreSQL 连接池
pub async fn create_pool(config: &PostgresConfig) -> AppResult<PgPool> {
    let options = config.connect_options()?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(IDLE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database(format!("Failed to create pool: {}", e)))
}

/// 检查数据库连接
pub async fn check_connection(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Database health check failed: {}", e)))?;
    Ok(())
}
