//! PostgreSQL 迁移执行

use procure_errors::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

/// 应用内嵌迁移（由服务通过 `sqlx::migrate!` 提供）
pub async fn apply_migrations(pool: &PgPool, migrator: &Migrator) -> AppResult<()> {
    let pending = migrator.iter().count();

    migrator
        .run(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to apply migrations: {}", e)))?;

    info!(migrations = pending, "Database migrations applied");
    Ok(())
}
