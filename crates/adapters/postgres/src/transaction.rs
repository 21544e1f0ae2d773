//! PostgreSQL 事务管理模块
//!
//! 读写/只读事务与事务级咨询锁

use procure_errors::{AppError, AppResult};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

/// 事务管理器
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    /// 创建新的事务管理器
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 开始读写事务（READ COMMITTED）
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))
    }

    /// 开始只读事务，事务内的写语句会被数据库拒绝
    pub async fn begin_readonly(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to set transaction read only: {}", e)))?;
        Ok(tx)
    }

    /// 提交事务
    pub async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
    }

    /// 回滚事务
    pub async fn rollback(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.rollback()
            .await
            .map_err(|e| AppError::database(format!("Failed to rollback transaction: {}", e)))
    }
}

/// 获取事务级咨询锁，事务结束（提交或回滚）时自动释放
///
/// 同一 key 的并发事务在此处排队，用于串行化"读取最大值再写入"一类操作。
pub async fn acquire_xact_lock(conn: &mut PgConnection, key: i64) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(key)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to acquire advisory lock: {}", e)))?;

    debug!(lock_key = key, "Advisory transaction lock acquired");
    Ok(())
}
