//! 持久化实现

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;
mod rows;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryStore;
pub use postgres::{ORDER_NUMBER_LOCK_KEY, PostgresUnitOfWork, PostgresUnitOfWorkFactory};

use sqlx::migrate::Migrator;

/// 内嵌的数据库迁移
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
