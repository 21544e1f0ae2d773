//! Unit of Work 模式
//!
//! 提供跨多个 Repository 的事务协调能力，确保操作的原子性。

use async_trait::async_trait;
use procure_errors::AppResult;

use super::repositories::{LineItemRepository, PurchaseOrderRepository, SupplierRepository};

/// Unit of Work trait
///
/// 协调多个 Repository 在同一事务中的操作。未提交即丢弃时等同回滚。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 获取供应商 Repository
    fn suppliers(&self) -> &dyn SupplierRepository;

    /// 获取采购订单 Repository
    fn purchase_orders(&self) -> &dyn PurchaseOrderRepository;

    /// 获取订单行 Repository
    fn line_items(&self) -> &dyn LineItemRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂 trait
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// 开始新的读写事务
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// 开始只读事务
    async fn begin_read_only(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
