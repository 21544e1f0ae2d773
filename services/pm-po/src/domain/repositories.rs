//! 仓储接口

use async_trait::async_trait;
use procure_errors::AppResult;

use super::entities::{
    LineItem, NewLineItem, NewPurchaseOrder, NewSupplier, PurchaseOrderHeader, Supplier,
};
use super::value_objects::{Email, LineItemId, OrderNumber, PurchaseOrderId, SupplierId};

/// 订单列表过滤条件
///
/// 两个条件都是大小写不敏感的子串匹配，同时提供时取交集。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub supplier_name: Option<String>,
    pub item_name: Option<String>,
}

/// 供应商仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SupplierRepository: Send + Sync {
    /// 根据 ID 查找供应商
    async fn find_by_id(&self, id: &SupplierId) -> AppResult<Option<Supplier>>;

    /// 根据多个 ID 批量查找供应商
    async fn find_by_ids(&self, ids: &[SupplierId]) -> AppResult<Vec<Supplier>>;

    /// 根据邮箱查找供应商
    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Supplier>>;

    /// 创建供应商，邮箱重复时返回 Conflict
    async fn insert(&self, supplier: &NewSupplier) -> AppResult<Supplier>;

    /// 更新供应商，邮箱重复时返回 Conflict
    async fn update(&self, supplier: &Supplier) -> AppResult<()>;
}

/// 采购订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseOrderRepository: Send + Sync {
    /// 锁定订单编号分配并读取当前最大编号
    ///
    /// 锁在事务结束前一直持有，并发创建订单的事务在此排队。
    async fn lock_max_order_number(&self) -> AppResult<Option<OrderNumber>>;

    /// 创建订单
    async fn insert(&self, order: &NewPurchaseOrder) -> AppResult<PurchaseOrderHeader>;

    /// 根据 ID 查找订单
    async fn find_by_id(&self, id: &PurchaseOrderId) -> AppResult<Option<PurchaseOrderHeader>>;

    /// 根据 ID 查找并锁定订单
    ///
    /// 行锁持有到事务结束，同一订单的并发修改与删除在此排队。
    async fn find_by_id_for_update(
        &self,
        id: &PurchaseOrderId,
    ) -> AppResult<Option<PurchaseOrderHeader>>;

    /// 按条件列出订单，按 id 升序
    async fn list(&self, filter: &OrderFilter) -> AppResult<Vec<PurchaseOrderHeader>>;

    /// 修改订单引用的供应商
    async fn update_supplier(&self, id: &PurchaseOrderId, supplier_id: &SupplierId)
    -> AppResult<()>;

    /// 删除订单，返回是否存在
    async fn delete(&self, id: &PurchaseOrderId) -> AppResult<bool>;
}

/// 订单行仓储接口
///
/// 所有写操作都限定在给定订单内。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LineItemRepository: Send + Sync {
    /// 列出订单的全部订单行，按 id 升序
    async fn list_by_order(&self, order_id: &PurchaseOrderId) -> AppResult<Vec<LineItem>>;

    /// 批量列出多个订单的订单行
    async fn list_by_orders(&self, order_ids: &[PurchaseOrderId]) -> AppResult<Vec<LineItem>>;

    /// 为订单新建订单行
    async fn insert(&self, order_id: &PurchaseOrderId, item: &NewLineItem) -> AppResult<LineItem>;

    /// 更新订单行（按 id 与所属订单匹配）
    async fn update(&self, item: &LineItem) -> AppResult<()>;

    /// 删除订单中的指定订单行，返回删除数量
    async fn delete_many(&self, order_id: &PurchaseOrderId, ids: &[LineItemId]) -> AppResult<u64>;

    /// 删除订单的全部订单行
    async fn delete_by_order(&self, order_id: &PurchaseOrderId) -> AppResult<u64>;
}
