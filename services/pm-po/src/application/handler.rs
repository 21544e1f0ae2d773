//! 采购订单服务
//!
//! 每个操作在一个 Unit of Work 内完成，任何错误都会回滚整个操作。

use std::collections::HashMap;
use std::sync::Arc;

use procure_errors::AppError;
use tracing::{debug, error, info, warn};

use crate::domain::numbering::next_order_number;
use crate::domain::reconciliation::plan_reconciliation;
use crate::domain::{
    LineItem, NewPurchaseOrder, PurchaseOrder, PurchaseOrderHeader, PurchaseOrderId, SupplierId,
    UnitOfWork, UnitOfWorkFactory,
};
use crate::error::{OrderError, ServiceResult};
use crate::infrastructure::metrics;

use super::commands::{
    CreatePurchaseOrderCommand, ListPurchaseOrdersQuery, UpdatePurchaseOrderCommand,
};
use super::supplier_resolver::SupplierResolver;

/// 采购订单服务
pub struct PurchaseOrderService {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl PurchaseOrderService {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    /// 列出订单，可按供应商名称与订单行名称过滤
    pub async fn list(&self, query: ListPurchaseOrdersQuery) -> ServiceResult<Vec<PurchaseOrder>> {
        let filter = query.into_filter();
        let uow = self.uow_factory.begin_read_only().await?;

        let result = async {
            let headers = uow.purchase_orders().list(&filter).await?;
            hydrate(uow.as_ref(), headers).await
        }
        .await;

        finish(uow, result)
            .await
            .inspect_err(|e| report_failure("list", e))
    }

    /// 获取单个订单
    pub async fn get(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        let uow = self.uow_factory.begin_read_only().await?;
        let result = load_order(uow.as_ref(), id).await;

        finish(uow, result)
            .await
            .inspect_err(|e| report_failure("get", e))
    }

    /// 创建订单
    pub async fn create(&self, cmd: CreatePurchaseOrderCommand) -> ServiceResult<PurchaseOrder> {
        let result = self.create_inner(cmd).await;
        match &result {
            Ok(order) => {
                metrics::record_order_created();
                info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    supplier_id = %order.supplier.id,
                    line_items = order.line_items.len(),
                    "Purchase order created"
                );
            }
            Err(e) => report_failure("create", e),
        }
        result
    }

    async fn create_inner(&self, cmd: CreatePurchaseOrderCommand) -> ServiceResult<PurchaseOrder> {
        let cmd = cmd.validate()?;
        let uow = self.uow_factory.begin().await?;

        let result = async {
            let supplier = SupplierResolver::new(uow.suppliers())
                .resolve_for_create(cmd.supplier)
                .await?;

            let order_number = next_order_number(uow.purchase_orders()).await?;
            let header = uow
                .purchase_orders()
                .insert(&NewPurchaseOrder {
                    supplier_id: supplier.id,
                    order_number,
                })
                .await?;

            let mut line_items = Vec::with_capacity(cmd.line_items.len());
            for item in &cmd.line_items {
                line_items.push(uow.line_items().insert(&header.id, item).await?);
            }

            Ok::<_, OrderError>(PurchaseOrder::assemble(header, supplier, line_items))
        }
        .await;

        finish(uow, result).await
    }

    /// 更新订单
    ///
    /// 订单行整体替换，order_number 与 order_time 不变。
    pub async fn update(
        &self,
        id: PurchaseOrderId,
        cmd: UpdatePurchaseOrderCommand,
    ) -> ServiceResult<PurchaseOrder> {
        let result = self.update_inner(id, cmd).await;
        match &result {
            Ok(order) => {
                metrics::record_order_updated();
                info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    supplier_id = %order.supplier.id,
                    line_items = order.line_items.len(),
                    "Purchase order updated"
                );
            }
            Err(e) => report_failure("update", e),
        }
        result
    }

    async fn update_inner(
        &self,
        id: PurchaseOrderId,
        cmd: UpdatePurchaseOrderCommand,
    ) -> ServiceResult<PurchaseOrder> {
        let uow = self.uow_factory.begin().await?;

        let result = async {
            let header = lock_header(uow.as_ref(), id).await?;
            // 订单存在时才校验提交内容，未知 id 优先返回 NotFound
            let cmd = cmd.validate()?;

            let supplier = SupplierResolver::new(uow.suppliers())
                .resolve_for_update(cmd.supplier)
                .await?;
            if supplier.id != header.supplier_id {
                uow.purchase_orders()
                    .update_supplier(&id, &supplier.id)
                    .await?;
            }

            let existing = uow.line_items().list_by_order(&id).await?;
            let plan = plan_reconciliation(&existing, cmd.line_items)?;

            let line_items = if plan.is_noop() {
                debug!(order_id = %id, "Line items unchanged");
                existing
            } else {
                for item in &plan.updates {
                    uow.line_items().update(item).await?;
                }
                for item in &plan.inserts {
                    uow.line_items().insert(&id, item).await?;
                }
                if !plan.deletions.is_empty() {
                    uow.line_items().delete_many(&id, &plan.deletions).await?;
                }

                debug!(
                    order_id = %id,
                    updated = plan.updates.len(),
                    inserted = plan.inserts.len(),
                    deleted = plan.deletions.len(),
                    "Line items reconciled"
                );
                uow.line_items().list_by_order(&id).await?
            };
            let header = PurchaseOrderHeader {
                supplier_id: supplier.id,
                ..header
            };
            Ok::<_, OrderError>(PurchaseOrder::assemble(header, supplier, line_items))
        }
        .await;

        finish(uow, result).await
    }

    /// 删除订单及其全部订单行
    pub async fn delete(&self, id: PurchaseOrderId) -> ServiceResult<()> {
        let result = self.delete_inner(id).await;
        match &result {
            Ok(removed_items) => {
                metrics::record_order_deleted();
                info!(order_id = %id, line_items = removed_items, "Purchase order deleted");
            }
            Err(e) => report_failure("delete", e),
        }
        result.map(|_| ())
    }

    async fn delete_inner(&self, id: PurchaseOrderId) -> ServiceResult<u64> {
        let uow = self.uow_factory.begin().await?;

        let result = async {
            lock_header(uow.as_ref(), id).await?;
            let removed_items = uow.line_items().delete_by_order(&id).await?;
            if !uow.purchase_orders().delete(&id).await? {
                return Err(OrderError::PurchaseOrderNotFound(id));
            }
            Ok::<_, OrderError>(removed_items)
        }
        .await;

        finish(uow, result).await
    }
}

/// 成功则提交，失败则回滚
async fn finish<T>(uow: Box<dyn UnitOfWork>, result: ServiceResult<T>) -> ServiceResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = uow.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

fn report_failure(operation: &'static str, error: &OrderError) {
    metrics::record_failure(operation);
    if error.is_server_error() {
        error!(operation, error = %error, "Purchase order operation failed");
    } else {
        warn!(operation, error = %error, "Purchase order request rejected");
    }
}

async fn find_header(
    uow: &dyn UnitOfWork,
    id: PurchaseOrderId,
) -> ServiceResult<PurchaseOrderHeader> {
    uow.purchase_orders()
        .find_by_id(&id)
        .await?
        .ok_or(OrderError::PurchaseOrderNotFound(id))
}

/// 读取并锁定订单表头，直到 Unit of Work 结束
async fn lock_header(
    uow: &dyn UnitOfWork,
    id: PurchaseOrderId,
) -> ServiceResult<PurchaseOrderHeader> {
    uow.purchase_orders()
        .find_by_id_for_update(&id)
        .await?
        .ok_or(OrderError::PurchaseOrderNotFound(id))
}

async fn load_order(uow: &dyn UnitOfWork, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
    let header = find_header(uow, id).await?;
    let mut orders = hydrate(uow, vec![header]).await?;
    orders
        .pop()
        .ok_or(OrderError::PurchaseOrderNotFound(id))
}

/// 为订单表头加载供应商与订单行
async fn hydrate(
    uow: &dyn UnitOfWork,
    headers: Vec<PurchaseOrderHeader>,
) -> ServiceResult<Vec<PurchaseOrder>> {
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let mut supplier_ids: Vec<SupplierId> = headers.iter().map(|h| h.supplier_id).collect();
    supplier_ids.sort();
    supplier_ids.dedup();
    let suppliers: HashMap<_, _> = uow
        .suppliers()
        .find_by_ids(&supplier_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let order_ids: Vec<PurchaseOrderId> = headers.iter().map(|h| h.id).collect();
    let mut items_by_order: HashMap<PurchaseOrderId, Vec<LineItem>> = HashMap::new();
    for item in uow.line_items().list_by_orders(&order_ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    headers
        .into_iter()
        .map(|header| {
            let supplier = suppliers.get(&header.supplier_id).cloned().ok_or_else(|| {
                OrderError::Store(AppError::internal(format!(
                    "Supplier {} of purchase order {} is missing",
                    header.supplier_id, header.id
                )))
            })?;
            let line_items = items_by_order.remove(&header.id).unwrap_or_default();
            Ok(PurchaseOrder::assemble(header, supplier, line_items))
        })
        .collect()
}
