//! PostgreSQL Unit of Work 与事务内仓储
//!
//! 同一 Unit of Work 内的仓储共享一个事务，而不是直接使用连接池。

use std::sync::Arc;

use async_trait::async_trait;
use procure_adapter_postgres::{
    TransactionManager, acquire_xact_lock, is_unique_violation, map_sqlx_error,
};
use procure_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use super::rows::{
    LineItemRow, PurchaseOrderRow, SupplierRow, into_line_items, into_suppliers,
};
use crate::domain::{
    Email, LineItem, LineItemId, LineItemRepository, NewLineItem, NewPurchaseOrder, NewSupplier,
    OrderFilter, OrderNumber, PurchaseOrderHeader, PurchaseOrderId, PurchaseOrderRepository,
    Supplier, SupplierId, SupplierRepository, UnitOfWork, UnitOfWorkFactory,
};

/// 订单编号分配使用的事务级咨询锁 key
pub const ORDER_NUMBER_LOCK_KEY: i64 = 0x5052_4f43_5f50_4f4e;

/// 共享事务
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

macro_rules! define_tx_repo {
    ($name:ident) => {
        pub struct $name {
            tx: SharedTx,
        }

        impl $name {
            pub fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

define_tx_repo!(TxSupplierRepository);
define_tx_repo!(TxPurchaseOrderRepository);
define_tx_repo!(TxLineItemRepository);

fn consumed() -> AppError {
    AppError::internal("Transaction consumed")
}

/// ILIKE 子串模式，转义 `%`、`_` 与 `\`
fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

const SUPPLIER_COLUMNS: &str = "id, name, email";
const ORDER_COLUMNS: &str = "id, supplier_id, order_time, order_number";
const ORDER_NUMBER_CONSTRAINT: &str = "purchase_orders_order_number_key";
const LINE_ITEM_COLUMNS: &str =
    "id, purchase_order_id, item_name, quantity, price_without_tax, tax_name, tax_amount";

#[async_trait]
impl SupplierRepository for TxSupplierRepository {
    async fn find_by_id(&self, id: &SupplierId) -> AppResult<Option<Supplier>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(SupplierRow::into_supplier).transpose()
    }

    async fn find_by_ids(&self, ids: &[SupplierId]) -> AppResult<Vec<Supplier>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        into_suppliers(rows)
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Supplier>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(SupplierRow::into_supplier).transpose()
    }

    async fn insert(&self, supplier: &NewSupplier) -> AppResult<Supplier> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "INSERT INTO suppliers (name, email) VALUES ($1, $2) RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(&supplier.name)
        .bind(supplier.email.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.into_supplier()
    }

    async fn update(&self, supplier: &Supplier) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let result = sqlx::query("UPDATE suppliers SET name = $2, email = $3 WHERE id = $1")
            .bind(supplier.id.0)
            .bind(&supplier.name)
            .bind(supplier.email.as_str())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Supplier {} not found",
                supplier.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PurchaseOrderRepository for TxPurchaseOrderRepository {
    async fn lock_max_order_number(&self) -> AppResult<Option<OrderNumber>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        acquire_xact_lock(&mut **tx, ORDER_NUMBER_LOCK_KEY).await?;

        let max = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(order_number) FROM purchase_orders",
        )
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(max.map(OrderNumber))
    }

    async fn insert(&self, order: &NewPurchaseOrder) -> AppResult<PurchaseOrderHeader> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            r#"
            INSERT INTO purchase_orders (supplier_id, order_number)
            VALUES ($1, $2)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.supplier_id.0)
        .bind(order.order_number.0)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, Some(ORDER_NUMBER_CONSTRAINT)) {
                AppError::conflict(format!(
                    "Order number {} is already taken",
                    order.order_number
                ))
            } else {
                map_sqlx_error(e)
            }
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &PurchaseOrderId) -> AppResult<Option<PurchaseOrderHeader>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_by_id_for_update(
        &self,
        id: &PurchaseOrderId,
    ) -> AppResult<Option<PurchaseOrderHeader>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, filter: &OrderFilter) -> AppResult<Vec<PurchaseOrderHeader>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let rows = sqlx::query_as::<_, PurchaseOrderRow>(
            r#"
            SELECT po.id, po.supplier_id, po.order_time, po.order_number
            FROM purchase_orders po
            JOIN suppliers s ON s.id = po.supplier_id
            WHERE ($1::TEXT IS NULL OR s.name ILIKE $1)
              AND ($2::TEXT IS NULL OR EXISTS (
                  SELECT 1 FROM line_items li
                  WHERE li.purchase_order_id = po.id AND li.item_name ILIKE $2
              ))
            ORDER BY po.id
            "#,
        )
        .bind(filter.supplier_name.as_deref().map(contains_pattern))
        .bind(filter.item_name.as_deref().map(contains_pattern))
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_supplier(
        &self,
        id: &PurchaseOrderId,
        supplier_id: &SupplierId,
    ) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let result = sqlx::query("UPDATE purchase_orders SET supplier_id = $2 WHERE id = $1")
            .bind(id.0)
            .bind(supplier_id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Purchase order {} not found", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &PurchaseOrderId) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LineItemRepository for TxLineItemRepository {
    async fn list_by_order(&self, order_id: &PurchaseOrderId) -> AppResult<Vec<LineItem>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let rows = sqlx::query_as::<_, LineItemRow>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE purchase_order_id = $1 ORDER BY id"
        ))
        .bind(order_id.0)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        into_line_items(rows)
    }

    async fn list_by_orders(&self, order_ids: &[PurchaseOrderId]) -> AppResult<Vec<LineItem>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let ids: Vec<i64> = order_ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, LineItemRow>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE purchase_order_id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        into_line_items(rows)
    }

    async fn insert(&self, order_id: &PurchaseOrderId, item: &NewLineItem) -> AppResult<LineItem> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row = sqlx::query_as::<_, LineItemRow>(&format!(
            r#"
            INSERT INTO line_items
                (purchase_order_id, item_name, quantity, price_without_tax, tax_name, tax_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LINE_ITEM_COLUMNS}
            "#
        ))
        .bind(order_id.0)
        .bind(&item.item_name)
        .bind(item.quantity)
        .bind(Decimal::from(item.price_without_tax))
        .bind(&item.tax_name)
        .bind(Decimal::from(item.tax_amount))
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.into_line_item()
    }

    async fn update(&self, item: &LineItem) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let result = sqlx::query(
            r#"
            UPDATE line_items
            SET item_name = $3, quantity = $4, price_without_tax = $5, tax_name = $6, tax_amount = $7
            WHERE id = $1 AND purchase_order_id = $2
            "#,
        )
        .bind(item.id.0)
        .bind(item.order_id.0)
        .bind(&item.item_name)
        .bind(item.quantity)
        .bind(Decimal::from(item.price_without_tax))
        .bind(&item.tax_name)
        .bind(Decimal::from(item.tax_amount))
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Line item {} not found in purchase order {}",
                item.id, item.order_id
            )));
        }
        Ok(())
    }

    async fn delete_many(&self, order_id: &PurchaseOrderId, ids: &[LineItemId]) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let result =
            sqlx::query("DELETE FROM line_items WHERE purchase_order_id = $1 AND id = ANY($2)")
                .bind(order_id.0)
                .bind(ids)
                .execute(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_by_order(&self, order_id: &PurchaseOrderId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let result = sqlx::query("DELETE FROM line_items WHERE purchase_order_id = $1")
            .bind(order_id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

/// Postgres Unit of Work 工厂
#[derive(Clone)]
pub struct PostgresUnitOfWorkFactory {
    manager: TransactionManager,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            manager: TransactionManager::new(pool),
        }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.manager.begin().await?;
        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }

    async fn begin_read_only(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.manager.begin_readonly().await?;
        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }
}

/// Postgres Unit of Work 实现
pub struct PostgresUnitOfWork {
    tx: SharedTx,
    supplier_repo: TxSupplierRepository,
    order_repo: TxPurchaseOrderRepository,
    line_item_repo: TxLineItemRepository,
}

impl PostgresUnitOfWork {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx = Arc::new(Mutex::new(Some(tx)));

        Self {
            supplier_repo: TxSupplierRepository::new(tx.clone()),
            order_repo: TxPurchaseOrderRepository::new(tx.clone()),
            line_item_repo: TxLineItemRepository::new(tx.clone()),
            tx,
        }
    }

    async fn take(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn suppliers(&self) -> &dyn SupplierRepository {
        &self.supplier_repo
    }

    fn purchase_orders(&self) -> &dyn PurchaseOrderRepository {
        &self.order_repo
    }

    fn line_items(&self) -> &dyn LineItemRepository {
        &self.line_item_repo
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let tx = self.take().await?;
        TransactionManager::commit(tx).await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let tx = self.take().await?;
        TransactionManager::rollback(tx).await
    }
}
