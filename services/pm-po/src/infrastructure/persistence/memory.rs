//! 进程内存储
//!
//! 与 PostgreSQL 实现相同的仓储接口，供服务与 HTTP 层测试使用，
//! 仅在测试或启用 `test-util` feature 时编译。
//! 一个 Unit of Work 在整个生命周期内独占存储，在状态副本上读写；
//! 提交时替换为副本，回滚或直接丢弃时副本作废。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use procure_errors::{AppError, AppResult};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    Email, LineItem, LineItemId, LineItemRepository, NewLineItem, NewPurchaseOrder, NewSupplier,
    OrderFilter, OrderNumber, PurchaseOrderHeader, PurchaseOrderId, PurchaseOrderRepository,
    Supplier, SupplierId, SupplierRepository, UnitOfWork, UnitOfWorkFactory,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    suppliers: BTreeMap<SupplierId, Supplier>,
    orders: BTreeMap<PurchaseOrderId, PurchaseOrderHeader>,
    line_items: BTreeMap<LineItemId, LineItem>,
    last_supplier_id: i64,
    last_order_id: i64,
    last_line_item_id: i64,
}

impl StoreState {
    fn check_unique_email(&self, email: &Email, except: Option<SupplierId>) -> AppResult<()> {
        let taken = self
            .suppliers
            .values()
            .any(|s| s.email == *email && Some(s.id) != except);
        if taken {
            return Err(AppError::conflict(
                "Duplicate entry violates unique constraint suppliers_email_key",
            ));
        }
        Ok(())
    }

    fn check_unique_order_number(&self, number: OrderNumber) -> AppResult<()> {
        if self.orders.values().any(|o| o.order_number == number) {
            return Err(AppError::conflict(
                "Duplicate entry violates unique constraint purchase_orders_order_number_key",
            ));
        }
        Ok(())
    }
}

/// 进程内存储
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入一个供应商
    pub async fn seed_supplier(&self, name: &str, email: &str) -> AppResult<Supplier> {
        let email = Email::parse(email).map_err(AppError::validation)?;
        let mut state = self.state.lock().await;
        state.check_unique_email(&email, None)?;

        state.last_supplier_id += 1;
        let supplier = Supplier {
            id: SupplierId(state.last_supplier_id),
            name: name.to_string(),
            email,
        };
        state.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    pub async fn supplier_count(&self) -> usize {
        self.state.lock().await.suppliers.len()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn line_item_count(&self) -> usize {
        self.state.lock().await.line_items.len()
    }

    pub async fn line_item_exists(&self, id: LineItemId) -> bool {
        self.state.lock().await.line_items.contains_key(&id)
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork::new(guard)))
    }

    async fn begin_read_only(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.begin().await
    }
}

/// 事务内的工作副本
#[derive(Clone)]
struct WorkingCopy(Arc<StdMutex<StoreState>>);

impl WorkingCopy {
    fn lock(&self) -> AppResult<MutexGuard<'_, StoreState>> {
        self.0
            .lock()
            .map_err(|_| AppError::internal("In-memory store state poisoned"))
    }
}

struct MemoryUnitOfWork {
    committed: OwnedMutexGuard<StoreState>,
    work: WorkingCopy,
}

impl MemoryUnitOfWork {
    fn new(committed: OwnedMutexGuard<StoreState>) -> Self {
        let work = WorkingCopy(Arc::new(StdMutex::new(committed.clone())));
        Self { committed, work }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn suppliers(&self) -> &dyn SupplierRepository {
        &self.work
    }

    fn purchase_orders(&self) -> &dyn PurchaseOrderRepository {
        &self.work
    }

    fn line_items(&self) -> &dyn LineItemRepository {
        &self.work
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryUnitOfWork {
            mut committed,
            work,
        } = *self;
        let state = work.lock()?.clone();
        *committed = state;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SupplierRepository for WorkingCopy {
    async fn find_by_id(&self, id: &SupplierId) -> AppResult<Option<Supplier>> {
        Ok(self.lock()?.suppliers.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[SupplierId]) -> AppResult<Vec<Supplier>> {
        let state = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.suppliers.get(id).cloned())
            .collect())
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Supplier>> {
        Ok(self
            .lock()?
            .suppliers
            .values()
            .find(|s| s.email == *email)
            .cloned())
    }

    async fn insert(&self, supplier: &NewSupplier) -> AppResult<Supplier> {
        let mut state = self.lock()?;
        state.check_unique_email(&supplier.email, None)?;

        state.last_supplier_id += 1;
        let supplier = Supplier {
            id: SupplierId(state.last_supplier_id),
            name: supplier.name.clone(),
            email: supplier.email.clone(),
        };
        state.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn update(&self, supplier: &Supplier) -> AppResult<()> {
        let mut state = self.lock()?;
        state.check_unique_email(&supplier.email, Some(supplier.id))?;

        let slot = state
            .suppliers
            .get_mut(&supplier.id)
            .ok_or_else(|| AppError::not_found(format!("Supplier {} not found", supplier.id)))?;
        *slot = supplier.clone();
        Ok(())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl PurchaseOrderRepository for WorkingCopy {
    async fn lock_max_order_number(&self) -> AppResult<Option<OrderNumber>> {
        // Unit of Work 已独占存储
        Ok(self.lock()?.orders.values().map(|o| o.order_number).max())
    }

    async fn insert(&self, order: &NewPurchaseOrder) -> AppResult<PurchaseOrderHeader> {
        let mut state = self.lock()?;
        if !state.suppliers.contains_key(&order.supplier_id) {
            return Err(AppError::validation("Foreign key constraint violation"));
        }
        state.check_unique_order_number(order.order_number)?;

        state.last_order_id += 1;
        let header = PurchaseOrderHeader {
            id: PurchaseOrderId(state.last_order_id),
            supplier_id: order.supplier_id,
            order_time: Utc::now(),
            order_number: order.order_number,
        };
        state.orders.insert(header.id, header.clone());
        Ok(header)
    }

    async fn find_by_id(&self, id: &PurchaseOrderId) -> AppResult<Option<PurchaseOrderHeader>> {
        Ok(self.lock()?.orders.get(id).cloned())
    }

    async fn find_by_id_for_update(
        &self,
        id: &PurchaseOrderId,
    ) -> AppResult<Option<PurchaseOrderHeader>> {
        // Unit of Work 已独占存储
        PurchaseOrderRepository::find_by_id(self, id).await
    }

    async fn list(&self, filter: &OrderFilter) -> AppResult<Vec<PurchaseOrderHeader>> {
        let state = self.lock()?;
        let matches = |order: &PurchaseOrderHeader| {
            let supplier_ok = filter.supplier_name.as_deref().is_none_or(|name| {
                state
                    .suppliers
                    .get(&order.supplier_id)
                    .is_some_and(|s| contains_ignore_case(&s.name, name))
            });
            let item_ok = filter.item_name.as_deref().is_none_or(|name| {
                state
                    .line_items
                    .values()
                    .any(|i| i.order_id == order.id && contains_ignore_case(&i.item_name, name))
            });
            supplier_ok && item_ok
        };

        Ok(state
            .orders
            .values()
            .filter(|order| matches(order))
            .cloned()
            .collect())
    }

    async fn update_supplier(
        &self,
        id: &PurchaseOrderId,
        supplier_id: &SupplierId,
    ) -> AppResult<()> {
        let mut state = self.lock()?;
        if !state.suppliers.contains_key(supplier_id) {
            return Err(AppError::validation("Foreign key constraint violation"));
        }
        let order = state
            .orders
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Purchase order {} not found", id)))?;
        order.supplier_id = *supplier_id;
        Ok(())
    }

    async fn delete(&self, id: &PurchaseOrderId) -> AppResult<bool> {
        let mut state = self.lock()?;
        let removed = state.orders.remove(id).is_some();
        // ON DELETE CASCADE
        state.line_items.retain(|_, item| item.order_id != *id);
        Ok(removed)
    }
}

#[async_trait]
impl LineItemRepository for WorkingCopy {
    async fn list_by_order(&self, order_id: &PurchaseOrderId) -> AppResult<Vec<LineItem>> {
        Ok(self
            .lock()?
            .line_items
            .values()
            .filter(|item| item.order_id == *order_id)
            .cloned()
            .collect())
    }

    async fn list_by_orders(&self, order_ids: &[PurchaseOrderId]) -> AppResult<Vec<LineItem>> {
        Ok(self
            .lock()?
            .line_items
            .values()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect())
    }

    async fn insert(&self, order_id: &PurchaseOrderId, item: &NewLineItem) -> AppResult<LineItem> {
        let mut state = self.lock()?;
        if !state.orders.contains_key(order_id) {
            return Err(AppError::validation("Foreign key constraint violation"));
        }

        state.last_line_item_id += 1;
        let line_item = LineItem {
            id: LineItemId(state.last_line_item_id),
            order_id: *order_id,
            item_name: item.item_name.clone(),
            quantity: item.quantity,
            price_without_tax: item.price_without_tax,
            tax_name: item.tax_name.clone(),
            tax_amount: item.tax_amount,
        };
        state.line_items.insert(line_item.id, line_item.clone());
        Ok(line_item)
    }

    async fn update(&self, item: &LineItem) -> AppResult<()> {
        let mut state = self.lock()?;
        let slot = state
            .line_items
            .get_mut(&item.id)
            .filter(|current| current.order_id == item.order_id)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Line item {} not found in purchase order {}",
                    item.id, item.order_id
                ))
            })?;
        *slot = item.clone();
        Ok(())
    }

    async fn delete_many(&self, order_id: &PurchaseOrderId, ids: &[LineItemId]) -> AppResult<u64> {
        let mut state = self.lock()?;
        let before = state.line_items.len();
        state
            .line_items
            .retain(|id, item| !(item.order_id == *order_id && ids.contains(id)));
        Ok((before - state.line_items.len()) as u64)
    }

    async fn delete_by_order(&self, order_id: &PurchaseOrderId) -> AppResult<u64> {
        let mut state = self.lock()?;
        let before = state.line_items.len();
        state.line_items.retain(|_, item| item.order_id != *order_id);
        Ok((before - state.line_items.len()) as u64)
    }
}
