//! 供应商解析
//!
//! 订单创建与更新时，把提交的供应商解析为一条已持久化的供应商记录。

use procure_errors::AppError;
use tracing::debug;

use crate::domain::{NewSupplier, Supplier, SupplierChanges, SupplierId, SupplierRepository};
use crate::error::{OrderError, ServiceResult};

use super::commands::SupplierRef;

pub struct SupplierResolver<'a> {
    suppliers: &'a dyn SupplierRepository,
}

impl<'a> SupplierResolver<'a> {
    pub fn new(suppliers: &'a dyn SupplierRepository) -> Self {
        Self { suppliers }
    }

    /// 创建订单时解析供应商
    ///
    /// 带 id 时用提交的字段覆盖已有供应商，id 不存在则失败；
    /// 不带 id 时新建，邮箱已被占用则失败。
    pub async fn resolve_for_create(&self, supplier: SupplierRef) -> ServiceResult<Supplier> {
        match supplier {
            SupplierRef::Existing { id, changes } => self.update_existing(id, changes).await,
            SupplierRef::New(new_supplier) => {
                if self.suppliers.find_by_email(&new_supplier.email).await?.is_some() {
                    return Err(OrderError::DuplicateSupplierEmail(
                        new_supplier.email.into_inner(),
                    ));
                }
                self.insert(new_supplier).await
            }
        }
    }

    /// 更新订单时解析供应商
    ///
    /// 带 id 时用提交的字段覆盖已有供应商，id 不存在则失败；
    /// 不带 id 时按邮箱复用已有供应商（同步名称），否则新建。
    pub async fn resolve_for_update(&self, supplier: SupplierRef) -> ServiceResult<Supplier> {
        match supplier {
            SupplierRef::Existing { id, changes } => self.update_existing(id, changes).await,
            SupplierRef::New(new_supplier) => {
                match self.suppliers.find_by_email(&new_supplier.email).await? {
                    Some(mut existing) => {
                        if existing.name != new_supplier.name {
                            existing.name = new_supplier.name;
                            self.save(&existing).await?;
                        }
                        debug!(supplier_id = %existing.id, "Reusing supplier with matching email");
                        Ok(existing)
                    }
                    None => self.insert(new_supplier).await,
                }
            }
        }
    }

    /// 覆盖已有供应商中提交了的字段，未变化时不写库
    async fn update_existing(
        &self,
        id: SupplierId,
        changes: SupplierChanges,
    ) -> ServiceResult<Supplier> {
        let current = self
            .suppliers
            .find_by_id(&id)
            .await?
            .ok_or(OrderError::SupplierNotFound(id))?;

        let mut updated = current.clone();
        updated.apply(changes);
        if updated == current {
            return Ok(current);
        }

        if updated.email != current.email {
            let owner = self.suppliers.find_by_email(&updated.email).await?;
            if owner.is_some_and(|owner| owner.id != id) {
                return Err(OrderError::DuplicateSupplierEmail(
                    updated.email.into_inner(),
                ));
            }
        }

        self.save(&updated).await?;
        debug!(supplier_id = %id, "Supplier updated in place");
        Ok(updated)
    }

    async fn insert(&self, new_supplier: NewSupplier) -> ServiceResult<Supplier> {
        let email = new_supplier.email.clone();
        let supplier = self
            .suppliers
            .insert(&new_supplier)
            .await
            .map_err(|e| duplicate_email_or(e, email.as_str()))?;
        debug!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    async fn save(&self, supplier: &Supplier) -> ServiceResult<()> {
        self.suppliers
            .update(supplier)
            .await
            .map_err(|e| duplicate_email_or(e, supplier.email.as_str()))
    }
}

/// 唯一约束冲突只可能来自邮箱
fn duplicate_email_or(error: AppError, email: &str) -> OrderError {
    match error {
        AppError::Conflict(_) => OrderError::DuplicateSupplierEmail(email.to_string()),
        other => OrderError::Store(other),
    }
}
