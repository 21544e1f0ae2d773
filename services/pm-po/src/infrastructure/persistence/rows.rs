//! 数据库行结构

use chrono::{DateTime, Utc};
use procure_domain_core::Money;
use procure_errors::{AppError, AppResult};
use rust_decimal::Decimal;

use crate::domain::{
    Email, LineItem, LineItemId, OrderNumber, PurchaseOrderHeader, PurchaseOrderId, Supplier,
    SupplierId,
};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SupplierRow {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl SupplierRow {
    pub fn into_supplier(self) -> AppResult<Supplier> {
        let email = Email::parse(&self.email).map_err(|e| {
            AppError::internal(format!("Stored email of supplier {} is invalid: {}", self.id, e))
        })?;
        Ok(Supplier {
            id: SupplierId(self.id),
            name: self.name,
            email,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PurchaseOrderRow {
    pub id: i64,
    pub supplier_id: i64,
    pub order_time: DateTime<Utc>,
    pub order_number: i64,
}

impl From<PurchaseOrderRow> for PurchaseOrderHeader {
    fn from(row: PurchaseOrderRow) -> Self {
        Self {
            id: PurchaseOrderId(row.id),
            supplier_id: SupplierId(row.supplier_id),
            order_time: row.order_time,
            order_number: OrderNumber(row.order_number),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct LineItemRow {
    pub id: i64,
    pub purchase_order_id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub price_without_tax: Decimal,
    pub tax_name: String,
    pub tax_amount: Decimal,
}

impl LineItemRow {
    pub fn into_line_item(self) -> AppResult<LineItem> {
        let money = |value: Decimal, column: &str| {
            Money::new(value).map_err(|e| {
                AppError::internal(format!("Stored {} of line item {} is invalid: {}", column, self.id, e))
            })
        };
        Ok(LineItem {
            id: LineItemId(self.id),
            order_id: PurchaseOrderId(self.purchase_order_id),
            price_without_tax: money(self.price_without_tax, "price_without_tax")?,
            tax_amount: money(self.tax_amount, "tax_amount")?,
            item_name: self.item_name,
            quantity: self.quantity,
            tax_name: self.tax_name,
        })
    }
}

pub(super) fn into_line_items(rows: Vec<LineItemRow>) -> AppResult<Vec<LineItem>> {
    rows.into_iter().map(LineItemRow::into_line_item).collect()
}

pub(super) fn into_suppliers(rows: Vec<SupplierRow>) -> AppResult<Vec<Supplier>> {
    rows.into_iter().map(SupplierRow::into_supplier).collect()
}
