//! 采购订单聚合中的实体

use chrono::{DateTime, Utc};
use procure_domain_core::{Entity, Money};
use serde::{Deserialize, Serialize};

use super::totals::{OrderTotals, line_total, order_totals};
use super::value_objects::{Email, LineItemId, OrderNumber, PurchaseOrderId, SupplierId};

/// 供应商
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub email: Email,
}

impl Supplier {
    /// 部分覆盖：只修改提供了的字段
    pub fn apply(&mut self, changes: SupplierChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &SupplierId {
        &self.id
    }
}

/// 待创建的供应商
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplier {
    pub name: String,
    pub email: Email,
}

/// 供应商字段修改
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
}

/// 订单行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: PurchaseOrderId,
    pub item_name: String,
    pub quantity: i32,
    pub price_without_tax: Money,
    pub tax_name: String,
    pub tax_amount: Money,
}

impl LineItem {
    /// quantity * (price_without_tax + tax_amount)
    pub fn line_total(&self) -> Money {
        line_total(self.quantity, self.price_without_tax, self.tax_amount)
    }

    /// 部分覆盖：只修改提供了的字段，id 与所属订单不变
    pub fn apply(&mut self, changes: LineItemChanges) {
        if let Some(item_name) = changes.item_name {
            self.item_name = item_name;
        }
        if let Some(quantity) = changes.quantity {
            self.quantity = quantity;
        }
        if let Some(price) = changes.price_without_tax {
            self.price_without_tax = price;
        }
        if let Some(tax_name) = changes.tax_name {
            self.tax_name = tax_name;
        }
        if let Some(tax_amount) = changes.tax_amount {
            self.tax_amount = tax_amount;
        }
    }
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &LineItemId {
        &self.id
    }
}

/// 待创建的订单行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub item_name: String,
    pub quantity: i32,
    pub price_without_tax: Money,
    pub tax_name: String,
    pub tax_amount: Money,
}

/// 订单行字段修改
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemChanges {
    pub item_name: Option<String>,
    pub quantity: Option<i32>,
    pub price_without_tax: Option<Money>,
    pub tax_name: Option<String>,
    pub tax_amount: Option<Money>,
}

/// 订单表头（订单表中的一行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderHeader {
    pub id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub order_time: DateTime<Utc>,
    pub order_number: OrderNumber,
}

impl Entity for PurchaseOrderHeader {
    type Id = PurchaseOrderId;

    fn id(&self) -> &PurchaseOrderId {
        &self.id
    }
}

/// 待创建的订单，order_time 由存储分配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchaseOrder {
    pub supplier_id: SupplierId,
    pub order_number: OrderNumber,
}

/// 完整加载的采购订单
///
/// 汇总值每次都从当前订单行重新计算，不做缓存。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub supplier: Supplier,
    pub order_time: DateTime<Utc>,
    pub order_number: OrderNumber,
    pub line_items: Vec<LineItem>,
}

impl PurchaseOrder {
    pub fn assemble(
        header: PurchaseOrderHeader,
        supplier: Supplier,
        mut line_items: Vec<LineItem>,
    ) -> Self {
        line_items.sort_by_key(|item| item.id);
        Self {
            id: header.id,
            supplier,
            order_time: header.order_time,
            order_number: header.order_number,
            line_items,
        }
    }

    pub fn totals(&self) -> OrderTotals {
        order_totals(&self.line_items)
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &PurchaseOrderId {
        &self.id
    }
}
