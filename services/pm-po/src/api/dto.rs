//! 请求与响应 DTO
//!
//! 请求中的只读字段（order_number、order_time、汇总值、line_total）被忽略。

use chrono::{DateTime, Utc};
use procure_domain_core::Money;
use serde::{Deserialize, Serialize};

use crate::application::{
    CreatePurchaseOrderCommand, LineItemInput, ListPurchaseOrdersQuery, SupplierInput,
    UpdatePurchaseOrderCommand,
};
use crate::domain::{
    LineItem, LineItemId, OrderNumber, PurchaseOrder, PurchaseOrderId, Supplier, SupplierId,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierRequest {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItemRequest {
    pub id: Option<i64>,
    pub item_name: Option<String>,
    pub quantity: Option<i64>,
    pub price_without_tax: Option<Money>,
    pub tax_name: Option<String>,
    pub tax_amount: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseOrderRequest {
    pub supplier: SupplierRequest,
    #[serde(default)]
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersParams {
    pub supplier_name: Option<String>,
    pub item_name: Option<String>,
}

impl From<SupplierRequest> for SupplierInput {
    fn from(req: SupplierRequest) -> Self {
        Self {
            id: req.id,
            name: req.name,
            email: req.email,
        }
    }
}

impl From<LineItemRequest> for LineItemInput {
    fn from(req: LineItemRequest) -> Self {
        Self {
            id: req.id,
            item_name: req.item_name,
            quantity: req.quantity,
            price_without_tax: req.price_without_tax,
            tax_name: req.tax_name,
            tax_amount: req.tax_amount,
        }
    }
}

impl From<PurchaseOrderRequest> for CreatePurchaseOrderCommand {
    fn from(req: PurchaseOrderRequest) -> Self {
        Self {
            supplier: req.supplier.into(),
            line_items: req.line_items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<PurchaseOrderRequest> for UpdatePurchaseOrderCommand {
    fn from(req: PurchaseOrderRequest) -> Self {
        Self {
            supplier: req.supplier.into(),
            line_items: req.line_items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ListOrdersParams> for ListPurchaseOrdersQuery {
    fn from(params: ListOrdersParams) -> Self {
        Self {
            supplier_name: params.supplier_name,
            item_name: params.item_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplierResponse {
    pub id: SupplierId,
    pub name: String,
    pub email: String,
}

impl From<Supplier> for SupplierResponse {
    fn from(supplier: Supplier) -> Self {
        Self {
            id: supplier.id,
            name: supplier.name,
            email: supplier.email.into_inner(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineItemResponse {
    pub id: LineItemId,
    pub item_name: String,
    pub quantity: i32,
    pub price_without_tax: Money,
    pub tax_name: String,
    pub tax_amount: Money,
    pub line_total: Money,
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        Self {
            line_total: item.line_total(),
            id: item.id,
            item_name: item.item_name,
            quantity: item.quantity,
            price_without_tax: item.price_without_tax,
            tax_name: item.tax_name,
            tax_amount: item.tax_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderResponse {
    pub id: PurchaseOrderId,
    pub supplier: SupplierResponse,
    pub line_items: Vec<LineItemResponse>,
    pub total_amount: Money,
    pub total_quantity: i64,
    pub total_tax: Money,
    pub order_time: DateTime<Utc>,
    pub order_number: OrderNumber,
}

impl From<PurchaseOrder> for PurchaseOrderResponse {
    fn from(order: PurchaseOrder) -> Self {
        let totals = order.totals();
        Self {
            id: order.id,
            supplier: order.supplier.into(),
            line_items: order.line_items.into_iter().map(Into::into).collect(),
            total_amount: totals.total_amount,
            total_quantity: totals.total_quantity,
            total_tax: totals.total_tax,
            order_time: order.order_time,
            order_number: order.order_number,
        }
    }
}
