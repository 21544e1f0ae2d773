//! 采购订单命令与查询
//!
//! 命令携带调用方提交的原始字段，`validate` 将其转换为领域类型。

use procure_domain_core::Money;

use crate::domain::reconciliation::IncomingLineItem;
use crate::domain::{
    Email, LineItemChanges, LineItemId, NewLineItem, NewSupplier, OrderFilter, SupplierChanges,
    SupplierId,
};
use crate::error::{OrderError, ServiceResult};

/// 文本字段最大长度
pub const MAX_TEXT_LEN: usize = 255;

/// 提交的供应商
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierInput {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// 校验后的供应商引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupplierRef {
    /// 引用已有供应商，附带提交的字段
    Existing {
        id: SupplierId,
        changes: SupplierChanges,
    },
    /// 新供应商
    New(NewSupplier),
}

impl SupplierInput {
    pub fn validate(self) -> ServiceResult<SupplierRef> {
        let name = self
            .name
            .map(|name| required_text("name", &name))
            .transpose()
            .map_err(OrderError::InvalidSupplier)?;
        let email = self
            .email
            .map(|email| Email::parse(&email))
            .transpose()
            .map_err(OrderError::InvalidSupplier)?;

        match self.id {
            Some(id) => Ok(SupplierRef::Existing {
                id: SupplierId(id),
                changes: SupplierChanges { name, email },
            }),
            None => {
                let name =
                    name.ok_or_else(|| OrderError::InvalidSupplier("name is required".into()))?;
                let email =
                    email.ok_or_else(|| OrderError::InvalidSupplier("email is required".into()))?;
                Ok(SupplierRef::New(NewSupplier { name, email }))
            }
        }
    }
}

/// 提交的订单行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemInput {
    pub id: Option<i64>,
    pub item_name: Option<String>,
    pub quantity: Option<i64>,
    pub price_without_tax: Option<Money>,
    pub tax_name: Option<String>,
    pub tax_amount: Option<Money>,
}

impl LineItemInput {
    /// 校验为新订单行，所有字段必填
    pub fn into_new(self) -> Result<NewLineItem, String> {
        let changes = self.changes()?;
        Ok(NewLineItem {
            item_name: changes.item_name.ok_or("item_name is required")?,
            quantity: changes.quantity.ok_or("quantity is required")?,
            price_without_tax: changes
                .price_without_tax
                .ok_or("price_without_tax is required")?,
            tax_name: changes.tax_name.ok_or("tax_name is required")?,
            tax_amount: changes.tax_amount.ok_or("tax_amount is required")?,
        })
    }

    /// 校验为对账输入：带 id 的是部分修改，不带 id 的是新订单行
    pub fn into_incoming(self) -> Result<IncomingLineItem, String> {
        match self.id {
            Some(id) => Ok(IncomingLineItem::Existing {
                id: LineItemId(id),
                changes: self.changes()?,
            }),
            None => self.into_new().map(IncomingLineItem::New),
        }
    }

    fn changes(&self) -> Result<LineItemChanges, String> {
        let quantity = self
            .quantity
            .map(|quantity| {
                if quantity < 1 {
                    Err(format!("quantity must be at least 1, got {quantity}"))
                } else {
                    i32::try_from(quantity).map_err(|_| format!("quantity {quantity} is too large"))
                }
            })
            .transpose()?;

        Ok(LineItemChanges {
            item_name: self
                .item_name
                .as_deref()
                .map(|v| required_text("item_name", v))
                .transpose()?,
            quantity,
            price_without_tax: self.price_without_tax,
            tax_name: self
                .tax_name
                .as_deref()
                .map(|v| required_text("tax_name", v))
                .transpose()?,
            tax_amount: self.tax_amount,
        })
    }
}

fn required_text(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(format!("{field} must be at most {MAX_TEXT_LEN} characters"));
    }
    Ok(value.to_string())
}

fn non_empty_line_items(line_items: &[LineItemInput]) -> ServiceResult<()> {
    if line_items.is_empty() {
        return Err(OrderError::InvalidOrder("Line Items must not be empty".into()));
    }
    Ok(())
}

/// 创建采购订单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePurchaseOrderCommand {
    pub supplier: SupplierInput,
    pub line_items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreate {
    pub supplier: SupplierRef,
    /// 创建时订单行上的 id 被忽略
    pub line_items: Vec<NewLineItem>,
}

impl CreatePurchaseOrderCommand {
    pub fn validate(self) -> ServiceResult<ValidatedCreate> {
        non_empty_line_items(&self.line_items)?;
        let line_items = self
            .line_items
            .into_iter()
            .map(LineItemInput::into_new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OrderError::InvalidOrder)?;

        Ok(ValidatedCreate {
            supplier: self.supplier.validate()?,
            line_items,
        })
    }
}

/// 更新采购订单（订单行整体替换）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePurchaseOrderCommand {
    pub supplier: SupplierInput,
    pub line_items: Vec<LineItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpdate {
    pub supplier: SupplierRef,
    pub line_items: Vec<IncomingLineItem>,
}

impl UpdatePurchaseOrderCommand {
    pub fn validate(self) -> ServiceResult<ValidatedUpdate> {
        non_empty_line_items(&self.line_items)?;
        let line_items = self
            .line_items
            .into_iter()
            .map(LineItemInput::into_incoming)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OrderError::InvalidOrder)?;

        Ok(ValidatedUpdate {
            supplier: self.supplier.validate()?,
            line_items,
        })
    }
}

/// 查询采购订单列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPurchaseOrdersQuery {
    pub supplier_name: Option<String>,
    pub item_name: Option<String>,
}

impl ListPurchaseOrdersQuery {
    /// 空字符串视为未提供
    pub fn into_filter(self) -> OrderFilter {
        OrderFilter {
            supplier_name: self.supplier_name.filter(|s| !s.is_empty()),
            item_name: self.item_name.filter(|s| !s.is_empty()),
        }
    }
}
