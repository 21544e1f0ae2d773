//! 强类型 ID 与值对象

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// 供应商 ID（存储分配）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct SupplierId(pub i64);

/// 采购订单 ID（存储分配）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct PurchaseOrderId(pub i64);

/// 订单行 ID（存储分配）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct LineItemId(pub i64);

/// 订单编号
///
/// 业务上的订单标识，创建时分配后不再变化，全局唯一且严格递增。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct OrderNumber(pub i64);

impl OrderNumber {
    pub const FIRST: OrderNumber = OrderNumber(1);

    /// 当前最大编号之后的编号；没有订单时为 1
    pub fn after(current_max: Option<OrderNumber>) -> Self {
        match current_max {
            Some(OrderNumber(max)) if max >= 1 => OrderNumber(max + 1),
            _ => Self::FIRST,
        }
    }
}

/// 邮箱地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct Email(String);

impl Email {
    pub const MAX_LEN: usize = 254;

    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("email must not be empty".to_string());
        }
        if value.len() > Self::MAX_LEN {
            return Err(format!("email must be at most {} characters", Self::MAX_LEN));
        }
        if value.chars().any(char::is_whitespace) {
            return Err("email must not contain whitespace".to_string());
        }

        let (local, domain) = value
            .split_once('@')
            .ok_or_else(|| "email must contain '@'".to_string())?;
        if local.is_empty() || domain.contains('@') {
            return Err("email must have exactly one '@' and a local part".to_string());
        }
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err("email domain is invalid".to_string());
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
