//! 订单行对账
//!
//! 更新订单时，提交的订单行列表代表订单行的完整目标状态：
//! 带 id 的行原地更新，不带 id 的行新建，未出现在列表中的已有行删除。
//! 这里只计算差异，不访问存储；三个集合由调用方在同一事务中落库。

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::entities::{LineItem, LineItemChanges, NewLineItem};
use super::value_objects::LineItemId;

/// 提交的一条订单行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingLineItem {
    /// 引用已有订单行，只覆盖提供了的字段
    Existing {
        id: LineItemId,
        changes: LineItemChanges,
    },
    /// 新订单行
    New(NewLineItem),
}

/// 对账结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// 字段发生变化的已有订单行（已应用修改）
    pub updates: Vec<LineItem>,
    /// 需要新建的订单行
    pub inserts: Vec<NewLineItem>,
    /// 需要删除的已有订单行
    pub deletions: Vec<LineItemId>,
}

impl ReconciliationPlan {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.deletions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    #[error("line item {0} does not belong to this purchase order")]
    ForeignLineItem(LineItemId),
    #[error("line item {0} appears more than once")]
    DuplicateLineItem(LineItemId),
}

/// 计算让 `existing` 与 `incoming` 一致所需的更新、新增与删除
///
/// `existing` 必须是目标订单当前的全部订单行。引用其他订单（或不存在）的
/// id 直接拒绝，不会跨订单修改数据。
pub fn plan_reconciliation(
    existing: &[LineItem],
    incoming: Vec<IncomingLineItem>,
) -> Result<ReconciliationPlan, ReconciliationError> {
    let current: HashMap<LineItemId, &LineItem> =
        existing.iter().map(|item| (item.id, item)).collect();

    let mut kept: HashSet<LineItemId> = HashSet::with_capacity(incoming.len());
    let mut plan = ReconciliationPlan::default();

    for line in incoming {
        match line {
            IncomingLineItem::Existing { id, changes } => {
                let Some(&persisted) = current.get(&id) else {
                    return Err(ReconciliationError::ForeignLineItem(id));
                };
                if !kept.insert(id) {
                    return Err(ReconciliationError::DuplicateLineItem(id));
                }

                let mut updated = persisted.clone();
                updated.apply(changes);
                if updated != *persisted {
                    plan.updates.push(updated);
                }
            }
            IncomingLineItem::New(new_item) => plan.inserts.push(new_item),
        }
    }

    plan.deletions = existing
        .iter()
        .map(|item| item.id)
        .filter(|id| !kept.contains(id))
        .collect();

    Ok(plan)
}
