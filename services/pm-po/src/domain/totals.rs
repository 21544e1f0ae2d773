//! 金额汇总计算

use procure_domain_core::Money;
use serde::Serialize;

use super::entities::LineItem;

/// 单行金额: quantity * (price_without_tax + tax_amount)
pub fn line_total(quantity: i32, price_without_tax: Money, tax_amount: Money) -> Money {
    (price_without_tax + tax_amount) * i64::from(quantity)
}

/// 订单汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub total_quantity: i64,
    pub total_amount: Money,
    pub total_tax: Money,
}

/// 对订单的所有订单行求和；没有订单行时全部为零
///
/// total_tax 是各行 tax_amount 之和，不乘以数量。
pub fn order_totals(line_items: &[LineItem]) -> OrderTotals {
    OrderTotals {
        total_quantity: line_items.iter().map(|i| i64::from(i.quantity)).sum(),
        total_amount: line_items.iter().map(LineItem::line_total).sum(),
        total_tax: line_items.iter().map(|i| &i.tax_amount).sum(),
    }
}
