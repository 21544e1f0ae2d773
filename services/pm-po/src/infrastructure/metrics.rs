//! 采购订单业务指标

use metrics::counter;

/// 记录订单创建
pub fn record_order_created() {
    counter!("purchase_orders_created_total").increment(1);
}

/// 记录订单更新
pub fn record_order_updated() {
    counter!("purchase_orders_updated_total").increment(1);
}

/// 记录订单删除
pub fn record_order_deleted() {
    counter!("purchase_orders_deleted_total").increment(1);
}

/// 记录失败的操作
pub fn record_failure(operation: &'static str) {
    let labels = [("operation", operation)];
    counter!("purchase_order_failures_total", &labels).increment(1);
}
