//! 订单编号分配

use procure_errors::AppResult;

use super::repositories::PurchaseOrderRepository;
use super::value_objects::OrderNumber;

/// 分配下一个订单编号: 当前最大编号 + 1，没有订单时为 1
///
/// 必须在创建订单的同一事务中调用；编号锁在事务结束时释放，
/// 因此在提交前其他创建者拿不到同一个最大值。
pub async fn next_order_number(orders: &dyn PurchaseOrderRepository) -> AppResult<OrderNumber> {
    let current_max = orders.lock_max_order_number().await?;
    Ok(OrderNumber::after(current_max))
}
