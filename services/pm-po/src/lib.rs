//! pm-po - 采购订单服务
//!
//! 管理采购订单（供应商 + 订单行）及其汇总金额

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
