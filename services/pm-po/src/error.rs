use procure_errors::AppError;
use thiserror::Error;

use crate::domain::reconciliation::ReconciliationError;
use crate::domain::{LineItemId, PurchaseOrderId, SupplierId};

/// 采购订单服务错误
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Purchase order {0} not found")]
    PurchaseOrderNotFound(PurchaseOrderId),
    #[error("Supplier {0} does not exist")]
    SupplierNotFound(SupplierId),
    #[error("Invalid supplier data: {0}")]
    InvalidSupplier(String),
    #[error("Invalid purchase order data: {0}")]
    InvalidOrder(String),
    #[error("Supplier email already in use: {0}")]
    DuplicateSupplierEmail(String),
    #[error("Line item {0} does not belong to this purchase order")]
    ForeignLineItem(LineItemId),
    #[error("Line item {0} appears more than once")]
    DuplicateLineItem(LineItemId),
    #[error(transparent)]
    Store(#[from] AppError),
}

pub type ServiceResult<T> = Result<T, OrderError>;

impl OrderError {
    /// HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            OrderError::PurchaseOrderNotFound(_) => 404,
            OrderError::SupplierNotFound(_)
            | OrderError::InvalidSupplier(_)
            | OrderError::InvalidOrder(_)
            | OrderError::DuplicateSupplierEmail(_)
            | OrderError::ForeignLineItem(_)
            | OrderError::DuplicateLineItem(_) => 400,
            OrderError::Store(e) => e.status_code(),
        }
    }

    /// 对外暴露的消息，细节只写入日志
    pub fn public_message(&self) -> String {
        match self {
            OrderError::PurchaseOrderNotFound(_) => "Purchase Order not found".to_string(),
            OrderError::SupplierNotFound(_) => {
                "Supplier with provided id does not exist.".to_string()
            }
            OrderError::InvalidSupplier(_) | OrderError::DuplicateSupplierEmail(_) => {
                "Invalid supplier data.".to_string()
            }
            OrderError::InvalidOrder(_)
            | OrderError::ForeignLineItem(_)
            | OrderError::DuplicateLineItem(_) => "Invalid purchase order data.".to_string(),
            OrderError::Store(e) => e.to_error_body().error,
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, OrderError::Store(e) if e.is_server_error())
    }
}

impl From<ReconciliationError> for OrderError {
    fn from(error: ReconciliationError) -> Self {
        match error {
            ReconciliationError::ForeignLineItem(id) => OrderError::ForeignLineItem(id),
            ReconciliationError::DuplicateLineItem(id) => OrderError::DuplicateLineItem(id),
        }
    }
}
