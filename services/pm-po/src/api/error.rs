//! HTTP 错误响应
//!
//! 大多数错误响应为 `{"error": "..."}`，删除不存在的订单时为 `{"detail": "..."}`。

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use procure_errors::ErrorBody;
use serde::Serialize;
use tracing::warn;

use crate::error::OrderError;

pub const ORDER_NOT_FOUND: &str = "Purchase Order not found";
pub const DELETE_NOT_FOUND: &str = "Purchase Order with given ID does not exist";
pub const INVALID_ORDER_DATA: &str = "Invalid purchase order data.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum ApiErrorBody {
    Error(ErrorBody),
    Detail { detail: String },
}

/// HTTP 错误
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody::Error(ErrorBody::new(message)),
        }
    }

    /// 路径中的订单 id 无法识别
    pub fn order_not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, ORDER_NOT_FOUND)
    }

    /// 请求体不是合法的订单 JSON
    pub fn invalid_body(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected purchase order payload");
        Self::error(StatusCode::BAD_REQUEST, INVALID_ORDER_DATA)
    }

    /// 删除不存在的订单
    pub fn delete_not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ApiErrorBody::Detail {
                detail: DELETE_NOT_FOUND.to_string(),
            },
        }
    }

    /// 删除接口的错误格式
    pub fn for_delete(error: OrderError) -> Self {
        match error {
            OrderError::PurchaseOrderNotFound(_) => Self::delete_not_found(),
            other => other.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<OrderError> for ApiError {
    fn from(error: OrderError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::error(status, error.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PurchaseOrderId, SupplierId};
    use procure_errors::AppError;

    fn body_json(error: ApiError) -> serde_json::Value {
        serde_json::to_value(&error.body).unwrap()
    }

    #[test]
    fn test_error_style_body() {
        let error: ApiError = OrderError::SupplierNotFound(SupplierId(7)).into();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(error),
            serde_json::json!({"error": "Supplier with provided id does not exist."})
        );
    }

    #[test]
    fn test_delete_not_found_uses_detail() {
        let error = ApiError::for_delete(OrderError::PurchaseOrderNotFound(PurchaseOrderId(1)));
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(error), serde_json::json!({"detail": DELETE_NOT_FOUND}));
    }

    #[test]
    fn test_store_errors_are_opaque() {
        let error: ApiError = OrderError::Store(AppError::database("deadlock detected")).into();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(error),
            serde_json::json!({"error": "Internal server error"})
        );
    }
}
