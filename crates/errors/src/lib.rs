//! procure-errors - 统一错误处理
//!
//! 所有 crate 共用的错误类型，以及对外的错误响应体

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
            Self::Database(_) => 500,
        }
    }

    /// 不带前缀的错误消息
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Conflict(msg)
            | Self::Internal(msg)
            | Self::Database(msg) => msg,
        }
    }

    /// 是否为服务端错误（不应向调用方暴露细节）
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Database(_))
    }

    /// 转换为对外的错误响应体
    pub fn to_error_body(&self) -> ErrorBody {
        if self.is_server_error() {
            ErrorBody::new("Internal server error")
        } else {
            ErrorBody::new(self.message())
        }
    }
}

/// JSON 错误响应体: `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("x").status_code(), 404);
        assert_eq!(AppError::validation("x").status_code(), 400);
        assert_eq!(AppError::conflict("x").status_code(), 409);
        assert_eq!(AppError::internal("x").status_code(), 500);
        assert_eq!(AppError::database("x").status_code(), 500);
    }

    #[test]
    fn test_error_body_hides_server_errors() {
        let body = AppError::database("relation \"line_items\" does not exist").to_error_body();
        assert_eq!(body.error, "Internal server error");

        let body = AppError::not_found("Purchase Order not found").to_error_body();
        assert_eq!(body.error, "Purchase Order not found");
    }

    #[test]
    fn test_error_body_json() {
        let json = serde_json::to_value(ErrorBody::new("Invalid supplier data.")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Invalid supplier data." }));
    }
}
