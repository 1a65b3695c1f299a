//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::infrastructure::store::StoreError;

/// 核心错误类型
///
/// 所有用户触发的操作（投票、认捐、评论）都在 handler 边界被转换成响应，
/// 不会向上冒泡成未处理的错误。
#[derive(Debug, Error)]
pub enum CoreError {
    /// 未登录用户尝试投票/认捐
    #[error("sign in to continue")]
    Unauthenticated,
    /// 认捐金额非正数或不是数字
    #[error("pledge amount must be a positive number")]
    InvalidAmount,
    /// 引用的产品/投票/评论不存在
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    /// 持久化写入失败，本地状态已回滚，可重试
    #[error("could not save your change, please try again ({0})")]
    WriteFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// 写路径上的存储错误：后端故障视为可重试的 `WriteFailed`
    pub fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound(format!("{entity} {id}")),
            StoreError::Conflict(msg) | StoreError::Backend(msg) => CoreError::WriteFailed(msg),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::WriteFailed(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound(format!("{entity} {id}")),
            StoreError::Conflict(msg) => CoreError::BadRequest(msg),
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("invalid {field}"))
                })
            })
            .collect();
        messages.sort();

        CoreError::BadRequest(messages.join(", "))
    }
}

/// 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub timestamp: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, error_code, redirect) = match &self {
            CoreError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                Some("/login".to_string()),
            ),
            CoreError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT", None),
            CoreError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", None),
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            CoreError::WriteFailed(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "WRITE_FAILED", None)
            }
            CoreError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                None,
            ),
        };

        let message = match &self {
            CoreError::Internal(detail) => {
                error!("内部错误: {}", detail);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let error_response = ErrorResponse {
            error: error_code.to_string(),
            message,
            code: status.as_u16(),
            retryable,
            redirect,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn write_failures_are_retryable() {
        let err = CoreError::from_write(StoreError::Backend("connection reset".into()));
        assert!(matches!(err, CoreError::WriteFailed(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_records_stay_not_found_on_writes() {
        let id = Uuid::new_v4();
        let err = CoreError::from_write(StoreError::NotFound {
            entity: "product",
            id,
        });
        assert_eq!(err.to_string(), format!("product {id} not found"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        let cases = [
            (CoreError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (CoreError::InvalidAmount, StatusCode::BAD_REQUEST),
            (CoreError::NotFound("vote".into()), StatusCode::NOT_FOUND),
            (
                CoreError::WriteFailed("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CoreError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
