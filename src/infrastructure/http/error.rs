//! HTTP Error Handling
//!
//! 业务错误统一以 HTTP 200 + errno 返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::{ApplicationError, RepositoryError};

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const CONFLICT: i32 = 409;
    pub const PRECONDITION_FAILED: i32 = 412;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const BAD_GATEWAY: i32 = 502;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
    pub const GATEWAY_TIMEOUT: i32 = 504;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// 上游产物缺失
    PreconditionFailed(String),
    /// 生成服务返回了不合规的结果
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn errno(&self) -> i32 {
        match self {
            ApiError::NotFound(_) => errno::NOT_FOUND,
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::Conflict(_) => errno::CONFLICT,
            ApiError::PreconditionFailed(_) => errno::PRECONDITION_FAILED,
            ApiError::BadGateway(_) => errno::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => errno::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => errno::INTERNAL_ERROR,
            ApiError::ServiceUnavailable(_) => errno::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::PreconditionFailed(msg)
            | ApiError::BadGateway(msg)
            | ApiError::GatewayTimeout(msg)
            | ApiError::Internal(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let errno = self.errno();
        let msg = self.message().to_string();

        if errno >= errno::INTERNAL_ERROR {
            tracing::error!(errno = errno, error = %msg, "Request failed");
        } else {
            tracing::warn!(errno = errno, error = %msg, "Request rejected");
        }

        (StatusCode::OK, Json(ErrorResponse::new(errno, msg))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(msg) => ApiError::NotFound(msg),
            RepositoryError::Duplicate(msg) => ApiError::Conflict(msg),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        let msg = e.to_string();
        match e {
            ApplicationError::NotFound { .. } => ApiError::NotFound(msg),
            ApplicationError::ValidationError(_) => ApiError::BadRequest(msg),
            ApplicationError::InvalidState(_) => ApiError::Conflict(msg),
            ApplicationError::OrdinalConflict { .. } => ApiError::Conflict(msg),
            ApplicationError::ContextIncomplete { .. } => ApiError::PreconditionFailed(msg),
            ApplicationError::GenerationSchema { .. } => ApiError::BadGateway(msg),
            ApplicationError::GenerationTimeout { .. } => ApiError::GatewayTimeout(msg),
            ApplicationError::GenerationFailed { .. } | ApplicationError::Cancelled { .. } => {
                ApiError::ServiceUnavailable(msg)
            }
            ApplicationError::Persistence { .. } | ApplicationError::InternalError(_) => {
                ApiError::Internal(msg)
            }
        }
    }
}
