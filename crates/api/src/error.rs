//! # API 统一错误处理
//!
//! 将下层各 crate 的错误类型统一映射到 HTTP 状态码与 JSON 响应体。
//! 响应体除文字描述外始终携带机器可读的 `code` 字段。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::types::ApiErrorResponse;
use musika_core::auth::error::AuthError;
use musika_core::store::error::StoreError;

/// API 层统一错误枚举
#[derive(Error, Debug)]
pub enum ApiError {
    /// 鉴权或限流失败 (401 / 429)
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// 未知证券代码 (404)
    #[error("Security not found: {0}")]
    UnknownSymbol(String),

    /// 资源未找到 (404)
    #[error("{0}")]
    NotFound(String),

    /// 请求参数错误 (400)
    #[error("{0}")]
    BadRequest(String),

    /// 下层业务错误 (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 机器可读的错误代码。
    fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(err) => err.code(),
            ApiError::UnknownSymbol(_) => "unknown_symbol",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

/// 将 `ApiError` 转换为 axum 的 HTTP 响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            ApiError::Auth(err) => {
                let status = match err {
                    AuthError::MissingKey | AuthError::InvalidKey => StatusCode::UNAUTHORIZED,
                    AuthError::DailyLimitExceeded | AuthError::MonthlyLimitExceeded => {
                        StatusCode::TOO_MANY_REQUESTS
                    }
                };
                (status, err.to_string())
            }
            ApiError::UnknownSymbol(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => {
                // 内部错误只记录日志，不向客户端透传细节
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ApiErrorResponse::from_parts(code, message));
        (status, body).into_response()
    }
}

/// 从 `StoreError` 转换
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Not found".to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
