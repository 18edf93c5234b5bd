// Path: crates/gateway/src/error.rs
//! Handler error type and its JSON rendering.

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Json, Response};
use http::request::Parts;
use http::StatusCode;
use std::convert::Infallible;

/// Extractor for the request id installed by the middleware stack.
#[derive(Debug, Clone, Default)]
pub struct RequestId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(crate::REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(RequestId(id))
    }
}

/// Error a handler maps onto an HTTP status plus a
/// `{request_id, error}` JSON body.
pub struct AppError {
    request_id: String,
    status: StatusCode,
    message: String,
}

impl AppError {
    /// 400 with a message.
    pub fn bad_request(rid: &RequestId, message: impl Into<String>) -> Self {
        Self::with_status(rid, StatusCode::BAD_REQUEST, message)
    }

    /// 401 for a missing client certificate.
    pub fn unauthorized(rid: &RequestId, message: impl Into<String>) -> Self {
        Self::with_status(rid, StatusCode::UNAUTHORIZED, message)
    }

    /// 403 for an identity that does not match the requested resource.
    pub fn forbidden(rid: &RequestId, message: impl Into<String>) -> Self {
        Self::with_status(rid, StatusCode::FORBIDDEN, message)
    }

    /// 404 for a resource the stores do not know.
    pub fn not_found(rid: &RequestId, message: impl Into<String>) -> Self {
        Self::with_status(rid, StatusCode::NOT_FOUND, message)
    }

    /// 500 with a logged cause and an opaque message.
    pub fn internal(rid: &RequestId, cause: impl std::fmt::Display) -> Self {
        tracing::error!(target: "gateway", request_id = %rid.0, error = %cause, "internal error");
        Self::with_status(rid, StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    /// Any explicit status.
    pub fn with_status(
        rid: &RequestId,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request_id: rid.0.clone(),
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "request_id": self.request_id,
                "error": self.message,
            })),
        )
            .into_response()
    }
}
