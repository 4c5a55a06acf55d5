//! Error-to-HTTP response conversion.
//!
//! Every failure a handler can hit maps to a status code and a client-safe
//! JSON body. Tool diagnostics and filesystem detail are logged here and
//! never serialized.

use axum::extract::multipart::MultipartError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::time::Duration;

use crate::conversion::ConversionError;
use crate::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("request body exceeds the configured limit")]
    PayloadTooLarge,

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("invalid filename")]
    InvalidName,

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(ValidationError::TooLarge { .. }) | Self::PayloadTooLarge => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Validation(_) | Self::BadRequest(_) | Self::InvalidName => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conversion(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Validation(_) => "validation_error",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge => "validation_error",
            Self::Conversion(ConversionError::Timeout { .. }) => "conversion_timeout",
            Self::Conversion(ConversionError::ToolUnavailable { .. }) => "encoder_unavailable",
            Self::Conversion(_) => "conversion_failed",
            Self::InvalidName => "invalid_filename",
            Self::NotFound => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show a client.
    fn public_message(&self) -> String {
        match self {
            Self::RateLimited { .. } => "Too many requests, please try again later".into(),
            Self::Validation(e) => e.to_string(),
            Self::BadRequest(_) => "Malformed upload request".into(),
            Self::PayloadTooLarge => "File exceeds the upload limit".into(),
            Self::Conversion(ConversionError::Timeout { .. }) => "Conversion timed out".into(),
            Self::Conversion(_) => "Video conversion failed".into(),
            Self::InvalidName => "Invalid filename".into(),
            Self::NotFound => "File not found".into(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self,
                "Server error in request handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }

        let body = json!({
            "error": self.public_message(),
            "code": self.code(),
        });

        let mut response = (status, axum::Json(body)).into_response();

        if let Self::RateLimited { retry_after } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_secs(60),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    }

    #[tokio::test]
    async fn too_large_is_413() {
        let response = ApiError::from(ValidationError::TooLarge {
            size: 11,
            max_bytes: 10,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn encoder_diagnostics_are_not_exposed() {
        let err = ApiError::from(ConversionError::EncodingFailed {
            diagnostics: "/srv/uploads/abc.mkv: Invalid data found".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Video conversion failed");
        assert!(!body.to_string().contains("/srv/uploads"));
    }

    #[tokio::test]
    async fn internal_detail_is_not_exposed() {
        let body = body_json(ApiError::internal("disk full at /var/tmp").into_response()).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], "internal_error");
    }

    #[test]
    fn validation_errors_are_400() {
        assert_eq!(
            ApiError::from(ValidationError::BadExtension).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::InvalidName.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }
}
