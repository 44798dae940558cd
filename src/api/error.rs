//! Maps store errors and request rejections onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::StoreError;

#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    /// The request body could not be read as the expected JSON document.
    InvalidBody(JsonRejection),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::InvalidBody(e)
    }
}

/// `Json` extractor whose rejections use the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::StorageWrite { .. }) => StatusCode::INSUFFICIENT_STORAGE,
            Self::Store(StoreError::InvalidSettings(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(StoreError::IdsExhausted { .. }) => StatusCode::CONFLICT,
            Self::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidBody(rejection) => rejection.status(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store(e) => e.kind(),
            Self::InvalidBody(_) => "invalid_body",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Store(e) => e.to_string(),
            Self::InvalidBody(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %message, "Request failed");
        }
        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}
