// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error rendered as the `{success: false, message, error?}`
/// envelope. The per-route store-error mapping lives in the handlers, since
/// the same store failure maps to different status codes depending on the
/// route (see the update path).
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { message: String, error: Option<String> },

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    ServerError { message: String, error: Option<String> },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            error: None,
        }
    }

    pub fn bad_request_with(message: impl Into<String>, error: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            error: Some(error.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Generic 500 carrying the raw error text alongside the fixed message.
    pub fn server_error(error: impl Into<String>) -> Self {
        ApiError::ServerError {
            message: "Erreur serveur".to_string(),
            error: Some(error.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::NotFound(message) => message,
            ApiError::ServerError { message, .. } => message,
        }
    }

    /// Convert to the JSON response envelope.
    pub fn to_json(&self) -> Value {
        let error = match self {
            ApiError::BadRequest { error, .. } => error.as_deref(),
            ApiError::NotFound(_) => None,
            ApiError::ServerError { error, .. } => error.as_deref(),
        };

        let mut body = json!({
            "success": false,
            "message": self.message(),
        });
        if let Some(error) = error {
            body["error"] = json!(error);
        }
        body
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
