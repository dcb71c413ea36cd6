use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure talking to the dispatch API. Passed through the coordinator unmodified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("upstream status {status}; body preview: {preview}")]
    Status { status: u16, preview: String },
    #[error("failed to decode {context}: {message}")]
    Decode { context: String, message: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Request(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest database error: {0}")]
    Database(#[from] sqlx_core::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no officer is logged in")]
    NotLoggedIn,
    #[error("no active book-on")]
    NotBookedOn,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl SyncError {
    pub const fn code(&self) -> &'static str {
        match self {
            SyncError::NotLoggedIn => "NOT_LOGGED_IN",
            SyncError::NotBookedOn => "NOT_BOOKED_ON",
            SyncError::Api(_) => "UPSTREAM_ERROR",
            SyncError::Manifest(_) => "MANIFEST_ERROR",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            SyncError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            SyncError::NotBookedOn => StatusCode::CONFLICT,
            SyncError::Api(_) => StatusCode::BAD_GATEWAY,
            SyncError::Manifest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}
