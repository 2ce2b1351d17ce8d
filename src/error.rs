// error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("malformed signature header")]
    MalformedHeader,

    #[error("timestamp outside tolerance ({age}s old)")]
    TimestampOutOfTolerance { age: i64 },

    #[error("signing secret rejected by HMAC")]
    InvalidSecret,

    #[error("no matching v1 signature")]
    SignatureMismatch,

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Terminal failures of one webhook invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} not configured")]
    ConfigurationMissing(&'static str),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("no clerk_user_id for {event_type}")]
    UserResolutionFailed { event_type: String },

    #[error("external call failed for {event_type}: {source}")]
    ExternalUpdateFailed {
        event_type: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<VerificationError> for DispatchError {
    fn from(err: VerificationError) -> Self {
        DispatchError::AuthenticationFailed(err.to_string())
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        // Detail stays in the server log.
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}
