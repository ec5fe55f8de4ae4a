use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use claim_proofs::ZkError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("proof generation timed out")]
    Timeout,

    #[error("internal error")]
    Internal,
}

impl From<ZkError> for ApiError {
    fn from(e: ZkError) -> Self {
        match e {
            ZkError::InvalidInput(_) | ZkError::MalformedProof(_) => ApiError::BadRequest(e.to_string()),
            ZkError::NotFound | ZkError::CircuitNotFound(_) => ApiError::NotFound(e.to_string()),
            ZkError::CapacityExceeded { .. } | ZkError::ProofGenerationFailed(_) => {
                ApiError::Unprocessable(e.to_string())
            }
            ZkError::BackendInitFailed(_) | ZkError::Serialization(_) | ZkError::Io(_) => {
                tracing::error!(error = %e, "internal failure");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            ApiError::Timeout => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}
