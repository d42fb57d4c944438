use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use tracing::error;

/// Handler-level failures. Every variant renders as the uniform
/// `{"message": ..., "success": false}` body; internal errors are logged
/// server-side and never leak detail to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Email already in use")]
    Conflict,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("You cannot follow/unfollow yourself")]
    SelfReference,
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Duplicate email reports 400, matching the public API contract.
            ApiError::BadRequest(_)
            | ApiError::Conflict
            | ApiError::InvalidCredentials
            | ApiError::SelfReference => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(source) = self {
            error!(error = %source, "request failed");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": self.to_string(),
            "success": false,
        }))
    }
}
