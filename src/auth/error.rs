use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Client-facing failures of the auth core.
///
/// Unknown email and wrong password both map to `InvalidCredentials`, so a
/// caller cannot tell registered emails apart by probing login.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::DuplicateEmail | AuthError::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AuthError::InvalidCredentials | AuthError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AuthError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, message).into_response()
    }
}
