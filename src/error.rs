use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Every failure the account service can hand back to the boundary.
///
/// Credential failures are deliberately coarse: `InvalidCredentials` never
/// says whether the email or the password was wrong, and `InvalidToken`
/// covers expired tokens and tokens whose user no longer exists.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid or expired auth token")]
    InvalidToken,

    #[error("too many requests")]
    RateLimited,

    #[error("user store failure: {0}")]
    Database(#[source] StoreError),

    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::MissingCredentials
            | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::Database(other),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Infrastructure detail goes to the log, not to the client.
        let message = match &self {
            AuthError::Database(e) => {
                error!(error = %e, "user store failure");
                "service unavailable".to_string()
            }
            AuthError::Internal(e) => {
                error!(error = %e, "internal failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let err = AuthError::Validation("bad email".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = AuthError::DuplicateEmail;
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = AuthError::InvalidCredentials;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AuthError::MissingCredentials;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AuthError::InvalidToken;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AuthError::RateLimited;
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let err = AuthError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_error_conversion() {
        let err: AuthError = StoreError::DuplicateEmail.into();
        assert!(matches!(err, AuthError::DuplicateEmail));

        let err: AuthError = StoreError::Unavailable(sqlx::Error::PoolClosed).into();
        assert!(matches!(err, AuthError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_credential_failures_share_one_message() {
        // Unknown email and wrong password must be indistinguishable.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "incorrect email or password"
        );
    }
}
