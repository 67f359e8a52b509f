use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{auth::service, error::AuthError, state::AppState, store::User};

/// Extracts the authenticated user from a bearer token.
///
/// Handlers taking this argument only run for requests whose token
/// verifies and whose subject still exists.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AuthError::MissingCredentials)?;

        let user = service::resolve(state.store.as_ref(), &state.token_keys, token).await?;
        Ok(AuthUser(user))
    }
}
