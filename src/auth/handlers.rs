use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Form, Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterRequest, TokenResponse, UserView},
        extractors::AuthUser,
        service,
    },
    error::AuthError,
    rate_limit,
    state::AppState,
};

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Credential endpoints, throttled per client.
pub fn credential_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::throttle,
        ))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), AuthError> {
    // The email is taken exactly as sent; A@example.com and a@example.com
    // are different accounts.
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("invalid email address".into()));
    }

    let password_chars = payload.password.chars().count();
    if !(8..=72).contains(&password_chars) {
        warn!("password length out of range");
        return Err(AuthError::Validation(
            "password must be 8 to 72 characters".into(),
        ));
    }

    let user = service::register(
        state.store.as_ref(),
        &payload.email,
        &payload.password,
        payload.full_name,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AuthError> {
    let access_token = service::login(
        state.store.as_ref(),
        &state.token_keys,
        &form.username,
        &form.password,
    )
    .await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    }))
}

#[instrument(skip(user))]
pub async fn me(AuthUser(user): AuthUser) -> Json<UserView> {
    Json(UserView::from(user))
}
