use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod service;
pub mod token;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::credential_routes(state))
        .merge(handlers::me_routes())
}
