pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod state;
pub mod store;

pub use app::{build_app, serve};
pub use error::AuthError;
pub use state::AppState;
