use std::str::FromStr;

use anyhow::{bail, Context};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use time::Duration;
use tracing::warn;

/// Signing secrets shorter than this draw a startup warning.
const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub ttl_minutes: i64,
}

/// Request quota for the credential routes, parsed from a string such as
/// `"30/minute"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateQuota {
    pub limit: u32,
    pub window: Duration,
}

impl FromStr for RateQuota {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (limit, window) = s
            .split_once('/')
            .with_context(|| format!("rate quota must look like \"30/minute\", got {s:?}"))?;
        let limit: u32 = limit
            .trim()
            .parse()
            .with_context(|| format!("invalid request count in rate quota {s:?}"))?;
        if limit == 0 {
            bail!("rate quota request count must be positive");
        }
        let window = match window.trim() {
            "second" => Duration::seconds(1),
            "minute" => Duration::minutes(1),
            "hour" => Duration::hours(1),
            "day" => Duration::days(1),
            other => bail!("unknown rate quota window {other:?}"),
        };
        Ok(Self { limit, window })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub rate_limit: RateQuota,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let acquire_timeout_secs = std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5);
        let jwt = JwtConfig {
            secret: resolve_secret(std::env::var("JWT_SECRET").ok()),
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            ttl_minutes: std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(120),
        };
        let rate_limit = std::env::var("RATE_LIMIT")
            .unwrap_or_else(|_| "30/minute".into())
            .parse::<RateQuota>()?;
        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout_secs,
            jwt,
            rate_limit,
        })
    }
}

/// Use the configured signing secret, or fall back to an ephemeral one.
///
/// Tokens signed with a generated secret die with the process: every
/// restart gets a fresh key, so real deployments must set JWT_SECRET.
fn resolve_secret(configured: Option<String>) -> String {
    let secret = match configured {
        Some(s) => s,
        None => {
            warn!(
                "JWT_SECRET is not set; using an ephemeral signing secret \
                 (issued tokens will not survive a restart)"
            );
            generate_secret()
        }
    };
    if secret.len() < MIN_SECRET_BYTES {
        warn!(
            "JWT_SECRET is shorter than {MIN_SECRET_BYTES} bytes; use a longer random \
             value in production"
        );
    }
    secret
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
