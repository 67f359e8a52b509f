use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::token::JwtKeys;
use crate::config::{AppConfig, JwtConfig, RateQuota};
use crate::rate_limit::RateLimiter;
use crate::store::{MemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub token_keys: JwtKeys,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let store = PgUserStore::connect(
                    url,
                    config.max_connections,
                    Duration::from_secs(config.acquire_timeout_secs),
                )
                .await?;
                info!("user store: postgres");
                Arc::new(store)
            }
            None => {
                warn!("DATABASE_URL not set, keeping users in memory; accounts vanish on restart");
                Arc::new(MemoryUserStore::new())
            }
        };

        Self::from_parts(store, config)
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let token_keys = JwtKeys::new(&config.jwt)?;
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Ok(Self {
            store,
            token_keys,
            limiter,
            config,
        })
    }

    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            max_connections: 2,
            acquire_timeout_secs: 1,
            jwt: JwtConfig {
                secret: "test-secret-test-secret-test-secret!".into(),
                algorithm: "HS256".into(),
                ttl_minutes: 5,
            },
            rate_limit: RateQuota {
                limit: 1000,
                window: time::Duration::minutes(1),
            },
        });

        Self::from_parts(Arc::new(MemoryUserStore::new()), config).expect("test state should build")
    }
}
