use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::JwtConfig;

/// Token payload. The subject is the user's email; a token stays valid
/// until `exp` passes, with no server-side state backing it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token invalid")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
}

impl JwtKeys {
    /// Build signing keys from config. Only the HMAC family is accepted;
    /// the shared secret cannot drive an asymmetric algorithm.
    pub fn new(config: &JwtConfig) -> anyhow::Result<Self> {
        let algorithm = config
            .algorithm
            .parse::<Algorithm>()
            .map_err(|_| anyhow::anyhow!("unknown JWT algorithm {:?}", config.algorithm))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            anyhow::bail!(
                "JWT algorithm {:?} requires key material this service does not hold",
                config.algorithm
            );
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            access_ttl: Duration::minutes(config.ttl_minutes),
        })
    }

    fn sign_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: (now + ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(subject = %subject, "jwt signed");
        Ok(token)
    }

    pub fn sign(&self, subject: &str) -> Result<String, TokenError> {
        self.sign_with_ttl(subject, self.access_ttl)
    }

    /// Verify signature and expiry, in that order. No leeway: a token is
    /// rejected the second its `exp` passes.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        debug!(subject = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
