use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    config::{JwtConfig, MAX_TOKEN_DURATION_HOURS},
    models::MemberId,
    Error, Result,
};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Member name
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn member_id(&self) -> MemberId {
        MemberId::from_string(self.sub.clone())
    }
}

/// HS256 token signing and verification
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    algorithm: Algorithm,
    leeway_seconds: u64,
    token_duration: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &self.algorithm)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(Error::Internal("JWT secret must not be empty".to_string()));
        }

        if !(1..=MAX_TOKEN_DURATION_HOURS).contains(&config.token_duration_hours) {
            return Err(Error::Internal(format!(
                "Invalid token duration: {} hours",
                config.token_duration_hours
            )));
        }

        let secret = config.secret.as_bytes();
        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            algorithm: Algorithm::HS256,
            leeway_seconds: config.leeway_seconds,
            token_duration: Duration::hours(config.token_duration_hours),
        })
    }

    /// Sign a token for `member`
    pub fn sign_token(&self, member: &MemberId) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: member.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_duration).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a token and extract claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = self.leeway_seconds;

        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Authentication("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    Error::Authentication("Invalid token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::Authentication("Invalid token signature".to_string())
                }
                _ => Error::Authentication(format!("Token verification failed: {e}")),
            })?;

        if token_data.claims.sub.is_empty() {
            return Err(Error::Authentication("Token has no subject".to_string()));
        }

        Ok(token_data.claims)
    }
}
