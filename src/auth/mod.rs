pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;

pub use password::{hash_password, verify_password};

/// Bearer token claims. Clients treat the encoded token as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    /// Fails when `expiry_hours` does not fit the clock's range
    pub fn new(user_id: Uuid, expiry_hours: Option<u64>) -> Result<Self, AuthError> {
        let now = Utc::now();
        let exp = match expiry_hours {
            None => None,
            Some(hours) => {
                let expires = i64::try_from(hours)
                    .ok()
                    .and_then(Duration::try_hours)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| {
                        AuthError::TokenGeneration(format!("token expiry of {} hours is out of range", hours))
                    })?;
                Some(expires.timestamp())
            }
        };

        Ok(Self {
            sub: user_id,
            iat: now.timestamp(),
            exp,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token signing secret is not configured")]
    InvalidSecret,
    #[error("Token generation error: {0}")]
    TokenGeneration(String),
    #[error("Password hashing error: {0}")]
    Hashing(String),
}

pub fn issue_token(user_id: Uuid, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let claims = Claims::new(user_id, security.token_expiry_hours)?;
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature (and expiry, when the token carries one) and return the claims.
pub fn verify_token(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());

    // exp is optional: tokens issued without expiry never lapse
    let mut validation = Validation::default();
    validation.required_spec_claims.clear();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}
