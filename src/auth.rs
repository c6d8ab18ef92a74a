use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::user_service::UserStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub username: String,
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
    pub iss: String, // Issuer
}

/// JWT signing and verification (HS256)
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl_hours: i64,
    issuer: String,
}

impl AuthManager {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_ttl_hours: config.access_token_ttl_hours,
            issuer: config.jwt_issuer.clone(),
        }
    }

    /// Create a signed access token for a user.
    pub fn create_token(&self, user_id: u64, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: (now + Duration::hours(self.access_token_ttl_hours)).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")
    }

    /// Verify a token's signature, expiry and issuer.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

/// Validate a user's credentials and sign an access token.
///
/// Passwords are bcrypt-hashed. A stored plaintext password equal to the
/// supplied one is accepted once and re-hashed in place — legacy records
/// migrate lazily on their first successful login.
pub async fn validate_user_and_sign_token(
    store: &dyn UserStore,
    auth_manager: &AuthManager,
    username: &str,
    password: &str,
) -> AppResult<String> {
    let user = store
        .find_by_username(username)
        .await?
        .filter(|u| u.status == 1)
        .ok_or_else(|| AppError::auth("invalid username or password"))?;

    // bcrypt::verify errors on a non-hash stored value; treat that the same
    // as a mismatch and fall through to the legacy-plaintext check.
    let hash_matches = bcrypt::verify(password, &user.password).unwrap_or(false);

    if !hash_matches {
        if user.password == password {
            let new_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
            store.update_password(user.id, &new_hash).await?;
            tracing::info!(username = %username, "Migrated legacy plaintext password to bcrypt");
        } else {
            return Err(AppError::auth("invalid username or password"));
        }
    }

    let token = auth_manager.create_token(user.id, &user.username)?;
    Ok(token)
}
