//! Credential handling: password hashing and JWT issuance.
//!
//! # Responsibilities
//! - Hash and verify passwords (bcrypt, configurable cost)
//! - Mint and validate bearer tokens carrying account id and role
//!
//! Token verification for inbound requests lives in
//! `http::middleware::auth`; this module is the crypto surface it calls.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::store::models::{User, UserRole};

/// Claims carried by issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (ObjectId hex).
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Issued at, seconds since epoch.
    pub iat: i64,
}

/// Mint a token for an account.
///
/// Callers pass a stored user; an account without an id has not been
/// persisted and cannot be issued a token.
pub fn create_token(config: &AuthConfig, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let id = user.id.ok_or(jsonwebtoken::errors::ErrorKind::InvalidSubject)?;
    let now = Utc::now();
    let claims = Claims {
        sub: id.to_hex(),
        email: user.email.clone(),
        role: user.role,
        exp: (now + Duration::hours(config.token_ttl_hours as i64)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Validate a token and return its claims. Expiry is enforced.
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Hash a password at the configured cost.
pub fn hash_password(config: &AuthConfig, password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, config.bcrypt_cost)
}

/// Constant-time password check against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 1,
            // Minimum cost keeps the hashing tests fast.
            bcrypt_cost: 4,
        }
    }

    fn test_user() -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: String::new(),
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip() {
        let config = test_config();
        let user = test_user();

        let token = create_token(&config, &user).unwrap();
        let claims = verify_token(&config, &token).unwrap();

        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, UserRole::User);
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let config = test_config();
        let token = create_token(&config, &test_user()).unwrap();

        let other = AuthConfig {
            jwt_secret: "different-secret".into(),
            ..test_config()
        };
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn unsaved_user_cannot_get_a_token() {
        let config = test_config();
        let mut user = test_user();
        user.id = None;

        assert!(create_token(&config, &user).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let config = test_config();
        let hash = hash_password(&config, "secret-password").unwrap();

        assert!(verify_password("secret-password", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }
}
