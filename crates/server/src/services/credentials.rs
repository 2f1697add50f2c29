//! Password hashing, session tokens and random codes.
//!
//! Passwords are hashed with Argon2id into PHC strings. Session tokens are
//! HS256 JWTs carrying the user id, email and role, signed with the
//! configured app secret.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{Email, OrderReference, Role, UserId, VerificationCode};

use crate::config::ServerConfig;

/// Errors raised by the credential service.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Argon2 rejected the configured cost parameters.
    #[error("invalid password hashing parameters: {0}")]
    Params(argon2::Error),

    /// Hashing a password failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Token could not be signed, or failed validation.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The random source produced a value outside the code range.
    #[error("random code generation failed")]
    CodeGeneration,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub email: Email,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Hashes passwords and issues/decodes session tokens.
#[derive(Clone)]
pub struct Credentials {
    argon2: Argon2<'static>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl Credentials {
    /// Build the service from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Params` if the Argon2 cost parameters are
    /// out of range.
    pub fn new(config: &ServerConfig) -> Result<Self, CredentialError> {
        let cost = config.password_hashing;
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(CredentialError::Params)?;
        let secret = config.app_secret.expose_secret().as_bytes();

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_ttl: config.token_ttl(),
        })
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::PasswordHash` if Argon2 fails.
    pub fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| CredentialError::PasswordHash)
    }

    /// Check a password against a stored PHC hash.
    ///
    /// A malformed stored hash never verifies.
    #[must_use]
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Issue a signed session token.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Token` if signing fails.
    pub fn issue_token(
        &self,
        user_id: UserId,
        email: &Email,
        role: Role,
    ) -> Result<String, CredentialError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.clone(),
            role,
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Validate a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Token` for any invalid or expired token.
    pub fn decode_token(&self, token: &str) -> Result<Claims, CredentialError> {
        let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

/// Draw a uniformly random six-digit verification code.
///
/// # Errors
///
/// Returns `CredentialError::CodeGeneration` if the draw falls outside the
/// code range.
pub fn generate_verification_code() -> Result<VerificationCode, CredentialError> {
    let value = rand::rng().random_range(VerificationCode::RANGE);
    VerificationCode::new(value).ok_or(CredentialError::CodeGeneration)
}

/// Draw a uniformly random eight-digit order reference.
///
/// # Errors
///
/// Returns `CredentialError::CodeGeneration` if the draw falls outside the
/// reference range.
pub fn generate_order_reference() -> Result<OrderReference, CredentialError> {
    let value = rand::rng().random_range(OrderReference::RANGE);
    OrderReference::new(value).ok_or(CredentialError::CodeGeneration)
}
