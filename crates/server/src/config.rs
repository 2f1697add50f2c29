//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BAZAAR_APP_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 3000)
//! - `BAZAAR_TOKEN_TTL_HOURS` - Session token lifetime (default: 24)
//! - `BAZAAR_VERIFICATION_CODE_TTL_MINUTES` - Verification code lifetime (default: 30)
//! - `BAZAAR_EXPOSE_VERIFICATION_CODE` - Return codes in API responses (default: false, dev only)
//! - `BAZAAR_ARGON2_MEMORY_KIB`, `BAZAAR_ARGON2_ITERATIONS`, `BAZAAR_ARGON2_PARALLELISM` -
//!   Password hashing cost (defaults: Argon2 recommended parameters)
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER` - SMS delivery;
//!   codes are only logged when these are unset
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_APP_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Marketplace server configuration.
///
/// Built once at start-up and handed to [`crate::state::AppState::new`], which
/// passes each service the pieces it needs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Secret used to sign session tokens
    pub app_secret: SecretString,
    /// Session token lifetime in hours
    pub token_ttl_hours: u32,
    /// Verification code lifetime in minutes
    pub verification_code_ttl_minutes: u32,
    /// Include freshly generated verification codes in API responses
    pub expose_verification_code: bool,
    /// Password hashing cost
    pub password_hashing: PasswordHashingConfig,
    /// Twilio SMS configuration (codes are logged instead when absent)
    pub twilio: Option<TwilioConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Twilio Messages API configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct TwilioConfig {
    /// Account SID (also the basic-auth username)
    pub account_sid: String,
    /// Auth token (basic-auth password)
    pub auth_token: SecretString,
    /// Sender number in E.164 format
    pub from_number: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BAZAAR_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("BAZAAR_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("BAZAAR_PORT", "3000")?;

        let app_secret = get_validated_secret("BAZAAR_APP_SECRET")?;
        validate_app_secret(&app_secret, "BAZAAR_APP_SECRET")?;

        let token_ttl_hours = get_parsed_or_default::<u32>("BAZAAR_TOKEN_TTL_HOURS", "24")?;
        let verification_code_ttl_minutes =
            get_parsed_or_default::<u32>("BAZAAR_VERIFICATION_CODE_TTL_MINUTES", "30")?;
        let expose_verification_code =
            get_parsed_or_default::<bool>("BAZAAR_EXPOSE_VERIFICATION_CODE", "false")?;

        let password_hashing = PasswordHashingConfig::from_env()?;
        let twilio = TwilioConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            app_secret,
            token_ttl_hours,
            verification_code_ttl_minutes,
            expose_verification_code,
            password_hashing,
            twilio,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Session token lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.token_ttl_hours))
    }

    /// Verification code lifetime.
    #[must_use]
    pub fn verification_code_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.verification_code_ttl_minutes))
    }
}

impl PasswordHashingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            memory_kib: get_parsed_or_default(
                "BAZAAR_ARGON2_MEMORY_KIB",
                &defaults.memory_kib.to_string(),
            )?,
            iterations: get_parsed_or_default(
                "BAZAAR_ARGON2_ITERATIONS",
                &defaults.iterations.to_string(),
            )?,
            parallelism: get_parsed_or_default(
                "BAZAAR_ARGON2_PARALLELISM",
                &defaults.parallelism.to_string(),
            )?,
        })
    }
}

impl TwilioConfig {
    /// All three variables must be set together; none set disables SMS.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(account_sid) = get_optional_env("TWILIO_ACCOUNT_SID") else {
            return Ok(None);
        };

        Ok(Some(Self {
            account_sid,
            auth_token: SecretString::from(get_required_env("TWILIO_AUTH_TOKEN")?),
            from_number: get_required_env("TWILIO_FROM_NUMBER")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable (or its default) parsed as `T`.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that the signing secret meets minimum length requirements.
fn validate_app_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_APP_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_APP_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
