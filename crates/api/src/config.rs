//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOCKS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - Either `AUTH_DOMAIN` + `AUTH_AUDIENCE` (identity provider, RS256 via JWKS)
//!   or `AUTH_SIGNING_SECRET` (shared HS256 secret, min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOCKS_HOST` - Bind address (default: 127.0.0.1)
//! - `STOCKS_PORT` - Listen port (default: 5080)
//! - `STOCKS_RUN_MIGRATIONS` - Apply migrations at startup (default: true)
//! - `STOCKS_STATIC_DIR` - Directory holding the built frontend
//! - `STOCKS_CORS_ORIGINS` - Comma-separated allowed origins
//! - `AUTH_ISSUER` - Expected `iss` for shared-secret tokens
//! - `AUTH_ROLES_CLAIM` - Claim holding the caller's roles (default: roles)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `STOCKS_TLS_CERT` - PEM-encoded certificate chain
//! - `STOCKS_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_ROLES_CLAIM: &str = "roles";

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

/// API server configuration.
#[derive(Debug, Clone)]
pub struct StocksConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Apply embedded migrations before serving
    pub run_migrations: bool,
    /// Built frontend to serve for non-API paths
    pub static_dir: Option<PathBuf>,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
    /// Bearer token verification
    pub auth: AuthConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// How bearer tokens are verified.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Where signing keys come from.
    pub keys: AuthKeys,
    /// Name of the claim listing the caller's roles.
    pub roles_claim: String,
}

/// Source of token signing keys.
#[derive(Clone)]
pub enum AuthKeys {
    /// RS256 tokens from an identity provider, keys fetched from its JWKS.
    Jwks {
        /// Provider domain, e.g. `stocks.eu.auth0.com`.
        domain: String,
        /// Expected `aud` claim.
        audience: String,
    },
    /// HS256 tokens signed with a shared secret.
    Shared {
        /// Signing secret.
        secret: SecretString,
        /// Expected `iss` claim, if checked.
        issuer: Option<String>,
        /// Expected `aud` claim, if checked.
        audience: Option<String>,
    },
}

impl std::fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jwks { domain, audience } => f
                .debug_struct("Jwks")
                .field("domain", domain)
                .field("audience", audience)
                .finish(),
            Self::Shared {
                issuer, audience, ..
            } => f
                .debug_struct("Shared")
                .field("secret", &"[REDACTED]")
                .field("issuer", issuer)
                .field("audience", audience)
                .finish(),
        }
    }
}

impl AuthKeys {
    /// Issuer the provider puts in `iss`.
    #[must_use]
    pub fn issuer(&self) -> Option<String> {
        match self {
            Self::Jwks { domain, .. } => Some(format!("https://{domain}/")),
            Self::Shared { issuer, .. } => issuer.clone(),
        }
    }

    /// Expected audience, if checked.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        match self {
            Self::Jwks { audience, .. } => Some(audience),
            Self::Shared { audience, .. } => audience.as_deref(),
        }
    }
}

impl AuthConfig {
    /// Load auth configuration from environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if neither or both key sources are configured,
    /// or if the shared secret is weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(
            get_optional_env("AUTH_DOMAIN"),
            get_optional_env("AUTH_AUDIENCE"),
            get_optional_env("AUTH_SIGNING_SECRET"),
            get_optional_env("AUTH_ISSUER"),
            get_optional_env("AUTH_ROLES_CLAIM"),
        )
    }

    fn from_values(
        domain: Option<String>,
        audience: Option<String>,
        secret: Option<String>,
        issuer: Option<String>,
        roles_claim: Option<String>,
    ) -> Result<Self, ConfigError> {
        let keys = match (domain, secret) {
            (Some(domain), None) => {
                let audience =
                    audience.ok_or_else(|| ConfigError::MissingEnvVar("AUTH_AUDIENCE".to_string()))?;
                AuthKeys::Jwks {
                    domain: domain.trim_end_matches('/').to_string(),
                    audience,
                }
            }
            (None, Some(secret)) => {
                validate_secret_strength(&secret, "AUTH_SIGNING_SECRET")?;
                let secret = SecretString::from(secret);
                validate_signing_secret(&secret, "AUTH_SIGNING_SECRET")?;
                AuthKeys::Shared {
                    secret,
                    issuer,
                    audience,
                }
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidEnvVar(
                    "AUTH_*".to_string(),
                    "Set either AUTH_DOMAIN or AUTH_SIGNING_SECRET, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(ConfigError::MissingEnvVar(
                    "AUTH_DOMAIN or AUTH_SIGNING_SECRET".to_string(),
                ));
            }
        };

        Ok(Self {
            keys,
            roles_claim: roles_claim.unwrap_or_else(|| DEFAULT_ROLES_CLAIM.to_string()),
        })
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("STOCKS_TLS_CERT");
        let key_pem = get_optional_env("STOCKS_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "STOCKS_TLS_*".to_string(),
                "Both STOCKS_TLS_CERT and STOCKS_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl StocksConfig {
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

        let database_url = get_database_url("STOCKS_DATABASE_URL")?;
        let host = get_env_or_default("STOCKS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOCKS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("STOCKS_PORT", "5080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOCKS_PORT".to_string(), e.to_string()))?;
        let run_migrations = parse_bool(
            "STOCKS_RUN_MIGRATIONS",
            &get_env_or_default("STOCKS_RUN_MIGRATIONS", "true"),
        )?;
        let static_dir = get_optional_env("STOCKS_STATIC_DIR").map(PathBuf::from);
        let cors_origins = get_optional_env("STOCKS_CORS_ORIGINS")
            .map(|value| parse_list(&value))
            .unwrap_or_default();
        let auth = AuthConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            run_migrations,
            static_dir,
            cors_origins,
            auth,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Database URL alone, for tools that don't serve HTTP.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("STOCKS_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

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

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_signing_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
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
