//! Bearer token verification.
//!
//! Tokens are JWTs issued by an external identity provider. Two key sources
//! are supported:
//!
//! - **JWKS** (production): RS256 tokens checked against the provider's
//!   published keys, cached by key id for 10 minutes.
//! - **Shared secret** (development, tests): HS256 tokens.
//!
//! The caller's roles come from a configurable claim holding either a single
//! string or an array of strings. Unknown role names are ignored.

mod error;

pub use error::AuthError;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{AuthConfig, AuthKeys};

const JWKS_CACHE_TTL: Duration = Duration::from_secs(600);

/// Role granted to a caller by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Staff who take orders and look up stock.
    Employee,
    /// Staff who manage the catalog.
    Admin,
}

impl Role {
    /// Whether holding `self` is enough for a route that requires `required`.
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        matches!(
            (self, required),
            (Self::Admin, _) | (Self::Employee, Self::Employee)
        )
    }

    /// Parse a role name from a token claim, ignoring case.
    #[must_use]
    pub fn from_claim(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Token subject (`sub`).
    pub subject: String,
    /// Display name (`name` claim), when the provider sends one.
    pub name: Option<String>,
    /// Roles granted to the caller.
    pub roles: Vec<Role>,
}

impl Caller {
    /// Whether any of the caller's roles satisfies `required`.
    #[must_use]
    pub fn has_role(&self, required: Role) -> bool {
        self.roles.iter().any(|role| role.satisfies(required))
    }

    /// Identity recorded on data the caller creates.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.subject)
    }

    fn from_claims(
        mut claims: HashMap<String, Value>,
        roles_claim: &str,
    ) -> Result<Self, AuthError> {
        let subject = match claims.remove("sub") {
            Some(Value::String(sub)) if !sub.is_empty() => sub,
            _ => return Err(AuthError::MissingSubject),
        };
        let name = match claims.remove("name") {
            Some(Value::String(name)) if !name.is_empty() => Some(name),
            _ => None,
        };
        let roles = match claims.remove(roles_claim) {
            Some(Value::String(role)) => Role::from_claim(&role).into_iter().collect(),
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Role::from_claim)
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            subject,
            name,
            roles,
        })
    }
}

/// Extract the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns `AuthError::MalformedHeader` unless the value is `Bearer <token>`.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

// =============================================================================
// TokenVerifier
// =============================================================================

/// Verifies bearer tokens and turns their claims into a [`Caller`].
///
/// Cheap to clone; clones share the key cache.
#[derive(Clone)]
pub struct TokenVerifier {
    inner: Arc<VerifierInner>,
}

struct VerifierInner {
    keys: KeySource,
    validation: Validation,
    roles_claim: String,
}

enum KeySource {
    Shared(DecodingKey),
    Jwks(JwksKeys),
}

struct JwksKeys {
    client: reqwest::Client,
    url: String,
    cache: Cache<String, DecodingKey>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.inner.keys {
            KeySource::Shared(_) => "shared-secret",
            KeySource::Jwks(jwks) => jwks.url.as_str(),
        };
        f.debug_struct("TokenVerifier")
            .field("keys", &mode)
            .field("roles_claim", &self.inner.roles_claim)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Build a verifier from configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let (keys, algorithm) = match &config.keys {
            AuthKeys::Jwks { domain, .. } => {
                let cache = Cache::builder()
                    .max_capacity(32)
                    .time_to_live(JWKS_CACHE_TTL)
                    .build();
                let keys = KeySource::Jwks(JwksKeys {
                    client: reqwest::Client::new(),
                    url: format!("https://{domain}/.well-known/jwks.json"),
                    cache,
                });
                (keys, Algorithm::RS256)
            }
            AuthKeys::Shared { secret, .. } => (
                KeySource::Shared(DecodingKey::from_secret(secret.expose_secret().as_bytes())),
                Algorithm::HS256,
            ),
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = config.keys.issuer() {
            validation.set_issuer(&[issuer]);
        }
        match config.keys.audience() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            inner: Arc::new(VerifierInner {
                keys,
                validation,
                roles_claim: config.roles_claim.clone(),
            }),
        }
    }

    /// Verify a token and return the caller it identifies.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the token is malformed, expired, signed by an
    /// unknown key, or issued for another issuer or audience.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        let inner = &self.inner;
        let data = match &inner.keys {
            KeySource::Shared(key) => {
                decode::<HashMap<String, Value>>(token, key, &inner.validation)?
            }
            KeySource::Jwks(jwks) => {
                let header = decode_header(token)?;
                let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
                let key = jwks.key(&kid).await?;
                decode::<HashMap<String, Value>>(token, &key, &inner.validation)?
            }
        };

        Caller::from_claims(data.claims, &inner.roles_claim)
    }
}

impl JwksKeys {
    /// Signing key for `kid`, refreshing the key set on a miss.
    async fn key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cache.get(kid).await {
            return Ok(key);
        }

        debug!(kid, url = %self.url, "Fetching signing keys");
        let set: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        for jwk in &set.keys {
            let Some(id) = &jwk.common.key_id else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => self.cache.insert(id.clone(), key).await,
                Err(e) => warn!(kid = %id, error = %e, "Skipping unusable signing key"),
            }
        }

        self.cache
            .get(kid)
            .await
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }
}
