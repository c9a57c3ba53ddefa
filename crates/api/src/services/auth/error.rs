//! Bearer token verification errors.

use thiserror::Error;

/// Errors that can occur while verifying a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// `Authorization` header present but not `Bearer <token>`.
    #[error("authorization header must use the Bearer scheme")]
    MalformedHeader,

    /// Signature, expiry, issuer or audience check failed.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// Token names a signing key the provider doesn't publish.
    #[error("no signing key found for key id {0}")]
    UnknownKey(String),

    /// Token header carries no key id, which JWKS verification needs.
    #[error("token header has no key id")]
    MissingKeyId,

    /// Token has no usable `sub` claim.
    #[error("token has no subject")]
    MissingSubject,

    /// Signing keys could not be downloaded.
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),
}
