//! Services used by the HTTP layer.
//!
//! # Services
//!
//! - `auth` - Bearer token verification (JWKS or shared secret)

pub mod auth;

pub use auth::{AuthError, Caller, Role, TokenVerifier};
