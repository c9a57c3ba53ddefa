//! Bearer token authorization.
//!
//! [`authorize`] runs as a route layer on the API router, so the matched
//! route template is known. It looks the route up in [`ROUTE_REQUIREMENTS`]
//! and rejects the request before the handler runs when the caller doesn't
//! qualify:
//!
//! | Situation                                  | Response |
//! |--------------------------------------------|----------|
//! | Token present but invalid (any route)      | 401      |
//! | Protected route, no token                  | 401      |
//! | Protected route, token lacks required role | 403      |
//!
//! Routes missing from the table require [`Role::Admin`].

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{Method, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{AuthError, Caller, Role, bearer_token};
use crate::state::AppState;

/// What a route asks of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone may call; a valid token is still recorded.
    Public,
    /// Caller must hold a role that satisfies this one.
    Role(Role),
}

const ADMIN: Requirement = Requirement::Role(Role::Admin);
const EMPLOYEE: Requirement = Requirement::Role(Role::Employee);

/// Requirement per `(method, route template)`.
pub const ROUTE_REQUIREMENTS: &[(&str, &str, Requirement)] = &[
    ("POST", "/api/product", ADMIN),
    ("PUT", "/api/product/{id}", ADMIN),
    ("GET", "/api/product/{id}", Requirement::Public),
    ("DELETE", "/api/product/{id}", ADMIN),
    ("POST", "/api/product/{id}/colors", Requirement::Public),
    ("DELETE", "/api/product/{id}/colors/{color_id}", ADMIN),
    ("GET", "/api/products", EMPLOYEE),
    ("POST", "/api/orders", Requirement::Public),
    ("GET", "/api/orders", EMPLOYEE),
    ("GET", "/api/orders/{id}", EMPLOYEE),
];

/// Look up the requirement for a route. Unlisted routes require `Admin`.
#[must_use]
pub fn requirement_for(method: &Method, route: &str) -> Requirement {
    ROUTE_REQUIREMENTS
        .iter()
        .find(|(m, r, _)| *m == method.as_str() && *r == route)
        .map_or(ADMIN, |(_, _, requirement)| *requirement)
}

/// Verify the bearer token, if any, and enforce the route's requirement.
///
/// On success the caller is stored in request extensions for
/// [`CurrentCaller`].
///
/// # Errors
///
/// Returns `AppError::Unauthorized` or `AppError::Forbidden` as described in
/// the module docs.
pub async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |m| m.as_str().to_string());
    let requirement = requirement_for(request.method(), &route);

    let caller = match request.headers().get(AUTHORIZATION) {
        Some(value) => {
            let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
            let token = bearer_token(value)?;
            Some(state.verifier().verify(token).await?)
        }
        None => None,
    };

    if let Requirement::Role(required) = requirement {
        let Some(caller) = &caller else {
            return Err(AppError::Unauthorized(
                "Authentication required".to_string(),
            ));
        };
        if !caller.has_role(required) {
            tracing::info!(
                subject = %caller.subject,
                %route,
                required = %required,
                "Caller lacks required role"
            );
            return Err(AppError::Forbidden(format!(
                "This action requires the {required} role"
            )));
        }
    }

    if let Some(caller) = &caller {
        set_sentry_user(&caller.subject, caller.name.as_deref());
    }
    request.extensions_mut().insert(CurrentCaller(caller));

    Ok(next.run(request).await)
}

/// Extractor for the caller verified by [`authorize`].
///
/// `None` on public routes called without a token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentCaller(caller): CurrentCaller) -> impl IntoResponse {
///     caller.map_or("anonymous".to_string(), |c| c.identity().to_string())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentCaller(pub Option<Caller>);

impl<S> FromRequestParts<S> for CurrentCaller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or(Self(None)))
    }
}
