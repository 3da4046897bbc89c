use axum::{
    Extension,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::{crypto::jwt::AccessClaims, error::AppError, state::AppState};

/// Extracts the bearer token from the Authorization header.
///
/// # Arguments
///
/// * `request` - The incoming request.
///
/// # Returns
///
/// An `Option` containing the token if present.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// A middleware that requires a valid access token.
///
/// On success the verified [`AccessClaims`] are inserted into the request
/// extensions for handlers and inner guards.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an [`AppError`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request).ok_or(AppError::InvalidToken)?;

    let claims = state.auth.validate_access_token(token)?;
    tracing::debug!("Authenticated request from user: {}", claims.sub);

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// A middleware that requires the caller to be staff (admin or manager).
///
/// Must run inside [`require_auth`], which provides the claims extension.
pub async fn require_staff(
    Extension(claims): Extension<AccessClaims>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !claims.role.is_staff() {
        tracing::warn!("Staff route refused for user: {}", claims.sub);
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}

/// A middleware that requires the caller to be an admin.
///
/// Must run inside [`require_auth`], which provides the claims extension.
pub async fn require_admin(
    Extension(claims): Extension<AccessClaims>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    claims.ensure_admin()?;
    Ok(next.run(request).await)
}
