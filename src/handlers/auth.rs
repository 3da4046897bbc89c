use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{error::Result, state::AppState, validation::auth::*};

/// The request payload for user registration.
#[derive(Deserialize, Debug, Validate)]
pub struct RegisterRequest {
    #[garde(email)]
    pub email: String,
    #[garde(custom(password_strength))]
    pub password: String,
    #[garde(length(min = 1, max = 100))]
    pub first_name: String,
    #[garde(length(min = 1, max = 100))]
    pub last_name: String,
}

/// The request payload for user login.
#[derive(Deserialize, Debug, Validate)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// The request payload for refreshing a token pair.
#[derive(Deserialize, Debug, Validate)]
pub struct RefreshRequest {
    #[garde(length(min = 1))]
    pub refresh_token: String,
}

/// The request payload for logout.
#[derive(Deserialize, Debug, Validate)]
pub struct LogoutRequest {
    #[garde(length(min = 1))]
    pub refresh_token: String,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt for: {}", payload.email);
    payload.validate()?;

    let user = state
        .users
        .register(
            payload.email,
            payload.password,
            payload.first_name,
            payload.last_name,
        )
        .await?;

    tracing::info!("✅ User registered: {}", user.id);

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt for: {}", payload.email);
    payload.validate()?;

    let pair = state.auth.login(&payload.email, &payload.password).await?;

    tracing::info!("✅ Login successful for: {}", payload.email);

    Ok((StatusCode::OK, Json(pair)).into_response())
}

/// Handles refresh token rotation.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Response> {
    payload.validate()?;

    let pair = state.auth.refresh(&payload.refresh_token).await?;

    tracing::info!("✅ Token pair refreshed");

    Ok((StatusCode::OK, Json(pair)).into_response())
}

/// Handles user logout.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Response> {
    payload.validate()?;

    state.auth.logout(&payload.refresh_token).await?;

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
