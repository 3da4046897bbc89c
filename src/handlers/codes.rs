use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{error::Result, handlers::auth::AuthResponse, state::AppState};

/// Returns the active verification code, minting a fresh one when none is
/// active or the active one has expired.
#[axum::debug_handler]
pub async fn get_active(State(state): State<AppState>) -> Result<Response> {
    let code = state.codes.get_or_create_active().await?;
    Ok((StatusCode::OK, Json(code)).into_response())
}

/// Force-rotates the verification code. The previous code stops working
/// the moment this returns.
#[axum::debug_handler]
pub async fn generate(State(state): State<AppState>) -> Result<Response> {
    let code = state.codes.generate_new().await?;

    tracing::info!("✅ Verification code rotated: {}", code.id);

    Ok((StatusCode::CREATED, Json(code)).into_response())
}

/// Deactivates the active verification code without issuing a replacement.
#[axum::debug_handler]
pub async fn deactivate(State(state): State<AppState>) -> Result<Response> {
    let touched = state.codes.deactivate_active().await?;

    let response = AuthResponse {
        success: true,
        message: format!("Deactivated {} verification code(s)", touched),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
