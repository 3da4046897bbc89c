use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garde::Validate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    crypto::jwt::AccessClaims,
    error::Result,
    handlers::auth::AuthResponse,
    handlers::pagination::{PageQuery, Paginated},
    models::user::Role,
    services::users::UserChanges,
    state::AppState,
    validation::auth::*,
};

/// The request payload for an admin-created account.
#[derive(Deserialize, Debug, Validate)]
pub struct CreateUserRequest {
    #[garde(email)]
    pub email: String,
    #[garde(custom(password_strength))]
    pub password: String,
    #[garde(length(min = 1, max = 100))]
    pub first_name: String,
    #[garde(length(min = 1, max = 100))]
    pub last_name: String,
    #[garde(skip)]
    pub role: Role,
    #[garde(skip)]
    #[serde(default)]
    pub department_id: Option<Uuid>,
}

/// The request payload for a partial user update.
#[derive(Deserialize, Debug, Validate)]
pub struct UpdateUserRequest {
    #[garde(inner(length(min = 1, max = 100)))]
    #[serde(default)]
    pub first_name: Option<String>,
    #[garde(inner(length(min = 1, max = 100)))]
    #[serde(default)]
    pub last_name: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub role: Option<Role>,
    #[garde(skip)]
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[garde(skip)]
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// The request payload for changing the caller's own password.
#[derive(Deserialize, Debug, Validate)]
pub struct ChangePasswordRequest {
    #[garde(length(min = 1))]
    pub old_password: String,
    #[garde(custom(password_strength))]
    pub new_password: String,
}

/// Returns the caller's own account.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Response> {
    let user = state.users.get_by_id(claims.sub).await?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// Changes the caller's password after verifying the current one.
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response> {
    payload.validate()?;

    state
        .users
        .change_password(claims.sub, payload.old_password, payload.new_password)
        .await?;

    tracing::info!("✅ Password changed for user: {}", claims.sub);

    let response = AuthResponse {
        success: true,
        message: "Password changed successfully".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Creates an account with an explicit role and department.
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Response> {
    payload.validate()?;

    let user = state
        .users
        .create(
            payload.email,
            payload.password,
            payload.first_name,
            payload.last_name,
            payload.role,
            payload.department_id,
        )
        .await?;

    tracing::info!("✅ User created: {}", user.id);

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// Returns a page of accounts, oldest first.
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let (page, limit) = query.resolve(&state.config);
    let (users, total) = state.users.list(page, limit).await?;

    let response = Paginated {
        data: users,
        total,
        page,
        limit,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns a single account by id.
#[axum::debug_handler]
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let user = state.users.get_by_id(id).await?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

/// Applies a partial update to an account.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Response> {
    payload.validate()?;

    let changes = UserChanges {
        first_name: payload.first_name,
        last_name: payload.last_name,
        role: payload.role,
        department_id: payload.department_id,
        is_active: payload.is_active,
    };

    let user = state.users.update(id, changes).await?;

    tracing::info!("✅ User updated: {}", user.id);

    Ok((StatusCode::OK, Json(user)).into_response())
}

/// Soft-deletes an account.
#[axum::debug_handler]
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    state.users.delete(id).await?;

    let response = AuthResponse {
        success: true,
        message: "User deleted successfully".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
