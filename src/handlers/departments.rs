use axum::{
    Extension, Json,
    extract::{Path, State},
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
    services::departments::DepartmentChanges,
    state::AppState,
};

/// The request payload for creating a department.
#[derive(Deserialize, Debug, Validate)]
pub struct CreateDepartmentRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(length(max = 500))]
    #[serde(default)]
    pub description: String,
    #[garde(skip)]
    #[serde(default)]
    pub manager_id: Option<Uuid>,
}

/// The request payload for a partial department update.
#[derive(Deserialize, Debug, Validate)]
pub struct UpdateDepartmentRequest {
    #[garde(inner(length(min = 1, max = 100)))]
    #[serde(default)]
    pub name: Option<String>,
    #[garde(inner(length(max = 500)))]
    #[serde(default)]
    pub description: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub manager_id: Option<Uuid>,
}

/// Returns every live department.
#[axum::debug_handler]
pub async fn list(State(state): State<AppState>) -> Result<Response> {
    let departments = state.departments.list_all().await?;
    Ok((StatusCode::OK, Json(departments)).into_response())
}

/// Returns a single department by id.
#[axum::debug_handler]
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let department = state.departments.get_by_id(id).await?;
    Ok((StatusCode::OK, Json(department)).into_response())
}

/// Creates a department. Admin only; reads on the same paths are open to
/// every authenticated user, so the role check lives here instead of a
/// route layer.
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(payload): Json<CreateDepartmentRequest>,
) -> Result<Response> {
    claims.ensure_admin()?;
    payload.validate()?;

    let department = state
        .departments
        .create(payload.name, payload.description, payload.manager_id)
        .await?;

    tracing::info!("✅ Department created: {}", department.id);

    Ok((StatusCode::CREATED, Json(department)).into_response())
}

/// Applies a partial update to a department. Admin only.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> Result<Response> {
    claims.ensure_admin()?;
    payload.validate()?;

    let changes = DepartmentChanges {
        name: payload.name,
        description: payload.description,
        manager_id: payload.manager_id,
    };

    let department = state.departments.update(id, changes).await?;

    tracing::info!("✅ Department updated: {}", department.id);

    Ok((StatusCode::OK, Json(department)).into_response())
}

/// Soft-deletes a department. Admin only.
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    claims.ensure_admin()?;

    state.departments.delete(id).await?;

    let response = AuthResponse {
        success: true,
        message: "Department deleted successfully".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
