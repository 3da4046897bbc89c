use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use garde::Validate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    crypto::jwt::AccessClaims,
    error::Result,
    handlers::pagination::{PageQuery, Paginated},
    state::AppState,
};

/// The request payload for a code-based check-in.
#[derive(Deserialize, Debug, Validate)]
pub struct CheckInRequest {
    #[garde(length(min = 1))]
    pub code: String,
    #[garde(length(max = 255))]
    #[serde(default)]
    pub location: String,
    #[garde(length(max = 500))]
    #[serde(default)]
    pub notes: String,
}

/// The request payload for a staff-entered attendance record.
#[derive(Deserialize, Debug, Validate)]
pub struct ManualMarkRequest {
    #[garde(skip)]
    pub user_id: Uuid,
    #[garde(skip)]
    pub period_date: NaiveDate,
    #[garde(length(max = 500))]
    #[serde(default)]
    pub notes: String,
}

/// The query parameters for a date-range lookup.
#[derive(Deserialize, Debug)]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Redeems the current verification code as the caller's check-in.
#[axum::debug_handler]
pub async fn check_in(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(payload): Json<CheckInRequest>,
) -> Result<Response> {
    payload.validate()?;

    let record = state
        .attendance
        .check_in(claims.sub, &payload.code, payload.location, payload.notes)
        .await?;

    tracing::info!("✅ Check-in accepted for user: {}", claims.sub);

    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// Stamps the check-out instant onto the caller's record for today.
#[axum::debug_handler]
pub async fn check_out(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Response> {
    let record = state.attendance.check_out(claims.sub).await?;

    tracing::info!("✅ Check-out accepted for user: {}", claims.sub);

    Ok((StatusCode::OK, Json(record)).into_response())
}

/// Returns the caller's attendance record for the current period.
#[axum::debug_handler]
pub async fn today(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Response> {
    let record = state.attendance.get_today(claims.sub).await?;
    Ok((StatusCode::OK, Json(record)).into_response())
}

/// Returns a page of the caller's attendance history, newest first.
#[axum::debug_handler]
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let (page, limit) = query.resolve(&state.config);
    let (records, total) = state
        .attendance
        .get_user_attendance(claims.sub, page, limit)
        .await?;

    let response = Paginated {
        data: records,
        total,
        page,
        limit,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the caller's records between two dates, inclusive on both ends.
#[axum::debug_handler]
pub async fn range(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Query(query): Query<RangeQuery>,
) -> Result<Response> {
    let records = state
        .attendance
        .get_by_date_range(claims.sub, query.start_date, query.end_date)
        .await?;

    Ok((StatusCode::OK, Json(records)).into_response())
}

/// Returns a single attendance record by id.
#[axum::debug_handler]
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let record = state.attendance.get_by_id(id).await?;
    Ok((StatusCode::OK, Json(record)).into_response())
}

/// Records attendance on behalf of another user, without a code.
#[axum::debug_handler]
pub async fn manual_mark(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
    Json(payload): Json<ManualMarkRequest>,
) -> Result<Response> {
    payload.validate()?;

    let record = state
        .attendance
        .manual_mark(payload.user_id, payload.period_date, payload.notes)
        .await?;

    tracing::info!(
        "✅ Manual attendance recorded by {} for user: {}",
        claims.sub,
        payload.user_id
    );

    Ok((StatusCode::CREATED, Json(record)).into_response())
}
