use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::attendance::{Attendance, NewAttendance},
    store::AttendanceStore,
};

/// A helper function to map a `tokio_postgres::Row` to an `Attendance`.
fn row_to_attendance(row: &Row) -> Result<Attendance> {
    Ok(Attendance {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        period_date: row.try_get("period_date").map_err(|_| AppError::MissingData("period_date".to_string()))?,
        check_in: row.try_get("check_in").map_err(|_| AppError::MissingData("check_in".to_string()))?,
        check_out: row.try_get("check_out").map_err(|_| AppError::MissingData("check_out".to_string()))?,
        status: row.try_get("status").map_err(|_| AppError::MissingData("status".to_string()))?,
        location: row.try_get("location").map_err(|_| AppError::MissingData("location".to_string()))?,
        notes: row.try_get("notes").map_err(|_| AppError::MissingData("notes".to_string()))?,
        code_token: row.try_get("code_token").map_err(|_| AppError::MissingData("code_token".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        deleted_at: row.try_get("deleted_at").map_err(|_| AppError::MissingData("deleted_at".to_string()))?,
    })
}

/// Postgres-backed [`AttendanceStore`].
#[derive(Clone)]
pub struct PgAttendanceStore {
    pool: Pool,
}

impl PgAttendanceStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl AttendanceStore for PgAttendanceStore {
    async fn create(&self, record: NewAttendance) -> Result<Option<Attendance>> {
        let client = self.pool.get().await?;
        // ON CONFLICT DO NOTHING turns the duplicate-period race into a
        // None, which the service reports as an already-checked-in conflict.
        let row = client
            .query_opt(
                r#"
                INSERT INTO attendance
                    (id, user_id, period_date, check_in, status, location, notes, code_token)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (user_id, period_date) DO NOTHING
                RETURNING *
                "#,
                &[
                    &record.id,
                    &record.user_id,
                    &record.period_date,
                    &record.check_in,
                    &record.status,
                    &record.location,
                    &record.notes,
                    &record.code_token,
                ],
            )
            .await?;
        row.map(|r| row_to_attendance(&r)).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attendance>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM attendance
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_attendance(&r)).transpose()
    }

    async fn find_by_user_and_period(
        &self,
        user_id: Uuid,
        period: NaiveDate,
    ) -> Result<Option<Attendance>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM attendance
                WHERE user_id = $1 AND period_date = $2 AND deleted_at IS NULL
                "#,
                &[&user_id, &period],
            )
            .await?;
        row.map(|r| row_to_attendance(&r)).transpose()
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Attendance>, i64)> {
        let client = self.pool.get().await?;

        let total_row = client
            .query_one(
                r#"
                SELECT count(*)
                FROM attendance
                WHERE user_id = $1 AND deleted_at IS NULL
                "#,
                &[&user_id],
            )
            .await?;
        let total: i64 = total_row
            .try_get(0)
            .map_err(|_| AppError::MissingData("count".to_string()))?;

        let rows = client
            .query(
                r#"
                SELECT *
                FROM attendance
                WHERE user_id = $1 AND deleted_at IS NULL
                ORDER BY check_in DESC
                LIMIT $2 OFFSET $3
                "#,
                &[&user_id, &limit, &offset],
            )
            .await?;

        let records = rows
            .iter()
            .map(row_to_attendance)
            .collect::<Result<Vec<_>>>()?;
        Ok((records, total))
    }

    async fn find_by_user_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT *
                FROM attendance
                WHERE user_id = $1
                  AND period_date BETWEEN $2 AND $3
                  AND deleted_at IS NULL
                ORDER BY period_date ASC
                "#,
                &[&user_id, &start, &end],
            )
            .await?;
        rows.iter().map(row_to_attendance).collect()
    }

    async fn find_most_recent_for_user(&self, user_id: Uuid) -> Result<Option<Attendance>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM attendance
                WHERE user_id = $1 AND deleted_at IS NULL
                ORDER BY check_in DESC
                LIMIT 1
                "#,
                &[&user_id],
            )
            .await?;
        row.map(|r| row_to_attendance(&r)).transpose()
    }

    async fn set_check_out(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Attendance>> {
        let client = self.pool.get().await?;
        // The IS NULL guard means a second close matches no row; the service
        // turns that None into an already-checked-out conflict.
        let row = client
            .query_opt(
                r#"
                UPDATE attendance
                SET check_out = $2
                WHERE id = $1 AND check_out IS NULL AND deleted_at IS NULL
                RETURNING *
                "#,
                &[&id, &at],
            )
            .await?;
        row.map(|r| row_to_attendance(&r)).transpose()
    }
}
