use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::{
    db,
    error::{AppError, Result},
    models::verification_code::{NewCode, VerificationCode},
    store::CodeStore,
};

/// A helper function to map a `tokio_postgres::Row` to a `VerificationCode`.
fn row_to_code(row: &Row) -> Result<VerificationCode> {
    Ok(VerificationCode {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        token: row.try_get("token").map_err(|_| AppError::MissingData("token".to_string()))?,
        expires_at: row.try_get("expires_at").map_err(|_| AppError::MissingData("expires_at".to_string()))?,
        is_active: row.try_get("is_active").map_err(|_| AppError::MissingData("is_active".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Postgres-backed [`CodeStore`].
#[derive(Clone)]
pub struct PgCodeStore {
    pool: Pool,
}

impl PgCodeStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Rotation runs deactivate and insert as one statement so no reader ever
/// sees two active codes.
const ROTATE_INSERT: &str = r#"
    WITH retired AS (
        UPDATE verification_codes
        SET is_active = false
        WHERE is_active = true
    )
    INSERT INTO verification_codes (id, token, expires_at, is_active, created_at)
    VALUES ($1, $2, $3, true, $4)
    RETURNING id, token, expires_at, is_active, created_at
"#;

impl CodeStore for PgCodeStore {
    async fn create(&self, code: NewCode) -> Result<VerificationCode> {
        let client = self.pool.get().await?;

        let params: [&(dyn tokio_postgres::types::ToSql + Sync); 4] =
            [&code.id, &code.token, &code.expires_at, &code.created_at];

        match client.query_one(ROTATE_INSERT, &params).await {
            Ok(row) => row_to_code(&row),
            // Two rotations raced and this one lost: the winner's row became
            // the single active code after our UPDATE ran. Run once more to
            // retire it; the partial unique index keeps the invariant.
            Err(ref e) if db::is_unique_violation(e) => {
                let row = client.query_one(ROTATE_INSERT, &params).await?;
                row_to_code(&row)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_active(&self) -> Result<Option<VerificationCode>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, token, expires_at, is_active, created_at
                FROM verification_codes
                WHERE is_active = true
                "#,
                &[],
            )
            .await?;
        row.map(|r| row_to_code(&r)).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<VerificationCode>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, token, expires_at, is_active, created_at
                FROM verification_codes
                WHERE token = $1
                "#,
                &[&token],
            )
            .await?;
        row.map(|r| row_to_code(&r)).transpose()
    }

    async fn deactivate_all(&self) -> Result<u64> {
        let client = self.pool.get().await?;
        let touched = client
            .execute(
                r#"
                UPDATE verification_codes
                SET is_active = false
                WHERE is_active = true
                "#,
                &[],
            )
            .await?;
        Ok(touched)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                r#"
                DELETE FROM verification_codes
                WHERE expires_at < $1
                "#,
                &[&now],
            )
            .await?;
        Ok(deleted)
    }
}
