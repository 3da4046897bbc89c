use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::refresh_token::{NewRefreshToken, RefreshToken},
    store::CredentialStore,
};

/// A helper function to map a `tokio_postgres::Row` to a `RefreshToken`.
fn row_to_refresh_token(row: &Row) -> Result<RefreshToken> {
    Ok(RefreshToken {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        token: row.try_get("token").map_err(|_| AppError::MissingData("token".to_string()))?,
        expires_at: row.try_get("expires_at").map_err(|_| AppError::MissingData("expires_at".to_string()))?,
        revoked: row.try_get("revoked").map_err(|_| AppError::MissingData("revoked".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Postgres-backed [`CredentialStore`].
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: Pool,
}

impl PgCredentialStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for PgCredentialStore {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshToken> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO refresh_tokens (id, user_id, token, expires_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, token, expires_at, revoked, created_at
                "#,
                &[&token.id, &token.user_id, &token.token, &token.expires_at],
            )
            .await?;
        row_to_refresh_token(&row)
    }

    async fn find_by_value(&self, token: &str) -> Result<Option<RefreshToken>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, user_id, token, expires_at, revoked, created_at
                FROM refresh_tokens
                WHERE token = $1
                "#,
                &[&token],
            )
            .await?;
        row.map(|r| row_to_refresh_token(&r)).transpose()
    }

    async fn revoke(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        // Compare-and-set: only one caller ever sees a row flip. Concurrent
        // rotations of the same token lose here and get a revoked error.
        let touched = client
            .execute(
                r#"
                UPDATE refresh_tokens
                SET revoked = true
                WHERE id = $1 AND revoked = false
                "#,
                &[&id],
            )
            .await?;
        Ok(touched > 0)
    }
}
