use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    db,
    error::{AppError, Result},
    models::user::{NewUser, User},
    store::UserStore,
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password_hash: row.try_get("password_hash").map_err(|_| AppError::MissingData("password_hash".to_string()))?,
        first_name: row.try_get("first_name").map_err(|_| AppError::MissingData("first_name".to_string()))?,
        last_name: row.try_get("last_name").map_err(|_| AppError::MissingData("last_name".to_string()))?,
        role: row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?,
        department_id: row.try_get("department_id").map_err(|_| AppError::MissingData("department_id".to_string()))?,
        is_active: row.try_get("is_active").map_err(|_| AppError::MissingData("is_active".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
        deleted_at: row.try_get("deleted_at").map_err(|_| AppError::MissingData("deleted_at".to_string()))?,
    })
}

/// Postgres-backed [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO users
                    (id, email, password_hash, first_name, last_name, role, department_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
                &[
                    &user.id,
                    &user.email,
                    &user.password_hash,
                    &user.first_name,
                    &user.last_name,
                    &user.role,
                    &user.department_id,
                ],
            )
            .await
            .map_err(|e| match e {
                ref e if db::is_unique_violation(e) => {
                    AppError::Conflict("Email already registered".to_string())
                }
                ref e if db::is_foreign_key_violation(e) => {
                    AppError::Validation("Unknown department".to_string())
                }
                e => e.into(),
            })?;
        row_to_user(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM users
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        // Inactive accounts still match: login tells inactive apart from
        // unknown, so the lookup must not filter on is_active.
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM users
                WHERE email = $1 AND deleted_at IS NULL
                "#,
                &[&email],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn update(&self, user: &User) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                UPDATE users
                SET
                    password_hash = $2,
                    first_name = $3,
                    last_name = $4,
                    role = $5,
                    department_id = $6,
                    is_active = $7,
                    updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                RETURNING *
                "#,
                &[
                    &user.id,
                    &user.password_hash,
                    &user.first_name,
                    &user.last_name,
                    &user.role,
                    &user.department_id,
                    &user.is_active,
                ],
            )
            .await
            .map_err(|e| match e {
                ref e if db::is_foreign_key_violation(e) => {
                    AppError::Validation("Unknown department".to_string())
                }
                e => e.into(),
            })?
            .ok_or(AppError::NotFound)?;
        row_to_user(&row)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let touched = client
            .execute(
                r#"
                UPDATE users
                SET deleted_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                &[&id],
            )
            .await?;
        Ok(touched > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64)> {
        let client = self.pool.get().await?;

        let total_row = client
            .query_one(
                r#"
                SELECT count(*)
                FROM users
                WHERE deleted_at IS NULL
                "#,
                &[],
            )
            .await?;
        let total: i64 = total_row
            .try_get(0)
            .map_err(|_| AppError::MissingData("count".to_string()))?;

        let rows = client
            .query(
                r#"
                SELECT *
                FROM users
                WHERE deleted_at IS NULL
                ORDER BY created_at ASC
                LIMIT $1 OFFSET $2
                "#,
                &[&limit, &offset],
            )
            .await?;

        let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
        Ok((users, total))
    }
}
