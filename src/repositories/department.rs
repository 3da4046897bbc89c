use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    db,
    error::{AppError, Result},
    models::department::{Department, NewDepartment},
    store::DepartmentStore,
};

/// A helper function to map a `tokio_postgres::Row` to a `Department`.
fn row_to_department(row: &Row) -> Result<Department> {
    Ok(Department {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        description: row.try_get("description").map_err(|_| AppError::MissingData("description".to_string()))?,
        manager_id: row.try_get("manager_id").map_err(|_| AppError::MissingData("manager_id".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
        deleted_at: row.try_get("deleted_at").map_err(|_| AppError::MissingData("deleted_at".to_string()))?,
    })
}

/// Postgres-backed [`DepartmentStore`].
#[derive(Clone)]
pub struct PgDepartmentStore {
    pool: Pool,
}

impl PgDepartmentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl DepartmentStore for PgDepartmentStore {
    async fn create(&self, dept: NewDepartment) -> Result<Department> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO departments (id, name, description, manager_id)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
                &[&dept.id, &dept.name, &dept.description, &dept.manager_id],
            )
            .await
            .map_err(|e| match e {
                ref e if db::is_unique_violation(e) => {
                    AppError::Conflict("Department name already taken".to_string())
                }
                ref e if db::is_foreign_key_violation(e) => {
                    AppError::Validation("Unknown manager".to_string())
                }
                e => e.into(),
            })?;
        row_to_department(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Department>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM departments
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_department(&r)).transpose()
    }

    async fn update(&self, dept: &Department) -> Result<Department> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                UPDATE departments
                SET
                    name = $2,
                    description = $3,
                    manager_id = $4,
                    updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                RETURNING *
                "#,
                &[&dept.id, &dept.name, &dept.description, &dept.manager_id],
            )
            .await
            .map_err(|e| match e {
                ref e if db::is_unique_violation(e) => {
                    AppError::Conflict("Department name already taken".to_string())
                }
                ref e if db::is_foreign_key_violation(e) => {
                    AppError::Validation("Unknown manager".to_string())
                }
                e => e.into(),
            })?
            .ok_or(AppError::NotFound)?;
        row_to_department(&row)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let touched = client
            .execute(
                r#"
                UPDATE departments
                SET deleted_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                &[&id],
            )
            .await?;
        Ok(touched > 0)
    }

    async fn list_all(&self) -> Result<Vec<Department>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT *
                FROM departments
                WHERE deleted_at IS NULL
                ORDER BY created_at ASC
                "#,
                &[],
            )
            .await?;
        rows.iter().map(row_to_department).collect()
    }
}
