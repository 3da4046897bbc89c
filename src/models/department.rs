use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a department. Names are unique among live departments.
#[derive(Clone, Debug, Serialize)]
pub struct Department {
    /// The unique identifier for the department.
    pub id: Uuid,
    /// The department's name.
    pub name: String,
    /// A short description of the department.
    pub description: String,
    /// The user managing the department, if assigned.
    pub manager_id: Option<Uuid>,
    /// The timestamp when the department was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the department was last updated.
    pub updated_at: DateTime<Utc>,
    /// The timestamp when the department was soft-deleted, if it was.
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for inserting a department row.
#[derive(Clone, Debug)]
pub struct NewDepartment {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub manager_id: Option<Uuid>,
}
