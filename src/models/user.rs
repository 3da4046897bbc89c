use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's role, from most to least privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[postgres(name = "admin")]
    Admin,
    #[postgres(name = "manager")]
    Manager,
    #[postgres(name = "employee")]
    Employee,
}

impl Role {
    /// Whether this role may operate verification codes and other users'
    /// attendance records.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

/// Represents an employee account.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's email address. Unique among live accounts.
    pub email: String,
    /// The user's hashed password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// The user's first name.
    pub first_name: String,
    /// The user's last name.
    pub last_name: String,
    /// The user's role.
    pub role: Role,
    /// The department the user belongs to, if any.
    pub department_id: Option<Uuid>,
    /// Whether the user may log in.
    pub is_active: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
    /// The timestamp when the user was soft-deleted, if it was.
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for inserting a user row. Timestamps are set by the store.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_covers_admin_and_manager() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Manager.is_staff());
        assert!(!Role::Employee.is_staff());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::Employee).unwrap(), "\"employee\"");
    }

    #[test]
    fn password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            password_hash: "secret-hash".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            role: Role::Employee,
            department_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
