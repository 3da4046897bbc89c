//! In-memory stores for service tests. Conflict and conditional-write
//! semantics mirror the Postgres implementations.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        attendance::{Attendance, NewAttendance},
        department::{Department, NewDepartment},
        refresh_token::{NewRefreshToken, RefreshToken},
        user::{NewUser, User},
        verification_code::{NewCode, VerificationCode},
    },
    store::{AttendanceStore, CodeStore, CredentialStore, DepartmentStore, UserStore},
};

#[derive(Clone, Default)]
pub struct MemCodeStore {
    rows: Arc<Mutex<Vec<VerificationCode>>>,
}

impl MemCodeStore {
    /// Every stored row, for invariant assertions.
    pub async fn all(&self) -> Vec<VerificationCode> {
        self.rows.lock().await.clone()
    }
}

impl CodeStore for MemCodeStore {
    async fn create(&self, code: NewCode) -> Result<VerificationCode> {
        // One guard for deactivate plus insert, same atomicity as the
        // single-statement rotation in Postgres.
        let mut rows = self.rows.lock().await;
        for row in rows.iter_mut() {
            row.is_active = false;
        }
        let created = VerificationCode {
            id: code.id,
            token: code.token,
            expires_at: code.expires_at,
            is_active: true,
            created_at: code.created_at,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn find_active(&self) -> Result<Option<VerificationCode>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|c| c.is_active).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<VerificationCode>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|c| c.token == token).cloned())
    }

    async fn deactivate_all(&self) -> Result<u64> {
        let mut rows = self.rows.lock().await;
        let mut touched = 0;
        for row in rows.iter_mut().filter(|c| c.is_active) {
            row.is_active = false;
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|c| c.expires_at >= now);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Clone, Default)]
pub struct MemAttendanceStore {
    rows: Arc<Mutex<Vec<Attendance>>>,
}

impl AttendanceStore for MemAttendanceStore {
    async fn create(&self, record: NewAttendance) -> Result<Option<Attendance>> {
        let mut rows = self.rows.lock().await;
        let duplicate = rows
            .iter()
            .any(|r| r.user_id == record.user_id && r.period_date == record.period_date);
        if duplicate {
            return Ok(None);
        }
        let created = Attendance {
            id: record.id,
            user_id: record.user_id,
            period_date: record.period_date,
            check_in: record.check_in,
            check_out: None,
            status: record.status,
            location: record.location,
            notes: record.notes,
            code_token: record.code_token,
            created_at: record.check_in,
            deleted_at: None,
        };
        rows.push(created.clone());
        Ok(Some(created))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Attendance>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|r| r.id == id && r.deleted_at.is_none()).cloned())
    }

    async fn find_by_user_and_period(
        &self,
        user_id: Uuid,
        period: NaiveDate,
    ) -> Result<Option<Attendance>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|r| r.user_id == user_id && r.period_date == period && r.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Attendance>, i64)> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<Attendance> = rows
            .iter()
            .filter(|r| r.user_id == user_id && r.deleted_at.is_none())
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.check_in.cmp(&a.check_in));
        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_user_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<Attendance> = rows
            .iter()
            .filter(|r| {
                r.user_id == user_id
                    && r.period_date >= start
                    && r.period_date <= end
                    && r.deleted_at.is_none()
            })
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.period_date);
        Ok(matched)
    }

    async fn find_most_recent_for_user(&self, user_id: Uuid) -> Result<Option<Attendance>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|r| r.user_id == user_id && r.deleted_at.is_none())
            .max_by_key(|r| r.check_in)
            .cloned())
    }

    async fn set_check_out(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Attendance>> {
        let mut rows = self.rows.lock().await;
        match rows
            .iter_mut()
            .find(|r| r.id == id && r.check_out.is_none() && r.deleted_at.is_none())
        {
            Some(row) => {
                row.check_out = Some(at);
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemCredentialStore {
    rows: Arc<Mutex<Vec<RefreshToken>>>,
}

impl CredentialStore for MemCredentialStore {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshToken> {
        let mut rows = self.rows.lock().await;
        let created = RefreshToken {
            id: token.id,
            user_id: token.user_id,
            token: token.token,
            expires_at: token.expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn find_by_value(&self, token: &str) -> Result<Option<RefreshToken>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|t| t.token == token).cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|t| t.id == id && !t.revoked) {
            Some(row) => {
                row.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemUserStore {
    rows: Arc<Mutex<Vec<User>>>,
}

impl UserStore for MemUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut rows = self.rows.lock().await;
        let taken = rows
            .iter()
            .any(|u| u.email == user.email && u.deleted_at.is_none());
        if taken {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        let now = Utc::now();
        let created = User {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            department_id: user.department_id,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|u| u.id == id && u.deleted_at.is_none()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User> {
        let mut rows = self.rows.lock().await;
        match rows
            .iter_mut()
            .find(|u| u.id == user.id && u.deleted_at.is_none())
        {
            Some(row) => {
                row.password_hash = user.password_hash.clone();
                row.first_name = user.first_name.clone();
                row.last_name = user.last_name.clone();
                row.role = user.role;
                row.department_id = user.department_id;
                row.is_active = user.is_active;
                row.updated_at = Utc::now();
                Ok(row.clone())
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|u| u.id == id && u.deleted_at.is_none()) {
            Some(row) => {
                row.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64)> {
        let rows = self.rows.lock().await;
        let mut live: Vec<User> = rows
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect();
        live.sort_by_key(|u| u.created_at);
        let total = live.len() as i64;
        let page = live
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

#[derive(Clone, Default)]
pub struct MemDepartmentStore {
    rows: Arc<Mutex<Vec<Department>>>,
}

impl DepartmentStore for MemDepartmentStore {
    async fn create(&self, dept: NewDepartment) -> Result<Department> {
        let mut rows = self.rows.lock().await;
        let taken = rows
            .iter()
            .any(|d| d.name == dept.name && d.deleted_at.is_none());
        if taken {
            return Err(AppError::Conflict("Department name already taken".to_string()));
        }
        let now = Utc::now();
        let created = Department {
            id: dept.id,
            name: dept.name,
            description: dept.description,
            manager_id: dept.manager_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Department>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|d| d.id == id && d.deleted_at.is_none()).cloned())
    }

    async fn update(&self, dept: &Department) -> Result<Department> {
        let mut rows = self.rows.lock().await;
        let taken = rows
            .iter()
            .any(|d| d.name == dept.name && d.id != dept.id && d.deleted_at.is_none());
        if taken {
            return Err(AppError::Conflict("Department name already taken".to_string()));
        }
        match rows
            .iter_mut()
            .find(|d| d.id == dept.id && d.deleted_at.is_none())
        {
            Some(row) => {
                row.name = dept.name.clone();
                row.description = dept.description.clone();
                row.manager_id = dept.manager_id;
                row.updated_at = Utc::now();
                Ok(row.clone())
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|d| d.id == id && d.deleted_at.is_none()) {
            Some(row) => {
                row.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_all(&self) -> Result<Vec<Department>> {
        let rows = self.rows.lock().await;
        let mut live: Vec<Department> = rows
            .iter()
            .filter(|d| d.deleted_at.is_none())
            .cloned()
            .collect();
        live.sort_by_key(|d| d.created_at);
        Ok(live)
    }
}
