use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        attendance::{Attendance, NewAttendance},
        department::{Department, NewDepartment},
        refresh_token::{NewRefreshToken, RefreshToken},
        user::{NewUser, User},
        verification_code::{NewCode, VerificationCode},
    },
};

/// Persistence for verification codes.
///
/// Implementations must make [`CodeStore::create`] atomic with respect to the
/// single-active invariant: the previous active code is deactivated and the
/// new one inserted as one unit, never leaving two active rows visible.
pub trait CodeStore: Send + Sync {
    /// Rotates in a new code: deactivates every active row, inserts `code` as
    /// the active one, and returns it.
    fn create(&self, code: NewCode) -> impl Future<Output = Result<VerificationCode>> + Send + '_;

    /// Returns the active code, if one exists.
    fn find_active(&self) -> impl Future<Output = Result<Option<VerificationCode>>> + Send + '_;

    /// Looks a code up by its opaque token, active or not.
    fn find_by_token<'a>(
        &'a self,
        token: &'a str,
    ) -> impl Future<Output = Result<Option<VerificationCode>>> + Send + 'a;

    /// Deactivates every active code. Returns how many rows were touched.
    fn deactivate_all(&self) -> impl Future<Output = Result<u64>> + Send + '_;

    /// Deletes codes whose expiry is strictly before `now`. Returns how many
    /// rows were deleted.
    fn delete_expired(&self, now: DateTime<Utc>) -> impl Future<Output = Result<u64>> + Send + '_;
}

/// Persistence for attendance records.
pub trait AttendanceStore: Send + Sync {
    /// Inserts `record` unless one already exists for the same user and
    /// period. Returns `None` when the insert lost to an existing record.
    fn create(
        &self,
        record: NewAttendance,
    ) -> impl Future<Output = Result<Option<Attendance>>> + Send + '_;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<Attendance>>> + Send + '_;

    fn find_by_user_and_period(
        &self,
        user_id: Uuid,
        period: NaiveDate,
    ) -> impl Future<Output = Result<Option<Attendance>>> + Send + '_;

    /// A page of the user's records, most recent check-in first, plus the
    /// total number of records.
    fn find_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<(Vec<Attendance>, i64)>> + Send + '_;

    /// The user's records whose period falls inside `[start, end]`, oldest
    /// first.
    fn find_by_user_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Attendance>>> + Send + '_;

    /// The user's newest record by check-in instant, if any.
    fn find_most_recent_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<Attendance>>> + Send + '_;

    /// Sets `check_out` if the record exists and is still open. Returns
    /// `None` when the record is missing or already closed.
    fn set_check_out(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Attendance>>> + Send + '_;
}

/// Persistence for refresh tokens.
pub trait CredentialStore: Send + Sync {
    fn create(
        &self,
        token: NewRefreshToken,
    ) -> impl Future<Output = Result<RefreshToken>> + Send + '_;

    fn find_by_value<'a>(
        &'a self,
        token: &'a str,
    ) -> impl Future<Output = Result<Option<RefreshToken>>> + Send + 'a;

    /// Flips `revoked` from false to true. Returns whether this call was the
    /// one that flipped it, so rotation can detect replays.
    fn revoke(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send + '_;
}

/// Persistence for user accounts.
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with a conflict when the email is already taken
    /// by a live account.
    fn create(&self, user: NewUser) -> impl Future<Output = Result<User>> + Send + '_;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<User>>> + Send + '_;

    /// Looks a live account up by email. Inactive accounts are still found,
    /// only soft-deleted ones are not.
    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> impl Future<Output = Result<Option<User>>> + Send + 'a;

    /// Writes the user's mutable fields back. Returns the stored row.
    fn update<'a>(&'a self, user: &'a User) -> impl Future<Output = Result<User>> + Send + 'a;

    /// Soft-deletes the user. Returns whether a live row was deleted.
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send + '_;

    /// A page of live users, oldest first, plus the total count.
    fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<(Vec<User>, i64)>> + Send + '_;
}

/// Persistence for departments.
pub trait DepartmentStore: Send + Sync {
    /// Inserts a department. Fails with a conflict when the name is already
    /// taken by a live department.
    fn create(&self, dept: NewDepartment) -> impl Future<Output = Result<Department>> + Send + '_;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<Department>>> + Send + '_;

    /// Writes the department's mutable fields back. Returns the stored row.
    fn update<'a>(
        &'a self,
        dept: &'a Department,
    ) -> impl Future<Output = Result<Department>> + Send + 'a;

    /// Soft-deletes the department. Returns whether a live row was deleted.
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send + '_;

    /// Every live department, oldest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Department>>> + Send + '_;
}
