use chrono::{DateTime, NaiveDate, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification applied at check-in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "attendance_status")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[postgres(name = "present")]
    Present,
    #[postgres(name = "late")]
    Late,
    #[postgres(name = "absent")]
    Absent,
    #[postgres(name = "on_leave")]
    OnLeave,
}

/// One attendance record, at most one per user and period.
///
/// Records are append-only: the only mutation after insert is setting
/// `check_out` once.
#[derive(Clone, Debug, Serialize)]
pub struct Attendance {
    /// The unique identifier for the record.
    pub id: Uuid,
    /// The user the record belongs to.
    pub user_id: Uuid,
    /// The calendar day, in the configured attendance offset, this record covers.
    pub period_date: NaiveDate,
    /// The instant the user checked in.
    pub check_in: DateTime<Utc>,
    /// The instant the user checked out, once they have.
    pub check_out: Option<DateTime<Utc>>,
    /// Present or late, judged against the configured boundary.
    pub status: AttendanceStatus,
    /// Free-form location supplied at check-in.
    pub location: String,
    /// Free-form notes supplied at check-in or by staff.
    pub notes: String,
    /// The verification-code token this record was redeemed with, if any.
    pub code_token: String,
    /// The timestamp when the record was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the record was soft-deleted, if it was.
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for inserting an attendance row.
#[derive(Clone, Debug)]
pub struct NewAttendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub period_date: NaiveDate,
    pub check_in: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub location: String,
    pub notes: String,
    pub code_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Present).unwrap(),
            "\"present\""
        );
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::OnLeave).unwrap(),
            "\"on_leave\""
        );
    }
}
