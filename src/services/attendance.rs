use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{AppError, Result},
    models::attendance::{Attendance, AttendanceStatus, NewAttendance},
    services::codes::CodeService,
    store::{AttendanceStore, CodeStore},
};

/// Location stamped onto records created by staff instead of a code scan.
const MANUAL_ENTRY_LOCATION: &str = "Manual Entry";

/// Check-in, check-out and attendance reads.
///
/// A period is a calendar day in the configured fixed offset; one record per
/// user per period, enforced by the store's conditional insert.
#[derive(Clone)]
pub struct AttendanceService<A, S, C> {
    store: A,
    codes: CodeService<S, C>,
    clock: C,
    offset: FixedOffset,
    late_boundary: NaiveTime,
}

impl<A, S, C> AttendanceService<A, S, C>
where
    A: AttendanceStore + Clone + Send + Sync + 'static,
    S: CodeStore + Clone + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    pub fn new(
        store: A,
        codes: CodeService<S, C>,
        clock: C,
        offset: FixedOffset,
        late_boundary: NaiveTime,
    ) -> Self {
        Self {
            store,
            codes,
            clock,
            offset,
            late_boundary,
        }
    }

    /// The calendar day `at` falls on, in the attendance offset.
    fn period_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Present up to and including the boundary, late strictly after it.
    fn classify(&self, at: DateTime<Utc>) -> AttendanceStatus {
        if at.with_timezone(&self.offset).time() > self.late_boundary {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }

    /// Redeems a verification code as a check-in for `user_id`.
    pub async fn check_in(
        &self,
        user_id: Uuid,
        code_token: &str,
        location: String,
        notes: String,
    ) -> Result<Attendance> {
        let code = self.codes.validate(code_token).await?;

        let now = self.clock.now();
        let record = self
            .store
            .create(NewAttendance {
                id: Uuid::new_v4(),
                user_id,
                period_date: self.period_of(now),
                check_in: now,
                status: self.classify(now),
                location,
                notes,
                code_token: code.token,
            })
            .await?
            .ok_or(AppError::AlreadyCheckedIn)?;

        tracing::info!(
            "Check-in recorded: user={} period={} status={:?}",
            record.user_id,
            record.period_date,
            record.status
        );
        Ok(record)
    }

    /// Closes today's record by stamping the check-out instant. The record
    /// is otherwise untouched.
    pub async fn check_out(&self, user_id: Uuid) -> Result<Attendance> {
        let now = self.clock.now();
        let open = self
            .store
            .find_by_user_and_period(user_id, self.period_of(now))
            .await?
            .ok_or(AppError::NotFound)?;

        if open.check_out.is_some() {
            return Err(AppError::AlreadyCheckedOut);
        }

        let closed = self
            .store
            .set_check_out(open.id, now)
            .await?
            .ok_or(AppError::AlreadyCheckedOut)?;

        tracing::info!(
            "Check-out recorded: user={} period={}",
            closed.user_id,
            closed.period_date
        );
        Ok(closed)
    }

    /// Staff-entered record, no code involved. Still one per period. Lateness
    /// can only be judged for the current period; other days are `Present`.
    pub async fn manual_mark(
        &self,
        user_id: Uuid,
        period_date: NaiveDate,
        notes: String,
    ) -> Result<Attendance> {
        let now = self.clock.now();
        let status = if period_date == self.period_of(now) {
            self.classify(now)
        } else {
            AttendanceStatus::Present
        };

        let record = self
            .store
            .create(NewAttendance {
                id: Uuid::new_v4(),
                user_id,
                period_date,
                check_in: now,
                status,
                location: MANUAL_ENTRY_LOCATION.to_string(),
                notes,
                code_token: String::new(),
            })
            .await?
            .ok_or(AppError::AlreadyCheckedIn)?;

        tracing::info!(
            "Manual attendance recorded: user={} period={}",
            record.user_id,
            record.period_date
        );
        Ok(record)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Attendance> {
        self.store.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Today's record for `user_id`: the newest record, provided it is
    /// dated today.
    pub async fn get_today(&self, user_id: Uuid) -> Result<Attendance> {
        let today = self.period_of(self.clock.now());
        let recent = self
            .store
            .find_most_recent_for_user(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if recent.period_date != today {
            return Err(AppError::NotFound);
        }
        Ok(recent)
    }

    /// A page of the user's history, newest first.
    pub async fn get_user_attendance(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Attendance>, i64)> {
        let page = page.max(1);
        let limit = limit.max(1);
        self.store
            .find_by_user(user_id, limit, (page - 1) * limit)
            .await
    }

    /// The user's records between two periods, inclusive on both ends.
    pub async fn get_by_date_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
        self.store.find_by_user_in_range(user_id, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        clock::testing::ManualClock,
        repositories::memory::{MemAttendanceStore, MemCodeStore},
        services::codes::CodeService,
    };

    type TestService = AttendanceService<MemAttendanceStore, MemCodeStore, ManualClock>;

    /// Lima-style fixed offset, five hours behind UTC.
    fn minus_five() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn boundary() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 15, 0).unwrap()
    }

    /// 2026-03-02 09:00:00 local (-05:00), i.e. 14:00 UTC.
    fn monday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap()
    }

    fn fixture() -> (TestService, MemAttendanceStore, ManualClock) {
        let clock = ManualClock::at(monday_morning());
        let store = MemAttendanceStore::default();
        let codes = CodeService::new(MemCodeStore::default(), clock.clone(), 10);
        let svc = AttendanceService::new(
            store.clone(),
            codes,
            clock.clone(),
            minus_five(),
            boundary(),
        );
        (svc, store, clock)
    }

    async fn active_token(svc: &TestService) -> String {
        svc.codes.get_or_create_active().await.unwrap().token
    }

    #[tokio::test]
    async fn check_in_before_boundary_is_present() {
        let (svc, _, clock) = fixture();

        // 09:14:59 local.
        clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 14, 14, 59).unwrap());
        let token = active_token(&svc).await;
        let record = svc
            .check_in(Uuid::new_v4(), &token, String::new(), String::new())
            .await
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.period_date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[tokio::test]
    async fn check_in_at_boundary_is_present() {
        let (svc, _, clock) = fixture();

        // Exactly 09:15:00 local is still on time.
        clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 14, 15, 0).unwrap());
        let token = active_token(&svc).await;
        let record = svc
            .check_in(Uuid::new_v4(), &token, String::new(), String::new())
            .await
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn check_in_after_boundary_is_late() {
        let (svc, _, clock) = fixture();

        // 09:15:01 local.
        clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 14, 15, 1).unwrap());
        let token = active_token(&svc).await;
        let record = svc
            .check_in(Uuid::new_v4(), &token, String::new(), String::new())
            .await
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Late);
    }

    #[tokio::test]
    async fn period_follows_local_day_not_utc() {
        let (svc, _, clock) = fixture();

        // 03:00 UTC on the 3rd is still 22:00 on the 2nd in -05:00.
        clock.set(Utc.with_ymd_and_hms(2026, 3, 3, 3, 0, 0).unwrap());
        let token = active_token(&svc).await;
        let record = svc
            .check_in(Uuid::new_v4(), &token, String::new(), String::new())
            .await
            .unwrap();

        assert_eq!(record.period_date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(record.status, AttendanceStatus::Late);
    }

    #[tokio::test]
    async fn second_check_in_same_period_conflicts() {
        let (svc, _, clock) = fixture();
        let token = active_token(&svc).await;
        let user = Uuid::new_v4();

        svc.check_in(user, &token, String::new(), String::new())
            .await
            .unwrap();
        clock.advance(Duration::minutes(5));
        let token = active_token(&svc).await;

        assert!(matches!(
            svc.check_in(user, &token, String::new(), String::new()).await,
            Err(AppError::AlreadyCheckedIn)
        ));
    }

    #[tokio::test]
    async fn check_in_next_period_succeeds() {
        let (svc, _, clock) = fixture();
        let user = Uuid::new_v4();

        let token = active_token(&svc).await;
        svc.check_in(user, &token, String::new(), String::new())
            .await
            .unwrap();

        clock.advance(Duration::days(1));
        let token = active_token(&svc).await;
        let record = svc
            .check_in(user, &token, String::new(), String::new())
            .await
            .unwrap();

        assert_eq!(record.period_date, NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
    }

    #[tokio::test]
    async fn check_in_rejects_stale_and_unknown_codes() {
        let (svc, _, clock) = fixture();
        let user = Uuid::new_v4();

        let token = active_token(&svc).await;
        clock.advance(Duration::minutes(11));
        assert!(matches!(
            svc.check_in(user, &token, String::new(), String::new()).await,
            Err(AppError::CodeExpiredOrInactive)
        ));
        assert!(matches!(
            svc.check_in(user, "bogus", String::new(), String::new()).await,
            Err(AppError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn code_lifecycle_end_to_end() {
        let (svc, _, clock) = fixture();
        let user = Uuid::new_v4();

        let token = active_token(&svc).await;
        clock.advance(Duration::minutes(2));

        let record = svc
            .check_in(user, &token, "office".to_string(), String::new())
            .await
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);

        assert!(matches!(
            svc.check_in(user, &token, String::new(), String::new()).await,
            Err(AppError::AlreadyCheckedIn)
        ));

        clock.advance(Duration::minutes(9));
        assert!(matches!(
            svc.codes.validate(&token).await,
            Err(AppError::CodeExpiredOrInactive)
        ));
    }

    #[tokio::test]
    async fn check_out_stamps_once() {
        let (svc, _, clock) = fixture();
        let user = Uuid::new_v4();
        let token = active_token(&svc).await;

        let open = svc
            .check_in(user, &token, String::new(), "first note".to_string())
            .await
            .unwrap();
        assert!(open.check_out.is_none());

        clock.advance(Duration::hours(8));
        let closed = svc.check_out(user).await.unwrap();
        assert_eq!(closed.check_out, Some(clock.now()));
        assert_eq!(closed.notes, "first note");

        assert!(matches!(
            svc.check_out(user).await,
            Err(AppError::AlreadyCheckedOut)
        ));
    }

    #[tokio::test]
    async fn check_out_without_check_in_is_not_found() {
        let (svc, _, _) = fixture();
        assert!(matches!(
            svc.check_out(Uuid::new_v4()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn get_today_only_sees_current_period() {
        let (svc, _, clock) = fixture();
        let user = Uuid::new_v4();
        let token = active_token(&svc).await;

        assert!(matches!(svc.get_today(user).await, Err(AppError::NotFound)));

        svc.check_in(user, &token, String::new(), String::new())
            .await
            .unwrap();
        assert!(svc.get_today(user).await.is_ok());

        clock.advance(Duration::days(1));
        assert!(matches!(svc.get_today(user).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn manual_mark_enforces_uniqueness() {
        let (svc, _, _) = fixture();
        let user = Uuid::new_v4();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let record = svc
            .manual_mark(user, yesterday, "forgot badge".to_string())
            .await
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.location, MANUAL_ENTRY_LOCATION);
        assert_eq!(record.code_token, "");

        assert!(matches!(
            svc.manual_mark(user, yesterday, String::new()).await,
            Err(AppError::AlreadyCheckedIn)
        ));
    }

    #[tokio::test]
    async fn manual_mark_today_is_classified() {
        let (svc, _, clock) = fixture();

        // 10:00 local, past the boundary.
        clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap());
        let record = svc
            .manual_mark(
                Uuid::new_v4(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                String::new(),
            )
            .await
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Late);
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let (svc, _, clock) = fixture();
        let user = Uuid::new_v4();

        for day in 1..=5 {
            svc.manual_mark(user, NaiveDate::from_ymd_opt(2026, 3, day).unwrap(), String::new())
                .await
                .unwrap();
            clock.advance(Duration::seconds(1));
        }

        let (first_page, total) = svc.get_user_attendance(user, 1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(first_page.len(), 2);
        assert!(first_page[0].check_in > first_page[1].check_in);

        let (last_page, _) = svc.get_user_attendance(user, 3, 2).await.unwrap();
        assert_eq!(last_page.len(), 1);

        // Out-of-range pages come back empty, not as errors.
        let (beyond, _) = svc.get_user_attendance(user, 9, 2).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn date_range_is_inclusive_and_ordered() {
        let (svc, _, _) = fixture();
        let user = Uuid::new_v4();

        for day in 1..=4 {
            svc.manual_mark(user, NaiveDate::from_ymd_opt(2026, 3, day).unwrap(), String::new())
                .await
                .unwrap();
        }

        let records = svc
            .get_by_date_range(
                user,
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].period_date < records[1].period_date);

        assert!(matches!(
            svc.get_by_date_range(
                user,
                NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            )
            .await,
            Err(AppError::Validation(_))
        ));
    }
}
