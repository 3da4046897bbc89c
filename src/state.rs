use deadpool_postgres::Pool;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::Result;
use crate::repositories::{
    attendance::PgAttendanceStore, code::PgCodeStore, department::PgDepartmentStore,
    refresh_token::PgCredentialStore, user::PgUserStore,
};
use crate::services::{
    attendance::AttendanceService, auth::AuthService, codes::CodeService,
    departments::DepartmentService, users::UserService,
};

/// The concrete service types wired to Postgres and the system clock.
pub type Codes = CodeService<PgCodeStore, SystemClock>;
pub type Attendance = AttendanceService<PgAttendanceStore, PgCodeStore, SystemClock>;
pub type Auth = AuthService<PgUserStore, PgCredentialStore, SystemClock>;
pub type Users = UserService<PgUserStore>;
pub type Departments = DepartmentService<PgDepartmentStore>;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The application's configuration.
    pub config: Config,
    /// Verification-code lifecycle.
    pub codes: Codes,
    /// Check-in, check-out and attendance reads.
    pub attendance: Attendance,
    /// Login, refresh and logout.
    pub auth: Auth,
    /// Account management.
    pub users: Users,
    /// Department CRUD.
    pub departments: Departments,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("PostgreSQL pool initialized with deadpool-postgres");

        let clock = SystemClock;

        let codes = CodeService::new(
            PgCodeStore::new(db.clone()),
            clock,
            config.code_ttl_minutes,
        );

        let attendance = AttendanceService::new(
            PgAttendanceStore::new(db.clone()),
            codes.clone(),
            clock,
            config.attendance_offset,
            config.late_boundary,
        );

        let auth = AuthService::new(
            PgUserStore::new(db.clone()),
            PgCredentialStore::new(db.clone()),
            clock,
            config.jwt_secret.clone(),
            config.access_token_ttl_hours,
            config.refresh_token_ttl_hours,
        );

        let users = UserService::new(PgUserStore::new(db.clone()));
        let departments = DepartmentService::new(PgDepartmentStore::new(db.clone()));

        Ok(AppState {
            db,
            config: config.clone(),
            codes,
            attendance,
            auth,
            users,
            departments,
        })
    }
}
