use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A persisted refresh token.
///
/// The row id doubles as the token's `jti` claim. `revoked` flips exactly
/// once, either on rotation or on logout.
#[derive(Clone, Debug)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a refresh token row.
#[derive(Clone, Debug)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
