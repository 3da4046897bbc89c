use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A rotating attendance verification code.
///
/// At most one code is active at any time. Rotation deactivates the previous
/// code in the same statement that inserts the new one.
#[derive(Clone, Debug, Serialize)]
pub struct VerificationCode {
    /// The unique identifier for the code.
    pub id: Uuid,
    /// The opaque token embedded in the displayed code.
    pub token: String,
    /// The instant after which the code no longer validates.
    pub expires_at: DateTime<Utc>,
    /// Whether this is the currently displayed code.
    pub is_active: bool,
    /// The timestamp when the code was generated.
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    /// Whether the code's lifetime has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the code is still redeemable at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// Input for inserting a verification code row.
#[derive(Clone, Debug)]
pub struct NewCode {
    pub id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn code_expiring_at(expires_at: DateTime<Utc>) -> VerificationCode {
        VerificationCode {
            id: Uuid::new_v4(),
            token: "tok".to_string(),
            expires_at,
            is_active: true,
            created_at: expires_at - Duration::minutes(10),
        }
    }

    #[test]
    fn valid_until_expiry_passes() {
        let now = Utc::now();
        let code = code_expiring_at(now + Duration::minutes(10));

        assert!(code.is_valid(now));
        assert!(code.is_valid(now + Duration::minutes(10)));
        assert!(!code.is_valid(now + Duration::minutes(10) + Duration::seconds(1)));
    }

    #[test]
    fn inactive_code_is_never_valid() {
        let now = Utc::now();
        let mut code = code_expiring_at(now + Duration::minutes(10));
        code.is_active = false;

        assert!(!code.is_valid(now));
    }
}
