use chrono::Duration;
use uuid::Uuid;

use crate::{
    clock::Clock,
    crypto::token,
    error::{AppError, Result},
    models::verification_code::{NewCode, VerificationCode},
    store::CodeStore,
};

/// Lifecycle of the rotating verification code.
///
/// There is one code for the whole site. Whoever asks for it gets the
/// current one; rotating it immediately invalidates the previous one.
#[derive(Clone)]
pub struct CodeService<S, C> {
    store: S,
    clock: C,
    ttl: Duration,
}

impl<S, C> CodeService<S, C>
where
    S: CodeStore + Clone + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, clock: C, ttl_minutes: i64) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Returns the active code, rotating in a fresh one if none is active or
    /// the active one has expired.
    pub async fn get_or_create_active(&self) -> Result<VerificationCode> {
        let now = self.clock.now();
        if let Some(code) = self.store.find_active().await? {
            if !code.is_expired(now) {
                return Ok(code);
            }
        }
        self.rotate().await
    }

    /// Rotates unconditionally, even if the active code is still fresh.
    pub async fn generate_new(&self) -> Result<VerificationCode> {
        self.rotate().await
    }

    async fn rotate(&self) -> Result<VerificationCode> {
        let now = self.clock.now();
        let code = self
            .store
            .create(NewCode {
                id: Uuid::new_v4(),
                token: token::generate_code_token(),
                expires_at: now + self.ttl,
                created_at: now,
            })
            .await?;
        tracing::info!("Rotated verification code: {}", code.id);

        // Sweep expired rows off the rotation path. Failures only warn, the
        // fresh code has already been returned.
        let store = self.store.clone();
        tokio::spawn(async move {
            match store.delete_expired(now).await {
                Ok(0) => {}
                Ok(deleted) => tracing::debug!("Deleted {} expired verification code(s)", deleted),
                Err(e) => tracing::warn!("Expired-code cleanup failed: {}", e),
            }
        });

        Ok(code)
    }

    /// Checks a presented token against the stored codes.
    ///
    /// Unknown tokens and known-but-stale ones fail differently so the
    /// caller can distinguish a typo from a code that rotated away.
    pub async fn validate(&self, presented: &str) -> Result<VerificationCode> {
        let code = self
            .store
            .find_by_token(presented)
            .await?
            .ok_or(AppError::InvalidCode)?;

        if !code.is_valid(self.clock.now()) {
            return Err(AppError::CodeExpiredOrInactive);
        }

        Ok(code)
    }

    /// Kill switch: deactivates the active code without issuing a new one.
    pub async fn deactivate_active(&self) -> Result<u64> {
        let touched = self.store.deactivate_all().await?;
        tracing::info!("Deactivated {} verification code(s)", touched);
        Ok(touched)
    }

    /// Deletes every code whose expiry has passed. Rotation already sweeps
    /// opportunistically; this is for the periodic background job.
    pub async fn sweep_expired(&self) -> Result<u64> {
        self.store.delete_expired(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{clock::testing::ManualClock, repositories::memory::MemCodeStore};

    fn service(store: MemCodeStore, clock: ManualClock) -> CodeService<MemCodeStore, ManualClock> {
        CodeService::new(store, clock, 10)
    }

    fn nine_am() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn get_or_create_reuses_fresh_code() {
        let svc = service(MemCodeStore::default(), ManualClock::at(nine_am()));

        let first = svc.get_or_create_active().await.unwrap();
        let second = svc.get_or_create_active().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.token, second.token);
    }

    #[tokio::test]
    async fn get_or_create_rotates_expired_code() {
        let clock = ManualClock::at(nine_am());
        let svc = service(MemCodeStore::default(), clock.clone());

        let first = svc.get_or_create_active().await.unwrap();
        clock.advance(Duration::minutes(10) + Duration::seconds(1));
        let second = svc.get_or_create_active().await.unwrap();

        assert_ne!(first.token, second.token);
        assert!(svc.validate(&first.token).await.is_err());
    }

    #[tokio::test]
    async fn at_most_one_active_code_across_rotations() {
        let store = MemCodeStore::default();
        let clock = ManualClock::at(nine_am());
        let svc = service(store.clone(), clock.clone());

        svc.get_or_create_active().await.unwrap();
        for _ in 0..5 {
            clock.advance(Duration::minutes(1));
            svc.generate_new().await.unwrap();
        }
        svc.get_or_create_active().await.unwrap();

        let active = store.all().await.iter().filter(|c| c.is_active).count();
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn rotation_invalidates_previous_code() {
        let clock = ManualClock::at(nine_am());
        let svc = service(MemCodeStore::default(), clock.clone());

        let old = svc.generate_new().await.unwrap();
        let new = svc.generate_new().await.unwrap();

        assert!(matches!(
            svc.validate(&old.token).await,
            Err(AppError::CodeExpiredOrInactive)
        ));
        assert!(svc.validate(&new.token).await.is_ok());
    }

    #[tokio::test]
    async fn validate_rejects_unknown_token() {
        let svc = service(MemCodeStore::default(), ManualClock::at(nine_am()));
        svc.generate_new().await.unwrap();

        assert!(matches!(
            svc.validate("no-such-token").await,
            Err(AppError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn validate_rejects_expired_active_code() {
        let clock = ManualClock::at(nine_am());
        let svc = service(MemCodeStore::default(), clock.clone());

        let code = svc.generate_new().await.unwrap();
        // Valid through the exact expiry instant, stale one second later.
        clock.set(code.expires_at);
        assert!(svc.validate(&code.token).await.is_ok());
        clock.advance(Duration::seconds(1));
        assert!(matches!(
            svc.validate(&code.token).await,
            Err(AppError::CodeExpiredOrInactive)
        ));
    }

    #[tokio::test]
    async fn deactivate_kills_active_code() {
        let clock = ManualClock::at(nine_am());
        let svc = service(MemCodeStore::default(), clock.clone());

        let code = svc.generate_new().await.unwrap();
        assert_eq!(svc.deactivate_active().await.unwrap(), 1);
        assert!(matches!(
            svc.validate(&code.token).await,
            Err(AppError::CodeExpiredOrInactive)
        ));
        assert_eq!(svc.deactivate_active().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rotation_sweeps_expired_rows() {
        let store = MemCodeStore::default();
        let clock = ManualClock::at(nine_am());
        let svc = service(store.clone(), clock.clone());

        svc.generate_new().await.unwrap();
        clock.advance(Duration::minutes(11));
        svc.generate_new().await.unwrap();

        // The sweep runs off the request path.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let rows = store.all().await;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_active);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let store = MemCodeStore::default();
        let clock = ManualClock::at(nine_am());
        let svc = service(store.clone(), clock.clone());

        svc.generate_new().await.unwrap();
        assert_eq!(svc.sweep_expired().await.unwrap(), 0);

        clock.advance(Duration::minutes(11));
        assert_eq!(svc.sweep_expired().await.unwrap(), 1);
        assert!(store.all().await.is_empty());
    }
}
