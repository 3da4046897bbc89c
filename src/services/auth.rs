use chrono::Duration;
use serde::Serialize;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::{
    clock::Clock,
    crypto::{jwt, password},
    error::{AppError, Result},
    models::{refresh_token::NewRefreshToken, user::User},
    store::{CredentialStore, UserStore},
};

/// The response to a successful login or refresh.
#[derive(Clone, Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login, token refresh and logout.
///
/// Access tokens are stateless JWTs. Refresh tokens are JWTs too, but each
/// one is persisted under its `jti` and is single-use: rotation revokes the
/// presented token in the same breath that mints its successor.
#[derive(Clone)]
pub struct AuthService<U, R, C> {
    users: U,
    tokens: R,
    clock: C,
    secret: Zeroizing<Vec<u8>>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl<U, R, C> AuthService<U, R, C>
where
    U: UserStore + Clone + Send + Sync + 'static,
    R: CredentialStore + Clone + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    pub fn new(
        users: U,
        tokens: R,
        clock: C,
        secret: Zeroizing<Vec<u8>>,
        access_ttl_hours: i64,
        refresh_ttl_hours: i64,
    ) -> Self {
        Self {
            users,
            tokens,
            clock,
            secret,
            access_ttl: Duration::hours(access_ttl_hours),
            refresh_ttl: Duration::hours(refresh_ttl_hours),
        }
    }

    /// Exchanges credentials for a token pair.
    ///
    /// Unknown email and wrong password produce the same error; an inactive
    /// account is only reported once the password checked out.
    pub async fn login(&self, email: &str, pass: &str) -> Result<TokenPair> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !password::verify_password(pass, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }

        tracing::info!("User logged in: {}", user.id);
        self.issue_pair(&user).await
    }

    /// Trades a refresh token for a fresh pair, revoking the old one.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair> {
        let now = self.clock.now();
        jwt::decode_refresh(&self.secret, presented, now)?;

        let stored = self
            .tokens
            .find_by_value(presented)
            .await?
            .ok_or(AppError::RefreshTokenNotFound)?;

        if stored.revoked {
            return Err(AppError::RefreshTokenRevoked);
        }

        // Compare-and-set. If two refreshes race, exactly one gets the new
        // pair and the other lands here with `false`.
        if !self.tokens.revoke(stored.id).await? {
            return Err(AppError::RefreshTokenRevoked);
        }

        let user = self
            .users
            .find_by_id(stored.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }

        tracing::debug!("Refresh token rotated for user: {}", user.id);
        self.issue_pair(&user).await
    }

    /// Revokes the presented refresh token. Unknown or already-revoked
    /// tokens are fine; only storage failures surface.
    pub async fn logout(&self, presented: &str) -> Result<()> {
        if let Some(stored) = self.tokens.find_by_value(presented).await? {
            self.tokens.revoke(stored.id).await?;
            tracing::info!("User logged out: {}", stored.user_id);
        }
        Ok(())
    }

    /// Verifies an access token without touching storage.
    pub fn validate_access_token(&self, token: &str) -> Result<jwt::AccessClaims> {
        jwt::decode_access(&self.secret, token, self.clock.now())
    }

    async fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        let now = self.clock.now();

        let access_token = jwt::sign(
            &self.secret,
            &jwt::AccessClaims {
                sub: user.id,
                email: user.email.clone(),
                role: user.role,
                iat: now.timestamp(),
                exp: (now + self.access_ttl).timestamp(),
                iss: jwt::ISSUER.to_string(),
            },
        )?;

        // The jti doubles as the persisted row id.
        let jti = Uuid::new_v4();
        let expires_at = now + self.refresh_ttl;
        let refresh_token = jwt::sign(
            &self.secret,
            &jwt::RefreshClaims {
                sub: user.id,
                jti,
                iat: now.timestamp(),
                exp: expires_at.timestamp(),
                iss: jwt::ISSUER.to_string(),
            },
        )?;

        self.tokens
            .create(NewRefreshToken {
                id: jti,
                user_id: user.id,
                token: refresh_token.clone(),
                expires_at,
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
