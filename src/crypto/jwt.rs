use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::Role,
};

type HmacSha256 = Hmac<Sha256>;

/// The `iss` claim stamped into and required of every token.
pub const ISSUER: &str = "attendance-backend";

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a short-lived access token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    /// Fails with [`AppError::Forbidden`] unless the caller is an admin.
    pub fn ensure_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Claims carried by a refresh token. `jti` is the persisted row id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Signs `claims` into a compact HS256 JWT.
pub fn sign<T: Serialize>(secret: &[u8], claims: &T) -> Result<String> {
    let header = Header {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = sonic_rs::to_vec(&header)
        .map_err(|e| AppError::Internal(format!("Header serialization error: {}", e)))?;
    let claims_json = sonic_rs::to_vec(claims)
        .map_err(|e| AppError::Internal(format!("Claims serialization error: {}", e)))?;

    let signing_input = format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(header_json),
        general_purpose::URL_SAFE_NO_PAD.encode(claims_json),
    );

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        signing_input,
        general_purpose::URL_SAFE_NO_PAD.encode(signature),
    ))
}

/// Verifies the signature and shape of `token` and returns its claims.
///
/// Everything that can go wrong collapses into [`AppError::InvalidToken`];
/// callers never learn which check failed.
fn decode<T: DeserializeOwned>(secret: &[u8], token: &str) -> Result<T> {
    let mut segments = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(AppError::InvalidToken),
    };

    let header_json = general_purpose::URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| AppError::InvalidToken)?;
    let header: Header =
        sonic_rs::from_slice(&header_json).map_err(|_| AppError::InvalidToken)?;
    if header.alg != "HS256" || header.typ != "JWT" {
        return Err(AppError::InvalidToken);
    }

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    let expected = mac.finalize().into_bytes();

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::InvalidToken)?;
    if !bool::from(expected.as_slice().ct_eq(&signature)) {
        return Err(AppError::InvalidToken);
    }

    let claims_json = general_purpose::URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| AppError::InvalidToken)?;
    sonic_rs::from_slice(&claims_json).map_err(|_| AppError::InvalidToken)
}

/// Decodes an access token and enforces its expiry and issuer.
pub fn decode_access(secret: &[u8], token: &str, now: DateTime<Utc>) -> Result<AccessClaims> {
    let claims: AccessClaims = decode(secret, token)?;
    if claims.iss != ISSUER || claims.exp <= now.timestamp() {
        return Err(AppError::InvalidToken);
    }
    Ok(claims)
}

/// Decodes a refresh token and enforces its expiry and issuer.
pub fn decode_refresh(secret: &[u8], token: &str, now: DateTime<Utc>) -> Result<RefreshClaims> {
    let claims: RefreshClaims = decode(secret, token)?;
    if claims.iss != ISSUER || claims.exp <= now.timestamp() {
        return Err(AppError::InvalidToken);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn access_claims(now: DateTime<Utc>) -> AccessClaims {
        AccessClaims {
            sub: Uuid::new_v4(),
            email: "worker@example.com".to_string(),
            role: Role::Employee,
            iat: now.timestamp(),
            exp: (now + Duration::hours(24)).timestamp(),
            iss: ISSUER.to_string(),
        }
    }

    #[test]
    fn sign_then_decode_roundtrip() {
        let now = Utc::now();
        let claims = access_claims(now);
        let token = sign(SECRET, &claims).unwrap();

        let decoded = decode_access(SECRET, &token, now).unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.email, claims.email);
        assert_eq!(decoded.role, Role::Employee);
        assert_eq!(decoded.iss, ISSUER);
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = Utc::now();
        let token = sign(SECRET, &access_claims(now)).unwrap();

        let err = decode_access(b"another-secret-another-secret!!!", &token, now).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn rejects_tampered_payload() {
        let now = Utc::now();
        let token = sign(SECRET, &access_claims(now)).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = general_purpose::URL_SAFE_NO_PAD.encode(
            sonic_rs::to_vec(&access_claims(now)).unwrap(),
        );
        parts[1] = &forged_claims;
        let forged = parts.join(".");

        assert!(matches!(
            decode_access(SECRET, &forged, now),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let now = Utc::now();
        let claims = access_claims(now);
        let token = sign(SECRET, &claims).unwrap();

        // Valid one second before expiry, invalid at expiry.
        assert!(decode_access(SECRET, &token, now + Duration::hours(24) - Duration::seconds(1)).is_ok());
        assert!(decode_access(SECRET, &token, now + Duration::hours(24)).is_err());
    }

    #[test]
    fn rejects_foreign_issuer() {
        let now = Utc::now();
        let mut claims = access_claims(now);
        claims.iss = "someone-else".to_string();
        let token = sign(SECRET, &claims).unwrap();

        assert!(matches!(
            decode_access(SECRET, &token, now),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_malformed_tokens() {
        let now = Utc::now();
        assert!(decode_access(SECRET, "", now).is_err());
        assert!(decode_access(SECRET, "a.b", now).is_err());
        assert!(decode_access(SECRET, "a.b.c.d", now).is_err());
        assert!(decode_access(SECRET, "not base64!.n o.p e", now).is_err());
    }

    #[test]
    fn refresh_roundtrip_carries_jti() {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(168)).timestamp(),
            iss: ISSUER.to_string(),
        };
        let token = sign(SECRET, &claims).unwrap();

        let decoded = decode_refresh(SECRET, &token, now).unwrap();
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.sub, claims.sub);
    }

    #[test]
    fn access_token_does_not_decode_as_refresh() {
        // An access token has no jti, so the refresh decode must fail.
        let now = Utc::now();
        let token = sign(SECRET, &access_claims(now)).unwrap();
        assert!(decode_refresh(SECRET, &token, now).is_err());
    }

    #[test]
    fn ensure_admin_refuses_everyone_else() {
        let mut claims = access_claims(Utc::now());
        assert!(matches!(claims.ensure_admin(), Err(AppError::Forbidden)));

        claims.role = Role::Manager;
        assert!(matches!(claims.ensure_admin(), Err(AppError::Forbidden)));

        claims.role = Role::Admin;
        assert!(claims.ensure_admin().is_ok());
    }
}
