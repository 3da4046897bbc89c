use std::env;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveTime};
use zeroize::{Zeroize, Zeroizing};

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The address the HTTP server binds to.
    pub bind_host: String,
    /// The port the HTTP server binds to.
    pub bind_port: u16,
    /// The HMAC key used to sign access and refresh tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// The lifetime of an access token in hours.
    pub access_token_ttl_hours: i64,
    /// The lifetime of a refresh token in hours.
    pub refresh_token_ttl_hours: i64,
    /// The lifetime of a verification code in minutes.
    pub code_ttl_minutes: i64,
    /// Local wall-clock time after which a check-in counts as late.
    pub late_boundary: NaiveTime,
    /// The fixed UTC offset in which attendance days and lateness are judged.
    pub attendance_offset: FixedOffset,
    /// Origins allowed by CORS. Empty means allow any origin.
    pub allowed_origins: Vec<String>,
    /// Sustained rate limit for the public auth endpoints, per second.
    pub rate_limit_per_second: u64,
    /// Burst budget for the public auth endpoints.
    pub rate_limit_burst: u32,
    /// Page size applied when a list request does not ask for one.
    pub default_page_size: i64,
    /// Upper bound for any requested page size.
    pub max_page_size: i64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let mut jwt_secret_hex = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (generate with: openssl rand -hex 32)")?;

        let jwt_secret_bytes = hex::decode(&jwt_secret_hex)
            .context("JWT_SECRET must be valid hexadecimal")?;

        jwt_secret_hex.zeroize();

        if jwt_secret_bytes.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 bytes (64 hex characters)");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            bind_host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            bind_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,
            jwt_secret: Zeroizing::new(jwt_secret_bytes),
            access_token_ttl_hours: env::var("ACCESS_TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_TTL_HOURS")?,
            refresh_token_ttl_hours: env::var("REFRESH_TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "168".to_string())
                .parse()
                .context("Invalid REFRESH_TOKEN_TTL_HOURS")?,
            code_ttl_minutes: env::var("CODE_TTL_MINUTES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid CODE_TTL_MINUTES")?,
            late_boundary: NaiveTime::parse_from_str(
                &env::var("LATE_BOUNDARY").unwrap_or_else(|_| "09:15".to_string()),
                "%H:%M",
            )
            .context("Invalid LATE_BOUNDARY, expected HH:MM")?,
            attendance_offset: parse_utc_offset(
                &env::var("ATTENDANCE_UTC_OFFSET").unwrap_or_else(|_| "+00:00".to_string()),
            )
            .context("Invalid ATTENDANCE_UTC_OFFSET, expected +HH:MM or -HH:MM")?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_per_second: env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_PER_SECOND")?,
            rate_limit_burst: env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_BURST")?,
            default_page_size: env::var("DEFAULT_PAGE_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DEFAULT_PAGE_SIZE")?,
            max_page_size: env::var("MAX_PAGE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Invalid MAX_PAGE_SIZE")?,
        })
    }
}

/// Parses a `+HH:MM` / `-HH:MM` offset string into a [`FixedOffset`].
fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1i32, &raw[1..]),
        Some(b'-') => (-1i32, &raw[1..]),
        _ => anyhow::bail!("offset must start with + or -"),
    };

    let (hours, minutes) = rest
        .split_once(':')
        .context("offset must be formatted as +HH:MM")?;
    let hours: i32 = hours.parse().context("offset hours must be a number")?;
    let minutes: i32 = minutes.parse().context("offset minutes must be a number")?;

    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        anyhow::bail!("offset out of range");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .context("offset out of range")
}
