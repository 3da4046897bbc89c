use serde::{Deserialize, Serialize};

use crate::config::Config;

/// The query parameters shared by every paginated listing.
#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Resolves the raw query against the configured default and cap.
    ///
    /// Returns `(page, limit)` with `page >= 1` and `1 <= limit <= max`.
    /// Out-of-range values are clamped rather than rejected.
    pub fn resolve(&self, config: &Config) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        (page, limit)
    }
}

/// One page of results plus the total row count.
#[derive(Serialize, Debug)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveTime};
    use zeroize::Zeroizing;

    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/attendance".to_string(),
            bind_host: "127.0.0.1".to_string(),
            bind_port: 8080,
            jwt_secret: Zeroizing::new(vec![0u8; 32]),
            access_token_ttl_hours: 24,
            refresh_token_ttl_hours: 168,
            code_ttl_minutes: 10,
            late_boundary: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            attendance_offset: FixedOffset::east_opt(0).unwrap(),
            allowed_origins: Vec::new(),
            rate_limit_per_second: 20,
            rate_limit_burst: 100,
            default_page_size: 10,
            max_page_size: 100,
        }
    }

    #[test]
    fn empty_query_uses_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.resolve(&config()), (1, 10));
    }

    #[test]
    fn explicit_values_pass_through() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(query.resolve(&config()), (3, 25));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(0),
        };
        assert_eq!(query.resolve(&config()), (1, 1));

        let query = PageQuery {
            page: Some(-5),
            limit: Some(10_000),
        };
        assert_eq!(query.resolve(&config()), (1, 100));
    }
}
