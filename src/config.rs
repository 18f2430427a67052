use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Monthly leave accrual and the ceiling each counter may reach.
#[derive(Clone, Debug, PartialEq)]
pub struct AccrualPolicy {
    pub casual_per_month: f64,
    pub sick_per_month: f64,
    pub earned_per_month: f64,
    pub casual_cap: f64,
    pub sick_cap: f64,
    pub earned_cap: f64,
}

impl Default for AccrualPolicy {
    fn default() -> Self {
        Self {
            casual_per_month: 1.0,
            sick_per_month: 1.0,
            earned_per_month: 1.5,
            casual_cap: 12.0,
            sick_cap: 12.0,
            earned_cap: 45.0,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: String,

    // Attendance
    pub full_day_hours: f64,

    pub accrual: AccrualPolicy,

    // Exit workflow
    pub notice_period_days: i64,
    pub clearance_departments: Vec<String>,
}

/// Reads `key`, falling back to `default` when unset.
fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = AccrualPolicy::default();
        let accrual = AccrualPolicy {
            casual_per_month: var_or("ACCRUAL_CASUAL", defaults.casual_per_month)?,
            sick_per_month: var_or("ACCRUAL_SICK", defaults.sick_per_month)?,
            earned_per_month: var_or("ACCRUAL_EARNED", defaults.earned_per_month)?,
            casual_cap: var_or("CAP_CASUAL", defaults.casual_cap)?,
            sick_cap: var_or("CAP_SICK", defaults.sick_cap)?,
            earned_cap: var_or("CAP_EARNED", defaults.earned_cap)?,
        };

        let clearance_departments = parse_list(
            &env::var("CLEARANCE_DEPARTMENTS").unwrap_or_else(|_| "IT,Finance,HR,Admin".into()),
        );

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),

            full_day_hours: var_or("FULL_DAY_HOURS", 8.0)?,

            accrual,

            notice_period_days: var_or("NOTICE_PERIOD_DAYS", 30)?,
            clearance_departments,
        })
    }

    /// Configuration used by unit tests; never touches the environment.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/hr_portal_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            log_level: "debug".into(),
            full_day_hours: 8.0,
            accrual: AccrualPolicy::default(),
            notice_period_days: 30,
            clearance_departments: parse_list("IT,Finance,HR,Admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clearance_list_skipping_blanks() {
        assert_eq!(parse_list(" IT, ,Finance ,"), vec!["IT", "Finance"]);
    }

    #[test]
    fn default_accrual_matches_policy() {
        let policy = AccrualPolicy::default();
        assert_eq!(policy.earned_per_month, 1.5);
        assert_eq!(policy.casual_cap, 12.0);
    }
}
