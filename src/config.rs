use actix_web::{web, HttpRequest};
use anyhow::{bail, Context};
use chrono::Duration;
use std::str::FromStr;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_JWT_TTL_SECS: i64 = 3600;
const DEFAULT_REMINDER_LEAD_HOURS: i64 = 24;
const MAX_JWT_TTL_SECS: i64 = 366 * 24 * 3600;
const MAX_REMINDER_LEAD_HOURS: i64 = 366 * 24;

/// Runtime settings, read from the environment (and `.env` via `dotenv`).
#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub reminder_lead_hours: i64,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not found")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET not found")?;
        if jwt_secret.len() < 16 {
            bail!("JWT_SECRET must have at least 16 bytes");
        }
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let jwt_ttl_secs = parse_or(&lookup, "JWT_TTL_SECS", DEFAULT_JWT_TTL_SECS)?;
        let reminder_lead_hours =
            parse_or(&lookup, "REMINDER_LEAD_HOURS", DEFAULT_REMINDER_LEAD_HOURS)?;
        if jwt_ttl_secs <= 0 || jwt_ttl_secs > MAX_JWT_TTL_SECS {
            bail!("JWT_TTL_SECS must be in 1..={}", MAX_JWT_TTL_SECS);
        }
        if reminder_lead_hours < 0 || reminder_lead_hours > MAX_REMINDER_LEAD_HOURS {
            bail!("REMINDER_LEAD_HOURS must be in 0..={}", MAX_REMINDER_LEAD_HOURS);
        }

        Ok(Self {
            database_url,
            bind_addr,
            jwt_secret,
            jwt_ttl_secs,
            reminder_lead_hours,
        })
    }

    pub fn from_request(req: &HttpRequest) -> anyhow::Result<web::Data<Settings>> {
        req.app_data::<web::Data<Settings>>()
            .cloned()
            .context("Settings not configured")
    }

    pub fn reminder_lead(&self) -> Duration {
        Duration::hours(self.reminder_lead_hours)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Wrong format on '{}'", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "mysql://clinic@localhost/clinic"),
        ("JWT_SECRET", "0123456789abcdef0123"),
    ];

    #[test]
    fn defaults_fill_optional_keys() {
        let settings = Settings::from_lookup(lookup_in(&REQUIRED)).unwrap();
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.jwt_ttl_secs, 3600);
        assert_eq!(settings.reminder_lead(), Duration::hours(24));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("JWT_TTL_SECS", "60"));
        vars.push(("REMINDER_LEAD_HOURS", " 2 "));
        let settings = Settings::from_lookup(lookup_in(&vars)).unwrap();
        assert_eq!(settings.jwt_ttl_secs, 60);
        assert_eq!(settings.reminder_lead_hours, 2);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Settings::from_lookup(lookup_in(&REQUIRED[..1])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn bad_numbers_are_errors() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("JWT_TTL_SECS", "an hour"));
        assert!(Settings::from_lookup(lookup_in(&vars)).is_err());
    }

    #[test]
    fn out_of_range_durations_are_errors() {
        for (key, value) in &[
            ("REMINDER_LEAD_HOURS", "-1"),
            ("REMINDER_LEAD_HOURS", "100000000000"),
            ("JWT_TTL_SECS", "0"),
            ("JWT_TTL_SECS", "9223372036854775807"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((*key, *value));
            let err = Settings::from_lookup(lookup_in(&vars)).unwrap_err();
            assert!(err.to_string().contains(*key), "{}={}: {}", key, value, err);
        }

        let mut vars = REQUIRED.to_vec();
        vars.push(("REMINDER_LEAD_HOURS", "8784"));
        let settings = Settings::from_lookup(lookup_in(&vars)).unwrap();
        assert_eq!(settings.reminder_lead(), Duration::hours(MAX_REMINDER_LEAD_HOURS));
    }
}
