use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub jwt_secret: String,
    pub server_addr: String,
    /// seconds
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    /// Zone used for "today" and for working-hours checks
    pub utc_offset: FixedOffset,

    // Face comparison service
    pub face_service_url: String,
    pub face_match_threshold: f64,
    pub face_service_timeout_secs: u64,

    // Selfie object storage
    pub storage_endpoint: String,
    pub storage_bucket: String,
    pub storage_signing_secret: String,
    pub storage_timeout_secs: u64,
    pub presigned_url_ttl: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout_secs: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 2_592_000)?, // 30 days

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),

            utc_offset: parse_offset(&lookup("UTC_OFFSET").unwrap_or_else(|| "+00:00".to_string()))
                .context("UTC_OFFSET must look like +06:00 or -03:30")?,

            face_service_url: required("FACE_SERVICE_URL")?,
            face_match_threshold: parse_or(&lookup, "FACE_MATCH_THRESHOLD", 90.0)?,
            face_service_timeout_secs: parse_or(&lookup, "FACE_SERVICE_TIMEOUT_SECS", 10)?,

            storage_endpoint: required("STORAGE_ENDPOINT")?,
            storage_bucket: required("STORAGE_BUCKET")?,
            storage_signing_secret: required("STORAGE_SIGNING_SECRET")?,
            storage_timeout_secs: parse_or(&lookup, "STORAGE_TIMEOUT_SECS", 10)?,
            presigned_url_ttl: parse_or(&lookup, "PRESIGNED_URL_TTL", 3600)?, // 1 hour
        };

        if config.rate_login_per_min == 0 || config.rate_protected_per_min == 0 {
            return Err(anyhow!("rate limits must be greater than zero"));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} value '{raw}': {e}")),
        None => Ok(default),
    }
}

/// Parses `+HH:MM` / `-HH:MM` (or `Z`).
pub fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(anyhow!("offset must start with + or -")),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().context("offset hours")?;
    let minutes: i32 = minutes.parse().context("offset minutes")?;
    if hours > 14 || minutes > 59 {
        return Err(anyhow!("offset out of range"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| anyhow!("offset out of range"))
}
