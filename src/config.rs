use anyhow::Context;
use serde::Deserialize;
use time::{macros::format_description, UtcOffset};

use crate::maintenance::trigger::Trigger;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// FoodData Central access.
#[derive(Debug, Clone)]
pub struct UsdaConfig {
    pub api_key: String,
    pub base_url: String,
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".into(),
            page_number: 1,
            page_size: 20,
        }
    }
}

/// Reference zone and firing times of the maintenance jobs.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub utc_offset: UtcOffset,
    pub daily_reset: Trigger,
    pub weekly_reset: Trigger,
    pub goal_check: Trigger,
    pub goal_threshold: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            // Asia/Kuala_Lumpur has no DST
            utc_offset: time::macros::offset!(+8),
            daily_reset: Trigger::Daily(time::macros::time!(0:00)),
            weekly_reset: Trigger::Weekly(time::Weekday::Monday, time::macros::time!(12:00)),
            goal_check: Trigger::Daily(time::macros::time!(23:30)),
            goal_threshold: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub usda: UsdaConfig,
    pub schedule: ScheduleConfig,
    /// Image recognition is off unless both are set.
    pub classifier_url: Option<String>,
    pub labels_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "calorie-ledger".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "calorie-ledger-users".into()),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let usda_defaults = UsdaConfig::default();
        let usda = UsdaConfig {
            api_key: std::env::var("USDA_API_KEY").context("USDA_API_KEY")?,
            base_url: std::env::var("USDA_BASE_URL").unwrap_or(usda_defaults.base_url),
            page_number: parsed_or("USDA_PAGE_NUMBER", usda_defaults.page_number),
            page_size: parsed_or("USDA_PAGE_SIZE", usda_defaults.page_size),
        };

        let defaults = ScheduleConfig::default();
        let schedule = ScheduleConfig {
            utc_offset: match std::env::var("LEDGER_UTC_OFFSET") {
                Ok(v) => parse_offset(&v)?,
                Err(_) => defaults.utc_offset,
            },
            daily_reset: trigger_or("DAILY_RESET_AT", defaults.daily_reset)?,
            weekly_reset: trigger_or("WEEKLY_RESET_AT", defaults.weekly_reset)?,
            goal_check: trigger_or("GOAL_CHECK_AT", defaults.goal_check)?,
            goal_threshold: parsed_or("GOAL_THRESHOLD", defaults.goal_threshold),
        };

        Ok(Self {
            database_url,
            jwt,
            usda,
            schedule,
            classifier_url: std::env::var("CLASSIFIER_URL").ok(),
            labels_path: std::env::var("LABELS_PATH").ok(),
        })
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn trigger_or(key: &str, default: Trigger) -> anyhow::Result<Trigger> {
    match std::env::var(key) {
        Ok(v) => v.parse::<Trigger>().with_context(|| format!("{key}={v}")),
        Err(_) => Ok(default),
    }
}

/// Parses `+08:00` / `-05:30`.
pub fn parse_offset(raw: &str) -> anyhow::Result<UtcOffset> {
    let format = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(raw.trim(), format).with_context(|| format!("invalid utc offset {raw}"))
}
