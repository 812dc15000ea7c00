use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Width of the atomic unit availability is sliced into before intersecting.
pub const ATOMIC_SLOT_MINUTES: u32 = 30;
/// Upper bound for reminder offsets (one year).
pub const MAX_REMINDER_HOURS: i64 = 24 * 366;

/// Top-level config (convene.toml + CONVENE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConveneConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Knobs of the coordination engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hours after session creation before the first reminder goes out.
    #[serde(default = "default_first_reminder_hours")]
    pub first_reminder_hours: i64,
    /// Hours after session creation the second reminder targets. The gap
    /// `second - first` is also the spacing of any later tiers.
    #[serde(default = "default_second_reminder_hours")]
    pub second_reminder_hours: i64,
    #[serde(default = "default_max_reminder_count")]
    pub max_reminder_count: u32,
    /// Per-candidate interview length used when a session does not specify one.
    #[serde(default = "default_interview_duration_minutes")]
    pub interview_duration_minutes: u32,
    /// Fixed at 30 in production; exposed so tests can shrink it.
    #[serde(default = "default_granularity_minutes")]
    pub granularity_minutes: u32,
    /// Also reconcile `PENDING` sessions that already have every response.
    /// Off by default: such sessions only exist after a crash between the
    /// response write and the first status write.
    #[serde(default)]
    pub reconcile_pending: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            first_reminder_hours: default_first_reminder_hours(),
            second_reminder_hours: default_second_reminder_hours(),
            max_reminder_count: default_max_reminder_count(),
            interview_duration_minutes: default_interview_duration_minutes(),
            granularity_minutes: default_granularity_minutes(),
            reconcile_pending: false,
        }
    }
}

impl EngineConfig {
    /// Hours between consecutive reminders after the first one.
    pub fn escalation_gap_hours(&self) -> i64 {
        self.second_reminder_hours - self.first_reminder_hours
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_reminder_hours < 0 {
            return Err(CoreError::Config(
                "engine.first_reminder_hours must not be negative".to_string(),
            ));
        }
        if self.second_reminder_hours > MAX_REMINDER_HOURS {
            return Err(CoreError::Config(format!(
                "engine.second_reminder_hours must not exceed {MAX_REMINDER_HOURS}"
            )));
        }
        if self.second_reminder_hours <= self.first_reminder_hours {
            return Err(CoreError::Config(format!(
                "engine.second_reminder_hours ({}) must be greater than first_reminder_hours ({})",
                self.second_reminder_hours, self.first_reminder_hours
            )));
        }
        if self.granularity_minutes == 0 || self.granularity_minutes > 24 * 60 {
            return Err(CoreError::Config(
                "engine.granularity_minutes must be between 1 and 1440".to_string(),
            ));
        }
        if self.interview_duration_minutes == 0 {
            return Err(CoreError::Config(
                "engine.interview_duration_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// When each periodic job fires. Daily times are UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_reminder_every_secs")]
    pub reminder_every_secs: u64,
    #[serde(default = "default_reconcile_hour")]
    pub reconcile_hour: u8,
    #[serde(default)]
    pub reconcile_minute: u8,
    #[serde(default = "default_day_before_hour")]
    pub day_before_hour: u8,
    #[serde(default)]
    pub day_before_minute: u8,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            reminder_every_secs: default_reminder_every_secs(),
            reconcile_hour: default_reconcile_hour(),
            reconcile_minute: 0,
            day_before_hour: default_day_before_hour(),
            day_before_minute: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

fn default_first_reminder_hours() -> i64 {
    48
}
fn default_second_reminder_hours() -> i64 {
    72
}
fn default_max_reminder_count() -> u32 {
    2
}
fn default_interview_duration_minutes() -> u32 {
    30
}
fn default_granularity_minutes() -> u32 {
    ATOMIC_SLOT_MINUTES
}
fn default_reminder_every_secs() -> u64 {
    3600
}
fn default_reconcile_hour() -> u8 {
    2
}
fn default_day_before_hour() -> u8 {
    9
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.convene/convene.db", home)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.convene/convene.toml", home)
}

impl ConveneConfig {
    /// Load config from a TOML file with CONVENE_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `CONVENE_ENGINE__FIRST_REMINDER_HOURS=24`. A missing file is not an
    /// error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ConveneConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CONVENE_").split("__"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        config.engine.validate()?;
        Ok(config)
    }
}
