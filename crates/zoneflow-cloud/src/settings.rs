//! Reconcile settings
//!
//! Per-phase timeouts and poll timing. Defaults match what the DNS service
//! needs in practice: ten minutes per phase, a 5s settle delay before the
//! first read and at least 3s between reads.
//!
//! Settings can be deserialized from any serde format or read from the
//! environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `ZONEFLOW_CREATE_TIMEOUT` | `create_timeout` |
//! | `ZONEFLOW_UPDATE_TIMEOUT` | `update_timeout` |
//! | `ZONEFLOW_DELETE_TIMEOUT` | `delete_timeout` |
//! | `ZONEFLOW_POLL_DELAY` | `delay` |
//! | `ZONEFLOW_POLL_MIN_INTERVAL` | `min_interval` |
//! | `ZONEFLOW_DISABLE_STATUS_CHECK` | `skip_status_check` |
//!
//! Durations are written as `500ms`, `30s`, `10m`, `1h`, or a bare number of
//! seconds.

use crate::error::ConfigError;
use crate::poll::PollConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    #[serde(with = "duration_text")]
    pub create_timeout: Duration,

    #[serde(with = "duration_text")]
    pub update_timeout: Duration,

    #[serde(with = "duration_text")]
    pub delete_timeout: Duration,

    /// Grace period before the first read
    #[serde(with = "duration_text")]
    pub delay: Duration,

    /// Floor on the time between reads
    #[serde(with = "duration_text")]
    pub min_interval: Duration,

    /// Return right after the mutating call instead of polling
    pub skip_status_check: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            create_timeout: DEFAULT_TIMEOUT,
            update_timeout: DEFAULT_TIMEOUT,
            delete_timeout: DEFAULT_TIMEOUT,
            delay: DEFAULT_DELAY,
            min_interval: DEFAULT_MIN_INTERVAL,
            skip_status_check: false,
        }
    }
}

impl ReconcileSettings {
    /// Defaults overridden by `ZONEFLOW_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(value) = env_duration("ZONEFLOW_CREATE_TIMEOUT")? {
            settings.create_timeout = value;
        }
        if let Some(value) = env_duration("ZONEFLOW_UPDATE_TIMEOUT")? {
            settings.update_timeout = value;
        }
        if let Some(value) = env_duration("ZONEFLOW_DELETE_TIMEOUT")? {
            settings.delete_timeout = value;
        }
        if let Some(value) = env_duration("ZONEFLOW_POLL_DELAY")? {
            settings.delay = value;
        }
        if let Some(value) = env_duration("ZONEFLOW_POLL_MIN_INTERVAL")? {
            settings.min_interval = value;
        }
        if let Ok(value) = std::env::var("ZONEFLOW_DISABLE_STATUS_CHECK") {
            settings.skip_status_check = parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: "ZONEFLOW_DISABLE_STATUS_CHECK".to_string(),
                value,
            })?;
        }

        tracing::debug!("Loaded reconcile settings: {:?}", settings);
        Ok(settings)
    }

    pub fn poll_for_create(&self) -> Result<PollConfig, ConfigError> {
        PollConfig::until_active(self.create_timeout, self.delay, self.min_interval)
    }

    pub fn poll_for_update(&self) -> Result<PollConfig, ConfigError> {
        PollConfig::until_active(self.update_timeout, self.delay, self.min_interval)
    }

    pub fn poll_for_delete(&self) -> Result<PollConfig, ConfigError> {
        PollConfig::until_deleted(self.delete_timeout, self.delay, self.min_interval)
    }
}

fn env_duration(key: &str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_duration(&value)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Parse `500ms`, `30s`, `10m`, `1h` or a bare number of seconds
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: u64 = number.parse().ok()?;

    match unit.trim() {
        "" | "s" => Some(Duration::from_secs(number)),
        "ms" => Some(Duration::from_millis(number)),
        "m" => number.checked_mul(60).map(Duration::from_secs),
        "h" => number.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

fn format_duration(duration: &Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 != 0 {
        format!("{}ms", millis)
    } else {
        format!("{}s", duration.as_secs())
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

mod duration_text {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration(&text)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {}", text))),
        }
    }
}
