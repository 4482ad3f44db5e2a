use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::Display,
    str::FromStr,
    sync::{Arc, RwLock},
    time::Duration,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub struct TrelloConfig {
    pub api_key: String,
    pub api_token: String,
    pub member: String,
    pub board: String,
    pub list: String,
    pub labels: Vec<String>,
}

pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_from: String,
    pub phone_to: String,
}

/// Startup configuration, read once from the environment.
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub timeout: Duration,
    pub settings: Settings,
    pub trello: TrelloConfig,
    pub twilio: TwilioConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            mongo_uri: try_load("MONGO_URI", "mongodb://localhost:27017/")?,
            mongo_database: try_load("MONGO_DATABASE", "pantry")?,
            timeout: duration("PANTRY_TIMEOUT", "5s")?,
            settings: Settings {
                lookahead: duration("PANTRY_LOOKAHEAD", "48h")?,
                interval: interval("PANTRY_INTERVAL", "24h")?,
                silence: try_load("PANTRY_SILENCE", "false")?,
                version: 0,
            },
            trello: TrelloConfig {
                api_key: required("TRELLO_API_KEY")?,
                api_token: required("TRELLO_API_TOKEN")?,
                member: required("TRELLO_MEMBER")?,
                board: required("TRELLO_BOARD")?,
                list: required("TRELLO_LIST")?,
                labels: split_labels(&env::var("TRELLO_LABELS").unwrap_or_default()),
            },
            twilio: TwilioConfig {
                account_sid: required("TWILIO_ACCOUNT_SID")?,
                auth_token: required("TWILIO_AUTH_TOKEN")?,
                phone_from: required("TWILIO_PHONE_FROM")?,
                phone_to: required("TWILIO_PHONE_TO")?,
            },
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }
    })
}

fn duration(key: &'static str, default: &str) -> Result<Duration, ConfigError> {
    try_load::<humantime::Duration>(key, default).map(Into::into)
}

/// Like `duration`, but zero is rejected: the watcher waits this long between runs.
fn interval(key: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let value = duration(key, default)?;
    if value.is_zero() {
        warn!("Invalid {key} value: zero");
        return Err(ConfigError::Invalid {
            key,
            value: humantime::format_duration(value).to_string(),
            reason: "interval must be greater than zero".into(),
        });
    }
    Ok(value)
}

pub fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Settings that may change while the service runs.
///
/// A value of this type is never mutated once published; updates produce a
/// new snapshot with a bumped `version`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    #[serde(with = "humantime_serde")]
    pub lookahead: Duration,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub silence: bool,
    pub version: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, with = "humantime_serde")]
    pub lookahead: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    pub silence: Option<bool>,
}

pub struct SettingsHandle {
    current: RwLock<Arc<Settings>>,
}

impl SettingsHandle {
    pub fn new(initial: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Publishes a new snapshot built from the current one and `update`.
    pub fn apply(&self, update: SettingsUpdate) -> Arc<Settings> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let next = Arc::new(Settings {
            lookahead: update.lookahead.unwrap_or(guard.lookahead),
            interval: update.interval.unwrap_or(guard.interval),
            silence: update.silence.unwrap_or(guard.silence),
            version: guard.version + 1,
        });
        *guard = Arc::clone(&next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            lookahead: Duration::from_secs(48 * 3600),
            interval: Duration::from_secs(24 * 3600),
            silence: false,
            version: 0,
        }
    }

    #[test]
    fn test_apply_publishes_new_version() {
        let handle = SettingsHandle::new(settings());
        let before = handle.snapshot();
        let after = handle.apply(SettingsUpdate {
            silence: Some(true),
            ..Default::default()
        });
        assert_eq!(after.version, 1);
        assert!(after.silence);
        assert_eq!(after.lookahead, before.lookahead);
        // readers holding the old snapshot keep seeing it
        assert!(!before.silence);
        assert_eq!(handle.snapshot().version, 1);
    }

    #[test]
    fn test_settings_update_parses_human_durations() {
        let update: SettingsUpdate =
            serde_json::from_str(r#"{"lookahead": "3days", "interval": "12h"}"#).unwrap();
        assert_eq!(update.lookahead, Some(Duration::from_secs(3 * 24 * 3600)));
        assert_eq!(update.interval, Some(Duration::from_secs(12 * 3600)));
        assert_eq!(update.silence, None);
    }

    #[test]
    fn test_settings_serialize_durations_as_text() {
        let value = serde_json::to_value(settings()).unwrap();
        assert_eq!(value["lookahead"], "2days");
        assert_eq!(value["interval"], "1day");
    }

    #[test]
    fn test_zero_interval_fails_to_load() {
        env::set_var("PANTRY_INTERVAL", "0s");
        let result = Config::load();
        env::remove_var("PANTRY_INTERVAL");
        match result {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "PANTRY_INTERVAL"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("zero interval accepted"),
        }
    }

    #[test]
    fn test_interval_default_applies() {
        assert_eq!(
            interval("PANTRY_TEST_UNSET_INTERVAL", "12h").unwrap(),
            Duration::from_secs(12 * 3600)
        );
        assert!(interval("PANTRY_TEST_UNSET_INTERVAL", "0s").is_err());
    }

    #[test]
    fn test_split_labels_drops_blanks() {
        assert_eq!(split_labels("Groceries, Urgent,,"), vec!["Groceries", "Urgent"]);
        assert!(split_labels("").is_empty());
    }
}
