//! Bot settings loaded from the config store
//!
//! Identifiers may be written as JSON numbers or as strings of digits.

use crate::AppError;
use hueshift_domain::{ActorId, CapabilityId, ChannelId};
use hueshift_store::{ConfigStore, StoreError};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Keys that must be present before anything starts
pub const REQUIRED_KEYS: [&str; 8] = [
    "guild_id",
    "rgb_role_id",
    "booster_role_id",
    "color_change_interval",
    "banner_change_interval",
    "banner_storage_path",
    "designated_channel_id",
    "admin_id",
];

/// Default pause between intake polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Settings the bot needs besides rotation timing
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Guild whose role, banner and icon rotate
    pub guild_id: u64,

    /// Role whose color rotates
    pub rgb_role_id: u64,

    /// Role allowed to contribute images and run commands
    pub booster_role: CapabilityId,

    /// Directory holding stored banners
    pub banner_storage_path: PathBuf,

    /// Channel for banner intake, commands and operator alerts
    pub designated_channel: ChannelId,

    /// Operator mentioned in alerts
    pub admin: ActorId,

    /// Write-restricted icon intake channel; enables icon rotation
    pub icon_channel: Option<ChannelId>,

    /// Icon URLs seeded into the pool at startup
    pub icon_urls: Vec<String>,

    /// Upper bound on one intake download
    pub intake_fetch_timeout: Duration,

    /// Pause between intake polls
    pub poll_interval: Duration,
}

impl Settings {
    /// Read and validate settings
    ///
    /// Every missing required key is reported at once.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hueshift_bot::config::Settings;
    /// use hueshift_store::ConfigStore;
    ///
    /// let store = ConfigStore::open("config.json").unwrap();
    /// let settings = Settings::load(&store).unwrap();
    /// println!("Watching channel {}", settings.designated_channel);
    /// ```
    pub fn load(store: &ConfigStore) -> Result<Self, AppError> {
        store.require(&REQUIRED_KEYS)?;

        let banner_storage_path: String = store
            .get("banner_storage_path")?
            .ok_or_else(|| missing("banner_storage_path"))?;
        if banner_storage_path.trim().is_empty() {
            return Err(invalid("banner_storage_path", "must not be empty").into());
        }

        let icon_channel = if store.contains("icon_channel_id") {
            Some(ChannelId(id(store, "icon_channel_id")?))
        } else {
            None
        };

        Ok(Self {
            guild_id: id(store, "guild_id")?,
            rgb_role_id: id(store, "rgb_role_id")?,
            booster_role: CapabilityId(id(store, "booster_role_id")?),
            banner_storage_path: PathBuf::from(banner_storage_path),
            designated_channel: ChannelId(id(store, "designated_channel_id")?),
            admin: ActorId(id(store, "admin_id")?),
            icon_channel,
            icon_urls: store.get("icon_urls")?.unwrap_or_default(),
            intake_fetch_timeout: store
                .get_duration("intake_fetch_timeout")?
                .unwrap_or(hueshift_remote::DEFAULT_FETCH_TIMEOUT),
            poll_interval: store
                .get_duration("intake_poll_interval")?
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }
}

fn id(store: &ConfigStore, key: &str) -> Result<u64, StoreError> {
    match store.get_raw(key) {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| invalid(key, "expected a positive integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| invalid(key, "expected a numeric id")),
        Some(_) => Err(invalid(key, "expected a numeric id")),
        None => Err(missing(key)),
    }
}

fn missing(key: &str) -> StoreError {
    StoreError::MissingKeys(vec![key.to_string()])
}

fn invalid(key: &str, reason: &str) -> StoreError {
    StoreError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store(dir: &TempDir, values: Value) -> ConfigStore {
        let Value::Object(map) = values else {
            panic!("Expected an object");
        };
        ConfigStore::create(dir.path().join("config.json"), map).unwrap()
    }

    fn complete() -> Value {
        json!({
            "guild_id": 1,
            "rgb_role_id": "2",
            "booster_role_id": 3,
            "color_change_interval": 3600,
            "banner_change_interval": 1800,
            "banner_storage_path": "banners",
            "designated_channel_id": 4,
            "admin_id": "5"
        })
    }

    #[test]
    fn test_load_complete_settings() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&store(&dir, complete())).unwrap();

        assert_eq!(settings.guild_id, 1);
        assert_eq!(settings.rgb_role_id, 2);
        assert_eq!(settings.booster_role, CapabilityId(3));
        assert_eq!(settings.admin, ActorId(5));
        assert_eq!(settings.icon_channel, None);
        assert!(settings.icon_urls.is_empty());
        assert_eq!(settings.intake_fetch_timeout, Duration::from_secs(15));
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_missing_keys_are_all_reported() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(&store(&dir, json!({"guild_id": 1}))).unwrap_err();

        let AppError::Store(StoreError::MissingKeys(keys)) = err else {
            panic!("Expected missing keys, got {:?}", err);
        };
        assert_eq!(keys.len(), 7);
        assert!(keys.contains(&"admin_id".to_string()));
    }

    #[test]
    fn test_malformed_id() {
        let dir = TempDir::new().unwrap();
        let mut values = complete();
        values["guild_id"] = json!("not-a-number");

        let err = Settings::load(&store(&dir, values)).unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::InvalidValue { ref key, .. }) if key == "guild_id"));
    }

    #[test]
    fn test_optional_icon_settings() {
        let dir = TempDir::new().unwrap();
        let mut values = complete();
        values["icon_channel_id"] = json!(9);
        values["icon_urls"] = json!(["https://cdn.example/a.png"]);
        values["intake_fetch_timeout"] = json!(2.5);

        let settings = Settings::load(&store(&dir, values)).unwrap();
        assert_eq!(settings.icon_channel, Some(ChannelId(9)));
        assert_eq!(settings.icon_urls.len(), 1);
        assert_eq!(settings.intake_fetch_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut values = complete();
        values["intake_fetch_timeout"] = json!(0);
        assert!(Settings::load(&store(&dir, values)).is_err());
    }
}
