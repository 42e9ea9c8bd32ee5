//! Loading rotation timing from the config store
//!
//! Intervals live under each resource's interval key. Flourish settings are
//! only read for the role color rotation, whose values are what a flourish
//! spins through.

use crate::RotationError;
use hueshift_domain::{ResourceKind, RotationConfig, MAX_FLOURISH_BURSTS};
use hueshift_store::ConfigStore;
use std::time::Duration;

/// Key enabling the pre-commit color flourish
pub const FLOURISH_ENABLED_KEY: &str = "color_flourish_enabled";

/// Key holding the length of one flourish, in seconds
pub const FLOURISH_DURATION_KEY: &str = "color_flourish_duration";

/// Key holding the number of extra bursts per interval
pub const FLOURISH_BURSTS_KEY: &str = "color_flourish_bursts";

/// Default length of one flourish
pub const DEFAULT_FLOURISH_DURATION: Duration = Duration::from_secs(6);

/// Build the [`RotationConfig`] of `resource` from `store`
///
/// A missing interval falls back to the resource default. A present but
/// malformed, non-positive or oversized interval is an error.
///
/// # Examples
///
/// ```no_run
/// use hueshift_domain::ResourceKind;
/// use hueshift_rotator::load_rotation_config;
/// use hueshift_store::ConfigStore;
///
/// let store = ConfigStore::open("config.json").unwrap();
/// let config = load_rotation_config(&store, ResourceKind::Banner).unwrap();
/// println!("banner rotates every {:?}", config.interval);
/// ```
pub fn load_rotation_config(
    store: &ConfigStore,
    resource: ResourceKind,
) -> Result<RotationConfig, RotationError> {
    let interval = store
        .get_duration(resource.interval_key())?
        .unwrap_or_else(|| resource.default_interval());

    let mut config = RotationConfig::new(interval);
    if resource != ResourceKind::RoleColor {
        return Ok(config);
    }

    if store.get_or(FLOURISH_ENABLED_KEY, false) {
        let duration = store
            .get_duration(FLOURISH_DURATION_KEY)?
            .unwrap_or(DEFAULT_FLOURISH_DURATION);
        config = config.with_flourish(duration);
    }

    let bursts: u8 = store.get_or(FLOURISH_BURSTS_KEY, 0);
    if bursts > MAX_FLOURISH_BURSTS {
        tracing::warn!(
            "{} = {} exceeds the maximum of {}; clamping",
            FLOURISH_BURSTS_KEY,
            bursts,
            MAX_FLOURISH_BURSTS
        );
    }
    Ok(config.with_bursts(bursts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn store_with(dir: &TempDir, initial: Value) -> ConfigStore {
        let Value::Object(map) = initial else {
            panic!("fixture must be an object");
        };
        ConfigStore::create(dir.path().join("config.json"), map).unwrap()
    }

    #[test]
    fn test_defaults_when_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({}));

        let icon = load_rotation_config(&store, ResourceKind::Icon).unwrap();
        assert_eq!(icon.interval, Duration::from_secs(20));
        assert!(!icon.flourish_enabled);

        let color = load_rotation_config(&store, ResourceKind::RoleColor).unwrap();
        assert_eq!(color.interval, Duration::from_secs(3600));
        assert_eq!(color.flourish_bursts, 0);
    }

    #[test]
    fn test_color_flourish_settings() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            json!({
                "color_change_interval": 120,
                "color_flourish_enabled": true,
                "color_flourish_duration": 3,
                "color_flourish_bursts": 5
            }),
        );

        let config = load_rotation_config(&store, ResourceKind::RoleColor).unwrap();
        assert_eq!(config.interval, Duration::from_secs(120));
        assert!(config.flourish_enabled);
        assert_eq!(config.flourish_duration, Duration::from_secs(3));
        assert_eq!(config.flourish_bursts, MAX_FLOURISH_BURSTS);

        // Flourish keys never apply to image rotations
        let banner = load_rotation_config(&store, ResourceKind::Banner).unwrap();
        assert!(!banner.flourish_enabled);
    }

    #[test]
    fn test_invalid_interval_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({"banner_change_interval": 0}));
        assert!(matches!(
            load_rotation_config(&store, ResourceKind::Banner),
            Err(RotationError::Store(_))
        ));
    }

    #[test]
    fn test_oversized_interval_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({"color_change_interval": 1e19}));
        assert!(matches!(
            load_rotation_config(&store, ResourceKind::RoleColor),
            Err(RotationError::Store(_))
        ));
    }
}
