//! Durable key/value configuration

use crate::StoreError;
use hueshift_domain::{PersistedCursor, ResourceKind, MAX_INTERVAL};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Process-wide configuration backed by a JSON object on disk
///
/// Reads are served from memory. Writes are serialized by an internal lock
/// and reach the file before [`ConfigStore::set`] returns; memory is only
/// updated once the file write succeeded, so the two never diverge.
///
/// # Examples
///
/// ```no_run
/// use hueshift_store::ConfigStore;
/// use std::time::Duration;
///
/// let store = ConfigStore::open("config.json").unwrap();
/// let interval = store
///     .get_duration("banner_change_interval")
///     .unwrap()
///     .unwrap_or(Duration::from_secs(3600));
/// ```
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl ConfigStore {
    /// Load an existing config file
    ///
    /// A missing file or anything other than a JSON object is an error;
    /// callers treat both as fatal at startup.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(StoreError::NotFound(path));
        }

        let contents = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let value: Value =
            serde_json::from_str(&contents).map_err(|e| StoreError::Parse(e.to_string()))?;
        let values = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::Parse(format!(
                    "expected a JSON object at the top level, found {}",
                    json_type_name(&other)
                )))
            }
        };

        tracing::debug!("Loaded {} config keys from {}", values.len(), path.display());

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Create a config file holding `initial`, replacing any existing file
    pub fn create<P: AsRef<Path>>(path: P, initial: Map<String, Value>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        write_atomically(&path, &initial)?;
        Ok(Self {
            path,
            values: Mutex::new(initial),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `key` holds a non-null value
    pub fn contains(&self, key: &str) -> bool {
        self.lock().get(key).is_some_and(|v| !v.is_null())
    }

    /// Raw JSON value of `key`
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.lock().get(key).filter(|v| !v.is_null()).cloned()
    }

    /// Typed value of `key`, `None` when absent or null
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Typed value of `key`, or `default` when absent
    ///
    /// A malformed value also falls back to `default`, with a warning.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!("{}; using default", e);
                default
            }
        }
    }

    /// Positive duration stored as (possibly fractional) seconds
    ///
    /// Values above [`MAX_INTERVAL`] are rejected.
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let Some(value) = self.get_raw(key) else {
            return Ok(None);
        };

        let invalid = |reason: &str| StoreError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let secs = value.as_f64().ok_or_else(|| invalid("expected a number of seconds"))?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(invalid("must be a positive number of seconds"));
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(duration) if duration <= MAX_INTERVAL => Ok(Some(duration)),
            _ => Err(invalid("exceeds the maximum of 365 days")),
        }
    }

    /// Set `key` and write the whole file before returning
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let mut values = self.lock();
        let mut next = values.clone();
        next.insert(key.to_string(), value);
        write_atomically(&self.path, &next)?;
        *values = next;

        tracing::debug!("Persisted config key '{}'", key);
        Ok(())
    }

    /// Store a duration as seconds (integral when possible)
    pub fn set_duration(&self, key: &str, duration: Duration) -> Result<(), StoreError> {
        if duration.subsec_nanos() == 0 {
            self.set(key, duration.as_secs())
        } else {
            self.set(key, duration.as_secs_f64())
        }
    }

    /// Fail with every key from `keys` that is absent or null
    pub fn require(&self, keys: &[&str]) -> Result<(), StoreError> {
        let values = self.lock();
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| values.get(**key).is_none_or(Value::is_null))
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::MissingKeys(missing))
        }
    }

    /// Persisted cursor of `resource`, if one was ever written
    pub fn load_cursor(&self, resource: ResourceKind) -> Result<Option<PersistedCursor>, StoreError> {
        self.get(&resource.cursor_key())
    }

    /// Overwrite the persisted cursor of `cursor.resource_id`
    pub fn save_cursor(&self, cursor: &PersistedCursor) -> Result<(), StoreError> {
        self.set(&cursor.resource_id.cursor_key(), cursor)
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        // Values are replaced wholesale after a successful write, so a
        // poisoned guard still holds a consistent map.
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Write `values` to a temp file next to `path`, then rename it over `path`
fn write_atomically(path: &Path, values: &Map<String, Value>) -> Result<(), StoreError> {
    let contents =
        serde_json::to_vec_pretty(values).map_err(|e| StoreError::Parse(e.to_string()))?;

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    file.write_all(&contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| StoreError::io(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with(dir: &TempDir, initial: Value) -> ConfigStore {
        let map = match initial {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        };
        ConfigStore::create(dir.path().join("config.json"), map).unwrap()
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = ConfigStore::open(dir.path().join("absent.json"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_open_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let result = ConfigStore::open(&path);
        assert!(matches!(result, Err(StoreError::Parse(msg)) if msg.contains("an array")));
    }

    #[test]
    fn test_open_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(ConfigStore::open(&path), Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_get_with_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({"admin_id": 42, "name": null}));

        assert_eq!(store.get::<u64>("admin_id").unwrap(), Some(42));
        assert_eq!(store.get::<u64>("name").unwrap(), None);
        assert_eq!(store.get_or("missing", 7u64), 7);
        assert!(!store.contains("name"));
    }

    #[test]
    fn test_get_wrong_type() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({"admin_id": "not a number"}));

        assert!(matches!(
            store.get::<u64>("admin_id"),
            Err(StoreError::InvalidValue { key, .. }) if key == "admin_id"
        ));
        assert_eq!(store.get_or("admin_id", 1u64), 1);
    }

    #[test]
    fn test_set_writes_through() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({"admin_id": 42}));

        store.set("banner_change_interval", 120).unwrap();

        let reopened = ConfigStore::open(store.path()).unwrap();
        assert_eq!(reopened.get::<u64>("banner_change_interval").unwrap(), Some(120));
        assert_eq!(reopened.get::<u64>("admin_id").unwrap(), Some(42));
        assert!(!dir.path().join("config.json.tmp").exists());
    }

    #[test]
    fn test_require_lists_every_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({"guild_id": 1, "admin_id": null}));

        store.require(&["guild_id"]).unwrap();
        match store.require(&["guild_id", "admin_id", "rgb_role_id"]) {
            Err(StoreError::MissingKeys(keys)) => {
                assert_eq!(keys, vec!["admin_id".to_string(), "rgb_role_id".to_string()]);
            }
            other => panic!("Expected MissingKeys, got {:?}", other),
        }
    }

    #[test]
    fn test_durations() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({"a": 90, "b": 0.5, "c": 0, "d": "soon"}));

        assert_eq!(store.get_duration("a").unwrap(), Some(Duration::from_secs(90)));
        assert_eq!(store.get_duration("b").unwrap(), Some(Duration::from_millis(500)));
        assert!(store.get_duration("c").is_err());
        assert!(store.get_duration("d").is_err());
        assert_eq!(store.get_duration("absent").unwrap(), None);

        store.set_duration("e", Duration::from_secs(30)).unwrap();
        assert_eq!(store.get_raw("e"), Some(json!(30)));
        store.set_duration("f", Duration::from_millis(1500)).unwrap();
        assert_eq!(store.get_raw("f"), Some(json!(1.5)));
    }

    #[test]
    fn test_oversized_durations_are_invalid() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            json!({"year": 31_536_000, "longer": 31_536_001, "huge": 1e30}),
        );

        assert_eq!(store.get_duration("year").unwrap(), Some(MAX_INTERVAL));
        for key in ["longer", "huge"] {
            match store.get_duration(key) {
                Err(StoreError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("Expected InvalidValue for {}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_cursor_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, json!({}));
        assert_eq!(store.load_cursor(ResourceKind::RoleColor).unwrap(), None);

        let cursor = PersistedCursor {
            resource_id: ResourceKind::RoleColor,
            index: 11,
            updated_at: 1_700_000_123,
        };
        store.save_cursor(&cursor).unwrap();

        let reopened = ConfigStore::open(store.path()).unwrap();
        assert_eq!(reopened.load_cursor(ResourceKind::RoleColor).unwrap(), Some(cursor));
    }
}
