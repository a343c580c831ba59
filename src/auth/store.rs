use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::User;

/// Keyring service name for the keychain backend
const SERVICE_NAME: &str = "budgetbook";

/// Credential file name for the file backend
const CREDENTIALS_FILE: &str = "credentials.json";

/// Storage slot for the access token
const ACCESS_KEY: &str = "bt_access";

/// Storage slot for the refresh token
const REFRESH_KEY: &str = "bt_refresh";

/// Storage slot for the cached user record (JSON-serialized)
const USER_KEY: &str = "bt_user";

/// Durable key-value storage for credentials.
///
/// Implementations must be usable from multiple threads; backends handle
/// their own interior mutability.
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// Remove several keys as one storage operation, so no reader can
    /// observe a partially cleared state.
    fn clear(&self, keys: &[&str]) -> Result<()>;
}

// ============================================================================
// Backends
// ============================================================================

/// Stores credentials as a single JSON object file in the config directory.
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credentials file")?;
        let map: Map<String, Value> = serde_json::from_str(&contents)
            .context("Failed to parse credentials file")?;
        Ok(map)
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents).context("Failed to write credentials file")?;
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map().unwrap_or_default();
        map.remove(key);
        self.write_map(&map)
    }

    fn clear(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map().unwrap_or_default();
        for key in keys {
            map.remove(*key);
        }
        // one rewrite for all slots
        self.write_map(&map)
    }
}

/// Stores credentials in the OS keychain via the keyring crate.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read credential from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }

    fn clear(&self, keys: &[&str]) -> Result<()> {
        // the OS keychain has no multi-entry operation; entries are
        // per-key, so removal is sequential here
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// In-process storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn clear(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

// ============================================================================
// Credential store
// ============================================================================

/// Typed access to stored tokens and the cached user record.
///
/// Reads never fail: a missing, unreadable, or corrupted slot is reported
/// as absent. Writes surface storage errors to the caller.
pub struct CredentialStore {
    storage: Box<dyn TokenStorage>,
}

impl CredentialStore {
    pub fn new(storage: Box<dyn TokenStorage>) -> Self {
        Self { storage }
    }

    /// File-backed store in the budgetbook config directory
    pub fn file() -> Result<Self> {
        let path = crate::config::Config::data_dir()?.join(CREDENTIALS_FILE);
        Ok(Self::new(Box::new(FileStorage::new(path))))
    }

    /// OS keychain-backed store
    pub fn keyring() -> Self {
        Self::new(Box::new(KeyringStorage::new()))
    }

    /// In-memory store (nothing survives the process)
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Overwrite both tokens (login)
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<()> {
        self.storage.set(ACCESS_KEY, access)?;
        self.storage.set(REFRESH_KEY, refresh)?;
        Ok(())
    }

    /// Overwrite only the access token (after refresh)
    pub fn set_access_token(&self, access: &str) -> Result<()> {
        self.storage.set(ACCESS_KEY, access)
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_KEY)
    }

    pub fn set_user(&self, user: &User) -> Result<()> {
        let serialized = serde_json::to_string(user)?;
        self.storage.set(USER_KEY, &serialized)
    }

    /// Cached user identity. A corrupted slot is treated as absent.
    pub fn user(&self) -> Option<User> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Ignoring corrupted cached user record");
                None
            }
        }
    }

    /// Remove access token, refresh token, and cached user in a single
    /// storage operation. Idempotent.
    pub fn clear_tokens(&self) -> Result<()> {
        self.storage.clear(&[ACCESS_KEY, REFRESH_KEY, USER_KEY])
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Credential read failed, treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Wraps a backend and records which storage operations ran
    struct RecordingStorage {
        inner: MemoryStorage,
        ops: Arc<Mutex<Vec<String>>>,
    }

    impl TokenStorage for RecordingStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.ops.lock().unwrap().push(format!("set {}", key));
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.ops.lock().unwrap().push(format!("remove {}", key));
            self.inner.remove(key)
        }

        fn clear(&self, keys: &[&str]) -> Result<()> {
            self.ops.lock().unwrap().push(format!("clear {}", keys.join(",")));
            self.inner.clear(keys)
        }
    }

    #[test]
    fn test_set_and_get_tokens() {
        let store = CredentialStore::in_memory();
        store.set_tokens("acc", "ref").unwrap();
        assert_eq!(store.access_token().as_deref(), Some("acc"));
        assert_eq!(store.refresh_token().as_deref(), Some("ref"));

        store.set_access_token("acc2").unwrap();
        assert_eq!(store.access_token().as_deref(), Some("acc2"));
        // refresh token untouched
        assert_eq!(store.refresh_token().as_deref(), Some("ref"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = CredentialStore::in_memory();
        // clearing an empty store must not error
        store.clear_tokens().unwrap();

        store.set_tokens("acc", "ref").unwrap();
        store
            .set_user(&User {
                username: "alice".to_string(),
            })
            .unwrap();
        store.clear_tokens().unwrap();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.user().is_none());

        store.clear_tokens().unwrap();
    }

    #[test]
    fn test_corrupted_user_is_absent() {
        let store = CredentialStore::in_memory();
        store.storage.set("bt_user", "{not json").unwrap();
        assert!(store.user().is_none());
    }

    #[test]
    fn test_user_round_trip() {
        let store = CredentialStore::in_memory();
        assert!(store.user().is_none());
        store
            .set_user(&User {
                username: "bob".to_string(),
            })
            .unwrap();
        assert_eq!(store.user().unwrap().username, "bob");
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::new(Box::new(FileStorage::new(path.clone())));
        store.set_tokens("acc", "ref").unwrap();
        drop(store);

        let reopened = CredentialStore::new(Box::new(FileStorage::new(path)));
        assert_eq!(reopened.access_token().as_deref(), Some("acc"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("ref"));
    }

    #[test]
    fn test_clear_is_one_storage_operation() {
        let ops = Arc::new(Mutex::new(Vec::new()));
        let store = CredentialStore::new(Box::new(RecordingStorage {
            inner: MemoryStorage::new(),
            ops: ops.clone(),
        }));
        store.set_tokens("acc", "ref").unwrap();
        ops.lock().unwrap().clear();

        store.clear_tokens().unwrap();

        // all three slots go in one call, never as separate removes
        let recorded = ops.lock().unwrap().clone();
        assert_eq!(recorded, vec!["clear bt_access,bt_refresh,bt_user".to_string()]);
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn test_file_storage_clear_empties_all_slots_in_one_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::new(Box::new(FileStorage::new(path.clone())));
        store.set_tokens("acc", "ref").unwrap();
        store
            .set_user(&User {
                username: "alice".to_string(),
            })
            .unwrap();
        store.clear_tokens().unwrap();

        // the rewritten file holds no leftover slot
        let contents = std::fs::read_to_string(&path).unwrap();
        let map: Map<String, Value> = serde_json::from_str(&contents).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_file_storage_corrupted_file_reads_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = CredentialStore::new(Box::new(FileStorage::new(path)));
        assert!(store.access_token().is_none());
    }
}
