// Allow dead code: storage backends beyond the configured one stay available
#![allow(dead_code)]

//! Durable credential storage.
//!
//! The store holds exactly three values: the access token, the refresh
//! token, and the cached profile snapshot. The backing medium is pluggable
//! so tests run against memory, normal operation uses a JSON session file
//! in the cache directory, and security-conscious users can opt into the OS
//! keychain.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use crate::cache::SessionCache;
use crate::config::{
    ALL_CREDENTIAL_KEYS, KEY_ACCESS_TOKEN, KEY_PROFILE, KEY_REFRESH_TOKEN,
};
use crate::models::Profile;

/// Keyring service name
const SERVICE_NAME: &str = "farecard";

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

/// The kinds of credentials the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    AccessToken,
    RefreshToken,
    Profile,
}

impl CredentialKind {
    fn key(self) -> &'static str {
        match self {
            CredentialKind::AccessToken => KEY_ACCESS_TOKEN,
            CredentialKind::RefreshToken => KEY_REFRESH_TOKEN,
            CredentialKind::Profile => KEY_PROFILE,
        }
    }
}

/// Pluggable backing medium for credential values.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Write several values in one durable step where the medium allows it.
    fn write_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.write(key, value)?;
        }
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// JSON document store under the cache directory.
/// The whole document is rewritten on every mutation, so a token-pair write
/// lands in a single step.
pub struct FileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        let path = cache_dir.join(SESSION_FILE);
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(error = %e, "Session file was unreadable, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl StorageBackend for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("session store lock poisoned")
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().expect("session store lock poisoned");
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().expect("session store lock poisoned");
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }

    fn write_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut values = self.values.write().expect("session store lock poisoned");
        for (key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        self.persist(&values)
    }
}

// ============================================================================
// OS keychain store
// ============================================================================

/// One keychain entry per credential key.
pub struct KeyringStore;

impl KeyringStore {
    fn entry(key: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, key).context("Failed to create keyring entry")
    }
}

impl StorageBackend for KeyringStore {
    fn read(&self, key: &str) -> Option<String> {
        Self::entry(key).ok()?.get_password().ok()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Purely in-memory backend, for tests and for ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("memory store lock poisoned")
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .expect("memory store lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .expect("memory store lock poisoned")
            .remove(key);
        Ok(())
    }
}

// ============================================================================
// Facade
// ============================================================================

/// Credential store facade used by the rest of the crate.
/// Also owns the session-scoped scratch cache so that `clear_all` tears
/// down everything identity-derived in one call.
pub struct CredentialStore {
    backend: Box<dyn StorageBackend>,
    scratch: SessionCache,
}

impl CredentialStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            scratch: SessionCache::new(),
        }
    }

    pub fn get(&self, kind: CredentialKind) -> Option<String> {
        self.backend.read(kind.key()).filter(|v| !v.is_empty())
    }

    pub fn set(&self, kind: CredentialKind, value: &str) -> Result<()> {
        self.backend.write(kind.key(), value)
    }

    /// Write both tokens in one step. A refresh must never leave a new
    /// access token paired with a stale refresh token.
    pub fn set_token_pair(&self, access: &str, refresh: &str) -> Result<()> {
        self.backend
            .write_many(&[(KEY_ACCESS_TOKEN, access), (KEY_REFRESH_TOKEN, refresh)])
    }

    /// Remove every credential key any release has ever written, then wipe
    /// the session-scoped cache. Safe to call when nothing is stored.
    pub fn clear_all(&self) -> Result<()> {
        for key in ALL_CREDENTIAL_KEYS {
            self.backend.remove(key)?;
        }
        self.scratch.clear();
        debug!("Credential store cleared");
        Ok(())
    }

    pub fn scratch(&self) -> &SessionCache {
        &self.scratch
    }

    /// Deserialize the cached profile snapshot, if one is stored.
    pub fn profile(&self) -> Option<Profile> {
        let raw = self.get(CredentialKind::Profile)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Cached profile snapshot was unreadable");
                None
            }
        }
    }

    pub fn put_profile(&self, profile: &Profile) -> Result<()> {
        let raw = serde_json::to_string(profile)?;
        self.set(CredentialKind::Profile, &raw)?;
        self.scratch.put_profile(profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KEY_LEGACY_TOKEN;
    use crate::models::Settings;

    fn store() -> CredentialStore {
        CredentialStore::new(Box::new(MemoryStore::new()))
    }

    #[test]
    fn get_returns_absent_for_empty_value() {
        let store = store();
        store.set(CredentialKind::AccessToken, "").expect("set");
        assert!(store.get(CredentialKind::AccessToken).is_none());
    }

    #[test]
    fn clear_all_removes_legacy_key_and_scratch() {
        let store = store();
        store.set_token_pair("acc", "ref").expect("set pair");
        // Simulate a value left behind by an old release
        store.backend.write(KEY_LEGACY_TOKEN, "ancient").expect("write");
        store.scratch().put_news_page(1, Default::default());

        store.clear_all().expect("clear");

        assert!(store.get(CredentialKind::AccessToken).is_none());
        assert!(store.get(CredentialKind::RefreshToken).is_none());
        assert!(store.backend.read(KEY_LEGACY_TOKEN).is_none());
        assert!(store.scratch().is_empty());
    }

    #[test]
    fn clear_all_is_idempotent_on_empty_store() {
        let store = store();
        store.clear_all().expect("first clear");
        store.clear_all().expect("second clear");
    }

    #[test]
    fn token_pair_is_written_together() {
        let store = store();
        store.set_token_pair("new-access", "new-refresh").expect("set pair");
        assert_eq!(store.get(CredentialKind::AccessToken).as_deref(), Some("new-access"));
        assert_eq!(store.get(CredentialKind::RefreshToken).as_deref(), Some("new-refresh"));
    }

    #[test]
    fn profile_snapshot_round_trips() {
        let store = store();
        let profile = Profile {
            id: 42,
            email: "rider@example.com".to_string(),
            first_name: Some("Eva".to_string()),
            last_name: Some("Novak".to_string()),
            phone_number: None,
            settings: Settings::default(),
        };
        store.put_profile(&profile).expect("put profile");

        let loaded = store.profile().expect("profile should load");
        assert_eq!(loaded.id, 42);
        assert_eq!(loaded.display_name(), "Eva Novak");
        // Snapshot is mirrored into the scratch cache
        assert!(store.scratch().profile().is_some());
    }

    #[test]
    fn unreadable_profile_degrades_to_none() {
        let store = store();
        store.set(CredentialKind::Profile, "{not json").expect("set");
        assert!(store.profile().is_none());
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("farecard-store-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        {
            let backend = FileStore::new(dir.clone()).expect("file store");
            backend.write_many(&[("access_token", "a1"), ("refresh_token", "r1")]).expect("write");
        }
        {
            let backend = FileStore::new(dir.clone()).expect("file store reopen");
            assert_eq!(backend.read("access_token").as_deref(), Some("a1"));
            backend.remove("access_token").expect("remove");
            backend.remove("access_token").expect("remove again is fine");
            assert!(backend.read("access_token").is_none());
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
