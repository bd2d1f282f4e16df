//! Persisted user preferences with per-key expiry

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::errors::Result;

/// Default lifetime of a stored preference, in days
pub const DEFAULT_TTL_DAYS: i64 = 365;

/// Preference key for the target language
pub const KEY_TARGET_LANGUAGE: &str = "targetLanguage";
/// Preference key for the API key
pub const KEY_API_KEY: &str = "apiKey";
/// Preference key for the input token limit
pub const KEY_MAX_INPUT_TOKENS: &str = "maxInputTokens";
/// Preference key for the output token limit
pub const KEY_MAX_OUTPUT_TOKENS: &str = "maxOutputTokens";
/// Preference key for the request rate limit
pub const KEY_MAX_REQUESTS_PER_MINUTE: &str = "maxRequestsPerMinute";
/// Preference key for the token rate limit
pub const KEY_MAX_TOKENS_PER_MINUTE: &str = "maxTokensPerMinute";

/// Small key-value store with get/set/expire semantics
pub trait PreferenceStore {
    /// Get a value; expired entries are treated as absent
    fn get(&mut self, key: &str) -> Option<String>;

    /// Set a value that expires after `ttl_days`
    fn set(&mut self, key: &str, value: &str, ttl_days: i64) -> Result<()>;

    /// Remove a value
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One stored value with its expiry timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrefEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// JSON-file-backed preference store
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    entries: HashMap<String, PrefEntry>,
}

impl FilePreferenceStore {
    /// Open the store, loading existing entries if the file exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };

        Ok(Self { path, entries })
    }

    /// Store path: a dotfile in the user's home directory
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(".book-translator-prefs.json")
    }

    fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&mut self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.expires_at <= Utc::now(),
            None => return None,
        };

        if expired {
            debug!("Preference {} expired, dropping", key);
            self.entries.remove(key);
            if let Err(e) = self.persist() {
                warn!("Failed to drop expired preference {} from disk: {}", key, e);
            }
            return None;
        }

        self.entries.get(key).map(|e| e.value.clone())
    }

    fn set(&mut self, key: &str, value: &str, ttl_days: i64) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            PrefEntry {
                value: value.to_string(),
                expires_at: Utc::now() + Duration::days(ttl_days),
            },
        );
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_and_get() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = FilePreferenceStore::open(&path).unwrap();
        store.set(KEY_TARGET_LANGUAGE, "Polish", DEFAULT_TTL_DAYS).unwrap();

        assert_eq!(store.get(KEY_TARGET_LANGUAGE), Some("Polish".to_string()));
        assert_eq!(store.get(KEY_API_KEY), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        {
            let mut store = FilePreferenceStore::open(&path).unwrap();
            store.set(KEY_API_KEY, "secret", DEFAULT_TTL_DAYS).unwrap();
        }

        let mut store = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(store.get(KEY_API_KEY), Some("secret".to_string()));
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = FilePreferenceStore::open(&path).unwrap();
        store.set(KEY_MAX_INPUT_TOKENS, "4000", -1).unwrap();

        assert_eq!(store.get(KEY_MAX_INPUT_TOKENS), None);
    }

    #[test]
    fn test_expired_entry_stays_dropped_when_persist_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = FilePreferenceStore::open(&path).unwrap();
        store.set(KEY_API_KEY, "secret", -1).unwrap();

        // The store file can no longer be written
        std::fs::remove_dir_all(dir.path()).unwrap();

        assert_eq!(store.get(KEY_API_KEY), None);
        assert_eq!(store.get(KEY_API_KEY), None);
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = FilePreferenceStore::open(&path).unwrap();
        store.set(KEY_TARGET_LANGUAGE, "Polish", DEFAULT_TTL_DAYS).unwrap();
        store.remove(KEY_TARGET_LANGUAGE).unwrap();

        assert_eq!(store.get(KEY_TARGET_LANGUAGE), None);
    }
}
