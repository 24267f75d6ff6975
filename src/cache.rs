//! Local cache of assembled user records.
//!
//! Each user has at most one entry, `<cache_dir>/<user_id>.json`, holding a
//! versioned JSON snapshot of the whole record. Entries are only ever
//! replaced wholesale: a refresh rebuilds the record from the remote store
//! and overwrites the entry.

use crate::directory::UserDirectory;
use crate::error::CacheError;
use crate::model::{assemble_user, UserRecord};
use crate::remote::RemoteStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Version of the on-disk entry format.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// On-disk envelope for a cached record.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    format_version: u32,
    saved_at: DateTime<Utc>,
    user: UserRecord,
}

/// Result of fetching several users.
#[derive(Debug, Default)]
pub struct FetchMany {
    /// Records found, keyed by user id
    pub found: BTreeMap<String, UserRecord>,
    /// Ids that are neither cached nor known to the directory
    pub not_found: Vec<String>,
}

/// Cache of user records backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
    directory: UserDirectory,
}

impl LocalCache {
    /// Create a cache rooted at `dir`, validating ids against `directory`.
    pub fn new(dir: impl Into<PathBuf>, directory: UserDirectory) -> Self {
        Self {
            dir: dir.into(),
            directory,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    /// Replace the known-user directory.
    pub fn set_directory(&mut self, directory: UserDirectory) {
        self.directory = directory;
    }

    /// Path of the entry for `user_id`.
    ///
    /// Ids that could name a file outside the cache directory are rejected.
    pub fn entry_path(&self, user_id: &str) -> Result<PathBuf, CacheError> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{user_id}.json")))
    }

    /// Whether an entry exists for `user_id`.
    pub fn contains(&self, user_id: &str) -> bool {
        self.entry_path(user_id)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Create the cache directory if needed.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Get a user record, from the cache when possible.
    ///
    /// Returns `Ok(None)` when the user is neither cached nor known to the
    /// directory. A cached entry that cannot be read is an error; it is
    /// never silently replaced by a remote fetch.
    pub fn fetch<S: RemoteStore + ?Sized>(
        &self,
        store: &S,
        user_id: &str,
        force_reload: bool,
    ) -> Result<Option<UserRecord>, CacheError> {
        validate_user_id(user_id)?;
        self.ensure_dir()?;

        if !force_reload && self.contains(user_id) {
            tracing::debug!(user_id, "serving user from cache");
            return self.load(user_id).map(Some);
        }

        if !self.directory.contains(user_id) {
            tracing::warn!(user_id, "user does not exist in the database");
            return Ok(None);
        }

        let user = assemble_user(store, user_id)?;
        self.store(&user, true)?;
        Ok(Some(user))
    }

    /// Get several user records.
    pub fn fetch_many<S, I, T>(
        &self,
        store: &S,
        user_ids: I,
        force_reload: bool,
    ) -> Result<FetchMany, CacheError>
    where
        S: RemoteStore + ?Sized,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut result = FetchMany::default();
        for id in user_ids {
            let id = id.as_ref();
            match self.fetch(store, id, force_reload)? {
                Some(user) => {
                    result.found.insert(id.to_string(), user);
                }
                None => result.not_found.push(id.to_string()),
            }
        }
        Ok(result)
    }

    /// Write `user` to its entry.
    ///
    /// With `overwrite` false an existing entry is left untouched.
    pub fn store(&self, user: &UserRecord, overwrite: bool) -> Result<(), CacheError> {
        let path = self.entry_path(&user.user_id)?;
        self.ensure_dir()?;

        if !overwrite && path.exists() {
            tracing::warn!(user_id = %user.user_id, "cache entry exists, skipping write");
            return Ok(());
        }

        let entry = CacheEntry {
            format_version: CACHE_FORMAT_VERSION,
            saved_at: Utc::now(),
            user: user.clone(),
        };
        let json = serde_json::to_vec(&entry).map_err(std::io::Error::other)?;

        // Write beside the target, then rename over it
        let tmp = self.dir.join(format!(".{}.json.tmp", user.user_id));
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!(user_id = %user.user_id, path = ?path, "stored user in cache");
        Ok(())
    }

    /// Read the cached entry for `user_id`.
    pub fn load(&self, user_id: &str) -> Result<UserRecord, CacheError> {
        let path = self.entry_path(user_id)?;
        let corrupt = |reason: String| CacheError::Corrupt {
            user_id: user_id.to_string(),
            reason,
        };

        let content = std::fs::read(&path).map_err(|e| corrupt(e.to_string()))?;
        let entry: CacheEntry =
            serde_json::from_slice(&content).map_err(|e| corrupt(e.to_string()))?;

        if entry.format_version != CACHE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                entry.format_version
            )));
        }
        if entry.user.user_id != user_id {
            return Err(corrupt(format!(
                "entry belongs to '{}'",
                entry.user.user_id
            )));
        }

        Ok(entry.user)
    }
}

/// Accept ids that are a single plain path component.
///
/// Remote keys never contain `.`, `$`, `#`, `[`, `]` or `/`, so these are
/// rejected along with `\`, control characters and the empty id.
fn validate_user_id(user_id: &str) -> Result<(), CacheError> {
    let invalid = user_id.is_empty()
        || user_id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '.' | '$' | '#' | '[' | ']') || c.is_control());
    if invalid {
        return Err(CacheError::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DateKey;
    use crate::model::{AccelData, Channel, Events, HeartData, ProfileRecord, SessionRecord};
    use crate::remote::JsonTreeStore;
    use tempfile::TempDir;

    fn user(id: &str) -> UserRecord {
        UserRecord {
            user_id: id.to_string(),
            profile: ProfileRecord {
                gender: "M".to_string(),
                ..Default::default()
            },
            events: Events::default(),
            sessions: BTreeMap::new(),
            dates: Vec::new(),
        }
    }

    #[test]
    fn test_entry_path() {
        let cache = LocalCache::new("/tmp/Users", UserDirectory::default());
        assert_eq!(
            cache.entry_path("SM36").unwrap(),
            PathBuf::from("/tmp/Users/SM36.json")
        );
    }

    #[test]
    fn test_ids_outside_the_cache_dir_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().join("Users"), UserDirectory::from_ids(["SM1"]));
        std::fs::write(tmp.path().join("x.json"), b"{}").unwrap();
        let store = JsonTreeStore::default();

        for id in ["../x", "a/b", "..", "", "SM1.json", "a\\b"] {
            assert!(
                matches!(cache.entry_path(id), Err(CacheError::InvalidUserId(_))),
                "{id:?}"
            );
            assert!(!cache.contains(id));
            assert!(matches!(
                cache.fetch(&store, id, false),
                Err(CacheError::InvalidUserId(_))
            ));
            assert!(matches!(cache.load(id), Err(CacheError::InvalidUserId(_))));
        }

        assert!(matches!(
            cache.store(&user("../escaped"), true),
            Err(CacheError::InvalidUserId(_))
        ));
        assert!(!tmp.path().join("escaped.json").exists());
        assert!(store.reads().is_empty());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path(), UserDirectory::default());
        // A non-empty directory where the entry should go
        let entry = cache.entry_path("SM1").unwrap();
        std::fs::create_dir_all(entry.join("blocker")).unwrap();

        assert!(matches!(cache.store(&user("SM1"), true), Err(CacheError::Io(_))));
        assert!(!tmp.path().join(".SM1.json.tmp").exists());
    }

    #[test]
    fn test_computed_floats_survive_the_cache_bit_for_bit() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path(), UserDirectory::default());

        let times: Vec<f64> = (0..2000).map(|i| 0.1 * i as f64).collect();
        let rates: Vec<f64> = (0..2000)
            .map(|i| 60.0 + 60.0 * ((i as f64 * 0.7316).sin() * 0.5 + 0.5))
            .collect();
        let beats: Vec<f64> = rates.iter().map(|hr| 60.0 / hr).collect();

        let mut original = user("SM1");
        original.profile.height_m = 1.0 / 3.0;
        let date = DateKey::parse("010124080000").unwrap();
        original.sessions.insert(
            date.clone(),
            SessionRecord {
                accel_sampling_freq: 50.0,
                duration_seconds: 199.9,
                accel_data: Channel::Present(
                    AccelData::new(beats.clone(), times.clone(), rates.clone()).unwrap(),
                ),
                heart_data: Channel::Present(HeartData::new(times, rates).unwrap()),
            },
        );
        original.dates.push(date);

        cache.store(&original, true).unwrap();
        let loaded = cache.load("SM1").unwrap();
        assert_eq!(loaded, original);

        let bits = |u: &UserRecord| -> Vec<u64> {
            let session = u.sessions.values().next().unwrap();
            let accel = session.accel_data.as_present().unwrap();
            let heart = session.heart_data.as_present().unwrap();
            accel
                .x()
                .iter()
                .chain(accel.y())
                .chain(heart.heart_rate())
                .map(|v| v.to_bits())
                .collect()
        };
        assert_eq!(bits(&loaded), bits(&original));
        assert_eq!(loaded.profile.height_m.to_bits(), (1.0f64 / 3.0).to_bits());
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().join("a").join("Users"), UserDirectory::default());
        cache.ensure_dir().unwrap();
        cache.ensure_dir().unwrap();
        assert!(cache.dir().is_dir());
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path(), UserDirectory::from_ids(["SM1"]));
        let store = JsonTreeStore::default();

        assert!(cache.fetch(&store, "SM2", false).unwrap().is_none());
        assert!(store.reads().is_empty());
    }

    #[test]
    fn test_store_without_overwrite_keeps_bytes() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path(), UserDirectory::default());

        cache.store(&user("SM1"), true).unwrap();
        let before = std::fs::read(cache.entry_path("SM1").unwrap()).unwrap();

        let mut changed = user("SM1");
        changed.profile.gender = "F".to_string();
        cache.store(&changed, false).unwrap();

        let after = std::fs::read(cache.entry_path("SM1").unwrap()).unwrap();
        assert_eq!(before, after);
        assert_eq!(cache.load("SM1").unwrap().profile.gender, "M");

        cache.store(&changed, true).unwrap();
        assert_eq!(cache.load("SM1").unwrap().profile.gender, "F");
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path(), UserDirectory::from_ids(["SM1"]));
        cache.ensure_dir().unwrap();
        std::fs::write(cache.entry_path("SM1").unwrap(), b"not json").unwrap();

        let store = JsonTreeStore::default();
        let err = cache.fetch(&store, "SM1", false).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { ref user_id, .. } if user_id == "SM1"));
        // No fallback to the remote store
        assert!(store.reads().is_empty());
    }

    #[test]
    fn test_unsupported_version_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path(), UserDirectory::default());
        cache.store(&user("SM1"), true).unwrap();

        let path = cache.entry_path("SM1").unwrap();
        let mut value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        value["format_version"] = serde_json::json!(99);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(matches!(
            cache.load("SM1"),
            Err(CacheError::Corrupt { ref reason, .. }) if reason.contains("99")
        ));
    }
}
