//! Persistence for task collections.
//!
//! Each user's collection is a single record under the key
//! `todos_<user>`, holding the whole task list as a JSON array. There is no
//! partial update: every save rewrites the record.
//!
//! # Layout (file backend)
//!
//! ```text
//! <data_dir>/
//!   config.toml                 # Optional configuration
//!   session.json                # Active identity (see `session`)
//!   store/
//!     todos_guest.json          # Guest collection
//!     todos_guest.json.lock     # Writer lock for the record above
//!     todos_01j9....json        # One record per signed-in user
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::Task;

/// Prefix for per-user task records
pub const TASKS_KEY_PREFIX: &str = "todos_";

/// Directory under the data dir that holds records
pub const STORE_DIR: &str = "store";

/// Storage key for a user's task collection
pub fn storage_key(user: &str) -> String {
    format!("{TASKS_KEY_PREFIX}{user}")
}

/// Reject keys that cannot be used as a single file name.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("storage key cannot be empty".to_string()));
    }
    if key.starts_with('.') {
        return Err(Error::InvalidArgument(format!(
            "storage key cannot start with '.': {key}"
        )));
    }
    if let Some(ch) = key
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-' | '@')))
    {
        return Err(Error::InvalidArgument(format!(
            "storage key '{key}' contains unsupported character '{ch}'"
        )));
    }
    Ok(())
}

/// String key-value storage, the only thing the gateway needs from a backend.
pub trait KeyValueStore: fmt::Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// File store rooted at `<data_dir>/store`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STORE_DIR))
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `key`
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        lock::read_locked(&path, self.lock_timeout_ms)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        lock::write_atomic_locked(self.record_path(key), value.as_bytes(), self.lock_timeout_ms)
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.record_path(key);
        let _lock = lock::FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

/// Volatile store. `set_unavailable(true)` makes every call fail, which is
/// how tests exercise the storage-fault paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("memory store offline".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| Error::StorageUnavailable("memory store poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Reads and writes whole task collections for a user.
///
/// Errors are returned to the caller; the task store decides that they are
/// logged rather than propagated.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    backend: Arc<dyn KeyValueStore>,
}

impl PersistenceGateway {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Load `user`'s collection; `Ok(None)` on first run.
    ///
    /// Records are normalized on the way in so `completedAt` is present
    /// exactly when `completed` is true.
    pub fn load(&self, user: &str) -> Result<Option<Vec<Task>>> {
        let key = storage_key(user);
        let Some(raw) = self.backend.get(&key)? else {
            tracing::debug!(%key, "no stored tasks");
            return Ok(None);
        };

        let mut tasks: Vec<Task> = serde_json::from_str(&raw)?;
        let repaired = tasks
            .iter_mut()
            .map(Task::normalize)
            .filter(|changed| *changed)
            .count();
        if repaired > 0 {
            tracing::debug!(%key, repaired, "normalized stored tasks");
        }
        tracing::debug!(%key, count = tasks.len(), "loaded tasks");
        Ok(Some(tasks))
    }

    /// Overwrite `user`'s record with the full collection.
    pub fn save(&self, user: &str, tasks: &[Task]) -> Result<()> {
        let key = storage_key(user);
        let json = serde_json::to_string(tasks)?;
        self.backend.set(&key, &json)?;
        tracing::debug!(%key, count = tasks.len(), "saved tasks");
        Ok(())
    }

    /// Drop `user`'s record entirely.
    pub fn clear(&self, user: &str) -> Result<()> {
        self.backend.remove(&storage_key(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_tasks() -> Vec<Task> {
        let created = Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0).unwrap();
        let mut done = Task::new("01a", "Buy milk", Category::Shopping, created).unwrap();
        done.toggle(created + chrono::Duration::milliseconds(1_234));
        let open = Task::new("01b", "Write report", Category::Work, created).unwrap();
        vec![done, open]
    }

    #[test]
    fn storage_key_format() {
        assert_eq!(storage_key("guest"), "todos_guest");
        assert_eq!(storage_key("01j9xyz"), "todos_01j9xyz");
    }

    #[test]
    fn validate_key_rejects_paths() {
        assert!(validate_key("todos_guest").is_ok());
        assert!(validate_key("todos_a@b.com").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key("todos_a/b").is_err());
        assert!(validate_key(".hidden").is_err());
    }

    #[test]
    fn file_store_paths() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::in_data_dir(temp.path());
        assert_eq!(store.root(), temp.path().join("store"));
        assert_eq!(
            store.record_path("todos_guest"),
            temp.path().join("store/todos_guest.json")
        );
    }

    #[test]
    fn file_store_get_set_remove() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("store"));

        assert!(store.get("todos_guest").unwrap().is_none());
        store.set("todos_guest", "[]").unwrap();
        assert_eq!(store.get("todos_guest").unwrap().as_deref(), Some("[]"));

        store.remove("todos_guest").unwrap();
        assert!(store.get("todos_guest").unwrap().is_none());
        store.remove("todos_guest").unwrap();
    }

    #[test]
    fn file_store_honours_lock_timeout() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("store")).with_lock_timeout(50);
        let record = store.record_path("todos_guest");

        let _held = lock::FileLock::acquire(lock::lock_path_for(&record), 1000).unwrap();
        assert!(matches!(
            store.set("todos_guest", "[]"),
            Err(Error::LockFailed(_))
        ));
        assert!(matches!(store.get("todos_guest"), Ok(None)));
    }

    #[test]
    fn memory_store_unavailable_fails_every_call() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        store.set_unavailable(true);
        assert!(matches!(store.get("k"), Err(Error::StorageUnavailable(_))));
        assert!(store.set("k", "w").is_err());
        store.set_unavailable(false);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn gateway_round_trip_preserves_all_fields() {
        let temp = TempDir::new().unwrap();
        let gateway = PersistenceGateway::new(Arc::new(FileStore::in_data_dir(temp.path())));
        let tasks = sample_tasks();

        gateway.save("guest", &tasks).unwrap();
        let loaded = gateway.load("guest").unwrap().unwrap();
        assert_eq!(loaded, tasks);
        assert_eq!(loaded[0].completed_at, tasks[0].completed_at);
    }

    #[test]
    fn gateway_load_missing_is_none() {
        let gateway = PersistenceGateway::in_memory();
        assert!(gateway.load("nobody").unwrap().is_none());
    }

    #[test]
    fn gateway_users_are_partitioned() {
        let gateway = PersistenceGateway::in_memory();
        gateway.save("alice", &sample_tasks()).unwrap();
        gateway.save("guest", &[]).unwrap();

        assert_eq!(gateway.load("alice").unwrap().unwrap().len(), 2);
        assert!(gateway.load("guest").unwrap().unwrap().is_empty());

        gateway.clear("alice").unwrap();
        assert!(gateway.load("alice").unwrap().is_none());
    }

    #[test]
    fn gateway_load_corrupt_record_is_json_error() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("todos_guest", "{not json").unwrap();
        let gateway = PersistenceGateway::new(backend);
        assert!(matches!(gateway.load("guest"), Err(Error::Json(_))));
    }

    #[test]
    fn gateway_load_normalizes_legacy_records() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .set(
                "todos_guest",
                r#"[{"id":"1","text":"Old","completed":true,"createdAt":"2025-01-01T00:00:00.000Z"}]"#,
            )
            .unwrap();
        let gateway = PersistenceGateway::new(backend);

        let tasks = gateway.load("guest").unwrap().unwrap();
        assert_eq!(tasks[0].category, Category::Others);
        assert_eq!(tasks[0].completed_at, Some(tasks[0].created_at));
    }
}
