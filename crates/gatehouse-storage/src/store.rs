use crate::error::{StorageError, StorageResult};
use crate::models::UserRecord;
use gatehouse_core::constants::{DEFAULT_SNAPSHOT_PATH, SNAPSHOT_STAGING_SUFFIX};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Snapshot store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the JSON snapshot document
    pub snapshot_path: PathBuf,

    /// Whether to bootstrap an empty snapshot if the document doesn't exist
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration with the given snapshot path
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            ..Default::default()
        }
    }

    /// Set whether to bootstrap the snapshot if it doesn't exist
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// Durable home of the user record sequence
///
/// Implementations hold one complete snapshot. `load` returns a detached,
/// normalized copy of every record in stored order; `persist` replaces the
/// whole snapshot. Neither keeps a reference to records handed out.
pub trait SnapshotStore: Send + Sync {
    /// Read and normalize the snapshot, bootstrapping an empty one if absent.
    fn load(&self) -> impl Future<Output = StorageResult<Vec<UserRecord>>> + Send;

    /// Atomically replace the snapshot with `records`.
    fn persist(&self, records: &[UserRecord]) -> impl Future<Output = StorageResult<()>> + Send;
}

fn parse_snapshot(path: &Path, text: &str) -> StorageResult<Vec<UserRecord>> {
    serde_json::from_str(text).map_err(|source| StorageError::CorruptStore {
        path: path.to_path_buf(),
        source,
    })
}

/// Snapshot kept in a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    create_if_missing: bool,
}

impl JsonFileStore {
    /// Open the snapshot at the configured path
    ///
    /// This is the explicit ready step: the parent directory is created,
    /// an absent snapshot is bootstrapped, and an existing one must parse
    /// before the store is returned.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use gatehouse_storage::store::{JsonFileStore, StoreConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = JsonFileStore::open(StoreConfig::new("data/users.json")).await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `StorageError::CorruptStore` if the snapshot does not parse and
    /// `StorageError::Persistence` if it cannot be read or bootstrapped.
    pub async fn open(config: StoreConfig) -> StorageResult<Self> {
        let store = Self {
            path: config.snapshot_path,
            create_if_missing: config.create_if_missing,
        };

        let records = store.load().await?;
        info!(
            "Opened user snapshot {} ({} records)",
            store.path.display(),
            records.len()
        );

        Ok(store)
    }

    /// Path of the live snapshot
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".");
        staging.push(SNAPSHOT_STAGING_SUFFIX);
        PathBuf::from(staging)
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> StorageResult<Vec<UserRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => {
                warn!(
                    "User snapshot {} is empty, initializing it",
                    self.path.display()
                );
                self.persist(&[]).await?;
                Ok(Vec::new())
            }
            Ok(text) => parse_snapshot(&self.path, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.create_if_missing => {
                info!("Creating user snapshot at {}", self.path.display());
                self.persist(&[]).await?;
                Ok(Vec::new())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn persist(&self, records: &[UserRecord]) -> StorageResult<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(records)?;

        // Stage then rename so readers never see a partial document
        let staging = self.staging_path();
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(
            "Persisted {} user records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Snapshot held in memory (primarily for testing)
///
/// The snapshot is kept serialized so every load runs the same parse and
/// normalization path as the file store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a serialized snapshot
    pub fn with_snapshot(json: impl Into<String>) -> Self {
        Self {
            snapshot: Mutex::new(Some(json.into())),
        }
    }

    /// Current serialized snapshot, if one has been written
    pub async fn snapshot(&self) -> Option<String> {
        self.snapshot.lock().await.clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> StorageResult<Vec<UserRecord>> {
        let mut snapshot = self.snapshot.lock().await;
        match snapshot.as_deref() {
            Some(text) if !text.trim().is_empty() => parse_snapshot(Path::new(":memory:"), text),
            _ => {
                *snapshot = Some("[]".to_string());
                Ok(Vec::new())
            }
        }
    }

    async fn persist(&self, records: &[UserRecord]) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(records)?;
        *self.snapshot.lock().await = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gatehouse_core::{Role, UserId};
    use tempfile::TempDir;

    fn create_test_record(id: u64, username: &str) -> UserRecord {
        UserRecord {
            id: UserId::new(id),
            username: username.to_string(),
            email: format!("{username}@x.com"),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            phone: "555".to_string(),
            department: "ops".to_string(),
            role: Role::Gatekeeper,
            id_card_marker: crate::crypto::empty_card_marker(),
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::new("test.json").create_if_missing(false);

        assert_eq!(config.snapshot_path, PathBuf::from("test.json"));
        assert!(!config.create_if_missing);
    }

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();

        assert_eq!(config.snapshot_path, PathBuf::from("data/users.json"));
        assert!(config.create_if_missing);
    }

    #[tokio::test]
    async fn test_open_bootstraps_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("users.json");

        let store = JsonFileStore::open(StoreConfig::new(&path)).await.unwrap();

        assert_eq!(store.path(), path);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "[]");
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_without_create_fails_on_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let result = JsonFileStore::open(StoreConfig::new(&path).create_if_missing(false)).await;

        assert!(matches!(result, Err(StorageError::Persistence { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_file_is_reinitialized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "  \n").unwrap();

        let store = JsonFileStore::open(StoreConfig::new(&path)).await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileStore::open(StoreConfig::new(&path)).await;

        assert!(matches!(result, Err(StorageError::CorruptStore { .. })));
        // The broken document is left alone for inspection
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_snapshot_with_wrong_shape_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"{"users": []}"#).unwrap();

        let result = JsonFileStore::open(StoreConfig::new(&path)).await;
        assert!(matches!(result, Err(StorageError::CorruptStore { .. })));
    }

    #[tokio::test]
    async fn test_persist_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(StoreConfig::new(dir.path().join("users.json")))
            .await
            .unwrap();

        let records = vec![
            create_test_record(2, "bob"),
            create_test_record(1, "alice"),
            create_test_record(7, "carol"),
        ];
        store.persist(&records).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn test_persist_is_pretty_and_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let store = JsonFileStore::open(StoreConfig::new(&path)).await.unwrap();

        store
            .persist(&[create_test_record(1, "alice")])
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  {"));
        assert!(text.contains("\"passwordHash\""));
        assert!(!dir.path().join("users.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_memory_store_bootstrap_and_round_trip() {
        let store = MemorySnapshotStore::new();
        assert!(store.snapshot().await.is_none());

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.snapshot().await.as_deref(), Some("[]"));

        let records = vec![create_test_record(1, "alice")];
        store.persist(&records).await.unwrap();
        assert_eq!(store.load().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_memory_store_corrupt_snapshot() {
        let store = MemorySnapshotStore::with_snapshot("[{]");
        assert!(matches!(
            store.load().await,
            Err(StorageError::CorruptStore { .. })
        ));
    }
}
