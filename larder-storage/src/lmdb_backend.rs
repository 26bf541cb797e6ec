//! LMDB-backed cache storage.
//!
//! Uses the heed crate (Rust bindings for LMDB) to persist cached responses
//! across restarts, which is what makes the offline guarantee hold after
//! the hosting process goes away and comes back.
//!
//! # Layout
//!
//! One flat database holds every store. Keys are store-scoped (see
//! [`crate::key`]): a prefix scan over a store name visits exactly that
//! store's marker and entries. Values are `[8-byte LE millis][JSON snapshot]`.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses read transactions for
//! `get` and write transactions for `open`, `put`, and `delete_store`.

use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use larder_core::{
    LarderError, LarderResult, RequestIdentity, ResponseSnapshot, StorageError, StoreName,
};

use crate::key::{decode_entry_key, decode_store_name, store_prefix, StoreScopedKey};
use crate::traits::{CacheStats, CacheStorage};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStorageError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStorageError> for LarderError {
    fn from(e: LmdbStorageError) -> Self {
        LarderError::Storage(StorageError::Backend {
            reason: e.to_string(),
        })
    }
}

/// LMDB-backed cache storage.
///
/// # Example
///
/// ```ignore
/// use larder_storage::LmdbCacheStorage;
///
/// let storage = LmdbCacheStorage::new("/var/lib/larder", 100)?;
/// storage.open(&config.store_name()).await?;
/// ```
pub struct LmdbCacheStorage {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    /// Global statistics.
    stats: Arc<RwLock<CacheStats>>,
}

impl LmdbCacheStorage {
    /// Create a new LMDB cache storage backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the LMDB
    /// environment cannot be opened, or the database cannot be created.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStorageError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStorageError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStorageError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }

    /// Raw lookup without statistics bookkeeping.
    fn raw_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LmdbStorageError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;
        let found = self
            .db
            .get(&rtxn, key)
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?
            .map(|bytes| bytes.to_vec());
        Ok(found)
    }

    /// Iterate over keys matching a prefix and collect them.
    fn collect_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, LmdbStorageError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        for result in iter {
            match result {
                Ok((key, _)) => {
                    if key.len() >= prefix.len() && &key[0..prefix.len()] == prefix {
                        keys.push(key.to_vec());
                    }
                }
                Err(_) => continue,
            }
        }

        Ok(keys)
    }

    fn encode_value(
        snapshot: &ResponseSnapshot,
        cached_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, LmdbStorageError> {
        let timestamp_bytes = cached_at.timestamp_millis().to_le_bytes();
        let snapshot_bytes = serde_json::to_vec(snapshot)
            .map_err(|e| LmdbStorageError::Serialization(e.to_string()))?;

        let mut full_bytes = Vec::with_capacity(8 + snapshot_bytes.len());
        full_bytes.extend_from_slice(&timestamp_bytes);
        full_bytes.extend_from_slice(&snapshot_bytes);
        Ok(full_bytes)
    }

    fn decode_value(
        bytes: &[u8],
    ) -> Result<(ResponseSnapshot, DateTime<Utc>), LmdbStorageError> {
        if bytes.len() < 8 {
            return Err(LmdbStorageError::Deserialization(
                "value shorter than timestamp header".to_string(),
            ));
        }
        let timestamp_bytes: [u8; 8] = bytes[0..8]
            .try_into()
            .map_err(|_| LmdbStorageError::Deserialization("invalid timestamp".to_string()))?;
        let timestamp_millis = i64::from_le_bytes(timestamp_bytes);
        let cached_at = DateTime::from_timestamp_millis(timestamp_millis).unwrap_or_else(Utc::now);

        let snapshot: ResponseSnapshot = serde_json::from_slice(&bytes[8..])
            .map_err(|e| LmdbStorageError::Deserialization(e.to_string()))?;
        Ok((snapshot, cached_at))
    }
}

#[async_trait]
impl CacheStorage for LmdbCacheStorage {
    async fn open(&self, store: &StoreName) -> LarderResult<()> {
        let marker = StoreScopedKey::marker(store).encode();
        if self.raw_get(&marker)?.is_some() {
            return Ok(());
        }

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;
        self.db
            .put(&mut wtxn, marker.as_slice(), &[])
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn has(&self, store: &StoreName) -> LarderResult<bool> {
        let marker = StoreScopedKey::marker(store).encode();
        Ok(self.raw_get(&marker)?.is_some())
    }

    async fn store_names(&self) -> LarderResult<Vec<StoreName>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        let mut names = std::collections::BTreeSet::new();
        for result in iter {
            if let Ok((key, _)) = result {
                if let Some(name) = decode_store_name(key) {
                    names.insert(name);
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    async fn delete_store(&self, store: &StoreName) -> LarderResult<bool> {
        let prefix = store_prefix(store);
        let keys_to_delete = self.collect_keys_with_prefix(&prefix)?;
        if keys_to_delete.is_empty() {
            return Ok(false);
        }

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        let mut entries_deleted = 0u64;
        for key in &keys_to_delete {
            if self.db.delete(&mut wtxn, key).unwrap_or(false)
                && decode_entry_key(key).is_some()
            {
                entries_deleted += 1;
            }
        }

        wtxn.commit()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = stats.entry_count.saturating_sub(entries_deleted);
        }

        Ok(true)
    }

    async fn get(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
    ) -> LarderResult<Option<(ResponseSnapshot, DateTime<Utc>)>> {
        let key = StoreScopedKey::entry(store, identity).encode();
        match self.raw_get(&key) {
            Ok(Some(bytes)) => {
                self.record_hit();
                let decoded = Self::decode_value(&bytes)?;
                Ok(Some(decoded))
            }
            Ok(None) => {
                self.record_miss();
                Ok(None)
            }
            Err(e) => {
                self.record_miss();
                Err(e.into())
            }
        }
    }

    async fn put(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
        snapshot: &ResponseSnapshot,
        cached_at: DateTime<Utc>,
    ) -> LarderResult<()> {
        let marker = StoreScopedKey::marker(store).encode();
        if self.raw_get(&marker)?.is_none() {
            return Err(StorageError::StoreNotFound {
                name: store.clone(),
            }
            .into());
        }

        let key = StoreScopedKey::entry(store, identity).encode();
        let value = Self::encode_value(snapshot, cached_at)?;
        let is_new = self.raw_get(&key)?.is_none();

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;
        self.db
            .put(&mut wtxn, key.as_slice(), value.as_slice())
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStorageError::Transaction(e.to_string()))?;

        if is_new {
            if let Ok(mut stats) = self.stats.write() {
                stats.entry_count += 1;
            }
        }

        Ok(())
    }

    async fn keys(&self, store: &StoreName) -> LarderResult<Vec<String>> {
        let marker = StoreScopedKey::marker(store).encode();
        if self.raw_get(&marker)?.is_none() {
            return Err(StorageError::StoreNotFound {
                name: store.clone(),
            }
            .into());
        }

        let prefix = store_prefix(store);
        let raw_keys = self.collect_keys_with_prefix(&prefix)?;
        let mut keys: Vec<String> = raw_keys
            .iter()
            .filter_map(|key| decode_entry_key(key))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn stats(&self) -> LarderResult<CacheStats> {
        Ok(self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default())
    }
}
