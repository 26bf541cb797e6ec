//! In-memory cache storage.
//!
//! The reference implementation of [`CacheStorage`]: a nested map behind an
//! `RwLock`. Entries do not survive a restart, which is fine for tests and
//! for hosts that treat the cache as a warm-start optimization only.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_core::{LarderResult, RequestIdentity, ResponseSnapshot, StorageError, StoreName};

use crate::traits::{CacheStats, CacheStorage};

type Entries = HashMap<String, (ResponseSnapshot, DateTime<Utc>)>;

/// In-memory cache storage backend.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<HashMap<StoreName, Entries>>,
    stats: RwLock<CacheStats>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
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

    fn adjust_entry_count(&self, delta: i64) {
        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = if delta < 0 {
                stats.entry_count.saturating_sub(delta.unsigned_abs())
            } else {
                stats.entry_count + delta as u64
            };
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, store: &StoreName) -> LarderResult<()> {
        let mut stores = self.stores.write().map_err(|_| StorageError::LockPoisoned)?;
        stores.entry(store.clone()).or_default();
        Ok(())
    }

    async fn has(&self, store: &StoreName) -> LarderResult<bool> {
        let stores = self.stores.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(stores.contains_key(store))
    }

    async fn store_names(&self) -> LarderResult<Vec<StoreName>> {
        let stores = self.stores.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut names: Vec<StoreName> = stores.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_store(&self, store: &StoreName) -> LarderResult<bool> {
        let mut stores = self.stores.write().map_err(|_| StorageError::LockPoisoned)?;
        match stores.remove(store) {
            Some(entries) => {
                drop(stores);
                self.adjust_entry_count(-(entries.len() as i64));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
    ) -> LarderResult<Option<(ResponseSnapshot, DateTime<Utc>)>> {
        let stores = self.stores.read().map_err(|_| StorageError::LockPoisoned)?;
        let found = stores
            .get(store)
            .and_then(|entries| entries.get(&identity.key()))
            .cloned();
        drop(stores);
        if found.is_some() {
            self.record_hit();
        } else {
            self.record_miss();
        }
        Ok(found)
    }

    async fn put(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
        snapshot: &ResponseSnapshot,
        cached_at: DateTime<Utc>,
    ) -> LarderResult<()> {
        let mut stores = self.stores.write().map_err(|_| StorageError::LockPoisoned)?;
        let entries = stores.get_mut(store).ok_or(StorageError::StoreNotFound {
            name: store.clone(),
        })?;
        let is_new = entries
            .insert(identity.key(), (snapshot.clone(), cached_at))
            .is_none();
        drop(stores);
        if is_new {
            self.adjust_entry_count(1);
        }
        Ok(())
    }

    async fn keys(&self, store: &StoreName) -> LarderResult<Vec<String>> {
        let stores = self.stores.read().map_err(|_| StorageError::LockPoisoned)?;
        let entries = stores.get(store).ok_or(StorageError::StoreNotFound {
            name: store.clone(),
        })?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn stats(&self) -> LarderResult<CacheStats> {
        let stats = self.stats.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::LarderError;

    fn store() -> StoreName {
        StoreName::new("app-cache-v1.3.0")
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = MemoryCacheStorage::new();
        storage.open(&store()).await.unwrap();
        storage.open(&store()).await.unwrap();
        assert!(storage.has(&store()).await.unwrap());
        assert_eq!(storage.store_names().await.unwrap(), vec![store()]);
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let storage = MemoryCacheStorage::new();
        storage.open(&store()).await.unwrap();

        let identity = RequestIdentity::get("/index.html");
        let snapshot = ResponseSnapshot::ok(b"<html>".to_vec())
            .with_header("Content-Type", "text/html");
        let cached_at = Utc::now();
        storage
            .put(&store(), &identity, &snapshot, cached_at)
            .await
            .unwrap();

        let (found, found_at) = storage
            .get(&store(), &identity)
            .await
            .unwrap()
            .expect("entry should exist");
        assert_eq!(found, snapshot);
        assert_eq!(found_at, cached_at);
    }

    #[tokio::test]
    async fn test_put_overwrites_prior_entry() {
        let storage = MemoryCacheStorage::new();
        storage.open(&store()).await.unwrap();

        let identity = RequestIdentity::get("/app.css");
        storage
            .put(&store(), &identity, &ResponseSnapshot::ok(b"v1".to_vec()), Utc::now())
            .await
            .unwrap();
        storage
            .put(&store(), &identity, &ResponseSnapshot::ok(b"v2".to_vec()), Utc::now())
            .await
            .unwrap();

        let (found, _) = storage.get(&store(), &identity).await.unwrap().unwrap();
        assert_eq!(found.body, b"v2");
        assert_eq!(storage.keys(&store()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_into_unopened_store_fails() {
        let storage = MemoryCacheStorage::new();
        let err = storage
            .put(
                &store(),
                &RequestIdentity::get("/"),
                &ResponseSnapshot::ok(Vec::new()),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LarderError::Storage(StorageError::StoreNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_from_absent_store_is_a_miss() {
        let storage = MemoryCacheStorage::new();
        let found = storage
            .get(&store(), &RequestIdentity::get("/"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_store_removes_entries() {
        let storage = MemoryCacheStorage::new();
        let stale = StoreName::new("app-cache-v1.2.0");
        storage.open(&stale).await.unwrap();
        storage.open(&store()).await.unwrap();
        storage
            .put(&stale, &RequestIdentity::get("/"), &ResponseSnapshot::ok(b"old".to_vec()), Utc::now())
            .await
            .unwrap();

        assert!(storage.delete_store(&stale).await.unwrap());
        assert!(!storage.delete_store(&stale).await.unwrap());
        assert!(!storage.has(&stale).await.unwrap());
        assert_eq!(storage.store_names().await.unwrap(), vec![store()]);
    }

    #[tokio::test]
    async fn test_entries_are_method_scoped() {
        let storage = MemoryCacheStorage::new();
        storage.open(&store()).await.unwrap();
        storage
            .put(
                &store(),
                &RequestIdentity::get("/form"),
                &ResponseSnapshot::ok(b"page".to_vec()),
                Utc::now(),
            )
            .await
            .unwrap();

        let post = RequestIdentity::new(larder_core::Method::Post, "/form");
        assert!(storage.get(&store(), &post).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_track_hits_misses_and_entries() {
        let storage = MemoryCacheStorage::new();
        storage.open(&store()).await.unwrap();

        let identity = RequestIdentity::get("/logo.svg");
        let _ = storage.get(&store(), &identity).await.unwrap();
        storage
            .put(&store(), &identity, &ResponseSnapshot::ok(b"svg".to_vec()), Utc::now())
            .await
            .unwrap();
        let _ = storage.get(&store(), &identity).await.unwrap();
        let _ = storage.get(&store(), &identity).await.unwrap();

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 1);
    }
}
