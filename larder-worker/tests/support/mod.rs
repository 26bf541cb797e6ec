//! Shared fixtures for worker integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_core::{
    LarderResult, NetworkError, Request, RequestIdentity, ResponseSnapshot, StaticManifest,
    StorageError, StoreName, VersionId, WorkerConfig,
};
use larder_storage::{CacheStats, CacheStorage, MemoryCacheStorage};
use larder_worker::{NetworkFetcher, OfflineWorker};

/// Scripted network: URL -> snapshot routes plus a global offline switch.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, ResponseSnapshot>>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, snapshot: ResponseSnapshot) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), snapshot);
    }

    pub fn unroute(&self, url: &str) {
        self.routes.lock().unwrap().remove(url);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkFetcher for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, NetworkError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::RequestFailed {
                url: request.url().to_string(),
                reason: "offline".to_string(),
            });
        }
        self.routes
            .lock()
            .unwrap()
            .get(request.url())
            .cloned()
            .ok_or_else(|| NetworkError::RequestFailed {
                url: request.url().to_string(),
                reason: "connection refused".to_string(),
            })
    }
}

/// Storage wrapper whose reads or writes can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryCacheStorage,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryCacheStorage {
        &self.inner
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, store: &StoreName) -> LarderResult<()> {
        self.inner.open(store).await
    }

    async fn has(&self, store: &StoreName) -> LarderResult<bool> {
        self.inner.has(store).await
    }

    async fn store_names(&self) -> LarderResult<Vec<StoreName>> {
        self.inner.store_names().await
    }

    async fn delete_store(&self, store: &StoreName) -> LarderResult<bool> {
        self.inner.delete_store(store).await
    }

    async fn get(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
    ) -> LarderResult<Option<(ResponseSnapshot, DateTime<Utc>)>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                reason: "simulated read failure".to_string(),
            }
            .into());
        }
        self.inner.get(store, identity).await
    }

    async fn put(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
        snapshot: &ResponseSnapshot,
        cached_at: DateTime<Utc>,
    ) -> LarderResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                reason: "simulated write failure".to_string(),
            }
            .into());
        }
        self.inner.put(store, identity, snapshot, cached_at).await
    }

    async fn keys(&self, store: &StoreName) -> LarderResult<Vec<String>> {
        self.inner.keys(store).await
    }

    async fn stats(&self) -> LarderResult<CacheStats> {
        self.inner.stats().await
    }
}

pub const MANIFEST_PATHS: [&str; 3] = ["/", "/index.html", "/app.css"];

pub fn manifest() -> StaticManifest {
    StaticManifest::new(MANIFEST_PATHS.iter().map(|p| p.to_string()).collect()).unwrap()
}

pub fn config(version: &str) -> WorkerConfig {
    WorkerConfig::new(VersionId::new(version), "app-cache", manifest())
}

/// A 200 HTML snapshot.
pub fn html(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::ok(body.as_bytes().to_vec()).with_header("Content-Type", "text/html")
}

/// Route every manifest path so an install can succeed.
pub fn route_manifest(network: &FakeNetwork) {
    for path in MANIFEST_PATHS {
        network.route(path, html(&format!("content of {}", path)));
    }
}

pub fn make_worker(
    version: &str,
    storage: Arc<MemoryCacheStorage>,
    network: Arc<FakeNetwork>,
) -> OfflineWorker<MemoryCacheStorage, FakeNetwork> {
    OfflineWorker::new(config(version), storage, network).unwrap()
}

/// Poll until the detached cache write lands or the budget runs out.
pub async fn wait_for_entry<S: CacheStorage>(
    storage: &S,
    store: &StoreName,
    identity: &RequestIdentity,
) -> bool {
    for _ in 0..100 {
        if storage.get(store, identity).await.unwrap().is_some() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    false
}

/// Give any in-flight detached writes a chance to run.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
