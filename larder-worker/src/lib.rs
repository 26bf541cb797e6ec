//! LARDER Worker - Offline Cache Lifecycle and Request Interception
//!
//! The worker is a background network proxy running independently of any
//! page: it pre-caches a static manifest at install, evicts stale store
//! versions at activation, and intercepts fetches with a network-first,
//! cache-fallback policy for as long as it lives.
//!
//! # Lifecycle
//!
//! ```text
//! Parsed -> Installing -> Waiting -> Activated -> Redundant
//! ```
//!
//! Install and activate each run exactly once per deployment version, in
//! that order. Fetch interception runs continuously once the worker exists;
//! concurrent fetches are independent tasks with no ordering between them.
//!
//! # Example
//!
//! ```ignore
//! use larder_core::{StaticManifest, VersionId, WorkerConfig};
//! use larder_storage::LmdbCacheStorage;
//! use larder_worker::{HttpFetcher, OfflineWorker};
//!
//! let manifest = StaticManifest::new(vec!["/".into(), "/index.html".into()])?;
//! let config = WorkerConfig::new(VersionId::new("v1.3.0"), "app-cache", manifest);
//! let storage = Arc::new(LmdbCacheStorage::new("/var/lib/larder", 100)?);
//! let network = Arc::new(HttpFetcher::new("https://example.com"));
//!
//! let worker = OfflineWorker::new(config, storage, network)?;
//! worker.on_install().await?;
//! worker.on_activate().await?;
//! let outcome = worker.on_fetch(&Request::navigation("/")).await?;
//! ```

pub mod clients;
pub mod interceptor;
pub mod lifecycle;
pub mod network;

pub use clients::{new_client_id, ClientId, ClientRegistry};
pub use interceptor::{FetchOutcome, FetchSource, RequestInterceptor};
pub use lifecycle::{ControlMessage, OfflineWorker};
pub use network::{HttpFetcher, NetworkFetcher};
