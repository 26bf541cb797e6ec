//! Network-first request interception.
//!
//! This module implements the fetch policy: prefer a live network response,
//! fall back to the cache only when the network fails. The cache exists
//! purely as an offline safety net. An earlier cache-first design served
//! stale content after deploys; network-first is the deliberate opposite
//! tradeoff.

use std::sync::Arc;

use chrono::Utc;
use larder_core::{
    LarderError, LarderResult, NetworkError, Request, RequestIdentity, ResponseSnapshot,
    StoreName,
};
use larder_storage::CacheStorage;
use tracing::{debug, warn};

use crate::network::NetworkFetcher;

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Served by the live network.
    Network,
    /// Served from the cache store after a network failure.
    Cache,
}

/// An intercepted response and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub snapshot: ResponseSnapshot,
    pub source: FetchSource,
}

/// The request interceptor.
///
/// One instance serves the lifetime of its worker; any number of
/// `intercept` calls may be in flight concurrently, each an independent
/// task with no ordering between them.
pub struct RequestInterceptor<S, N> {
    storage: Arc<S>,
    network: Arc<N>,
    /// The store owned by the current deployment.
    store: StoreName,
    /// Cached root document served to offline navigations on a miss.
    navigation_fallback: RequestIdentity,
}

impl<S, N> RequestInterceptor<S, N>
where
    S: CacheStorage + 'static,
    N: NetworkFetcher,
{
    pub fn new(
        storage: Arc<S>,
        network: Arc<N>,
        store: StoreName,
        navigation_fallback_path: &str,
    ) -> Self {
        Self {
            storage,
            network,
            store,
            navigation_fallback: RequestIdentity::get(navigation_fallback_path),
        }
    }

    /// Apply the network-first policy to one request.
    ///
    /// Non-GET requests are forwarded untouched: never read from the store,
    /// never written to it, network errors returned as-is.
    pub async fn intercept(&self, request: &Request) -> LarderResult<FetchOutcome> {
        if !request.method().is_get() {
            let snapshot = self.network.fetch(request).await?;
            return Ok(FetchOutcome {
                snapshot,
                source: FetchSource::Network,
            });
        }

        match self.network.fetch(request).await {
            Ok(snapshot) => {
                if snapshot.is_cacheable() {
                    self.spawn_cache_write(request.identity.clone(), snapshot.clone());
                }
                Ok(FetchOutcome {
                    snapshot,
                    source: FetchSource::Network,
                })
            }
            Err(error) => {
                debug!(url = %request.url(), %error, "network fetch failed, falling back to cache");
                self.serve_from_cache(request, error).await
            }
        }
    }

    /// Offline fallback: the stored entry, or the root document for
    /// navigations, or the original network failure.
    async fn serve_from_cache(
        &self,
        request: &Request,
        network_error: NetworkError,
    ) -> LarderResult<FetchOutcome> {
        if let Some((snapshot, _)) = self.storage.get(&self.store, &request.identity).await? {
            debug!(url = %request.url(), "serving from cache");
            return Ok(FetchOutcome {
                snapshot,
                source: FetchSource::Cache,
            });
        }

        if request.kind.is_navigation() {
            if let Some((snapshot, _)) =
                self.storage.get(&self.store, &self.navigation_fallback).await?
            {
                debug!(url = %request.url(), "serving root document to offline navigation");
                return Ok(FetchOutcome {
                    snapshot,
                    source: FetchSource::Cache,
                });
            }
        }

        Err(LarderError::Network(network_error))
    }

    /// Store a copy of a successful response without blocking the caller.
    ///
    /// The task owns clones of the storage arc and the data, so it survives
    /// the caller being cancelled mid-flight. Failures are logged and
    /// swallowed; they must never affect the response already returned.
    fn spawn_cache_write(&self, identity: RequestIdentity, snapshot: ResponseSnapshot) {
        let storage = Arc::clone(&self.storage);
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(error) = storage.put(&store, &identity, &snapshot, Utc::now()).await {
                warn!(key = %identity, %error, "cache write failed");
            }
        });
    }
}
