//! Worker lifecycle: install, activate, takeover.
//!
//! One `OfflineWorker` exists per deployment version. It is installed, then
//! activated, in that order, exactly once; both hooks are driven by the
//! hosting environment, which awaits each before proceeding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use larder_core::{
    ConfigError, LarderResult, LifecycleError, Request, StoreName, WorkerConfig, WorkerState,
};
use larder_storage::CacheStorage;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::clients::ClientRegistry;
use crate::interceptor::{FetchOutcome, RequestInterceptor};
use crate::network::NetworkFetcher;

/// Control message from the hosting environment.
///
/// The message channel is the only external command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Skip the wait for the previous controller to release its clients.
    SkipWaiting,
}

/// The offline cache worker: lifecycle controller plus request interceptor.
///
/// Generic over storage and network so it can run against fakes in tests
/// and real backends in production.
pub struct OfflineWorker<S, N> {
    config: WorkerConfig,
    storage: Arc<S>,
    network: Arc<N>,
    interceptor: RequestInterceptor<S, N>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients: ClientRegistry,
}

impl<S, N> OfflineWorker<S, N>
where
    S: CacheStorage + 'static,
    N: NetworkFetcher,
{
    pub fn new(config: WorkerConfig, storage: Arc<S>, network: Arc<N>) -> Result<Self, ConfigError> {
        config.validate()?;
        let interceptor = RequestInterceptor::new(
            Arc::clone(&storage),
            Arc::clone(&network),
            config.store_name(),
            &config.navigation_fallback,
        );
        Ok(Self {
            config,
            storage,
            network,
            interceptor,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients: ClientRegistry::new(),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Whether immediate takeover has been requested.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Advance the state machine, rejecting out-of-order transitions.
    async fn transition(&self, from: WorkerState, to: WorkerState) -> LarderResult<()> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(LifecycleError::InvalidTransition { from: *state, to }.into());
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    /// Install hook: pre-populate the versioned store from the static
    /// manifest.
    ///
    /// Population is all-or-nothing: if any entry fails to fetch with
    /// status 200 or fails to store, the partial store is dropped, the
    /// worker returns to `Parsed` so the host can retry, and the error is
    /// returned. On success the worker requests immediate takeover and
    /// moves to `Waiting`.
    pub async fn on_install(&self) -> LarderResult<()> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)
            .await?;

        let store = self.config.store_name();
        info!(store = %store, "installing");

        match self.populate_manifest(&store).await {
            Ok(count) => {
                info!(store = %store, entries = count, "static manifest cached");
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Waiting).await;
                Ok(())
            }
            Err(error) => {
                if let Err(cleanup) = self.storage.delete_store(&store).await {
                    warn!(store = %store, error = %cleanup, "failed to drop partial store");
                }
                self.set_state(WorkerState::Parsed).await;
                Err(error)
            }
        }
    }

    async fn populate_manifest(&self, store: &StoreName) -> LarderResult<usize> {
        self.storage.open(store).await?;

        let mut count = 0;
        for path in self.config.static_manifest.iter() {
            let request = Request::subresource(path);
            let snapshot = self.network.fetch(&request).await.map_err(|e| {
                LifecycleError::ManifestPopulation {
                    url: path.to_string(),
                    reason: e.to_string(),
                }
            })?;
            if !snapshot.is_cacheable() {
                return Err(LifecycleError::ManifestFetch {
                    url: path.to_string(),
                    status: snapshot.status,
                }
                .into());
            }
            self.storage
                .put(store, &request.identity, &snapshot, Utc::now())
                .await?;
            count += 1;
        }
        Ok(count)
    }

    /// Activate hook: evict every stale store, then take control of all
    /// open clients immediately.
    ///
    /// Stale-store deletion failures are logged and skipped; a leftover
    /// store wastes space but does not break correctness.
    pub async fn on_activate(&self) -> LarderResult<()> {
        self.transition(WorkerState::Waiting, WorkerState::Activated)
            .await?;

        let current = self.config.store_name();
        match self.storage.store_names().await {
            Ok(names) => {
                for name in names {
                    if name != current {
                        match self.storage.delete_store(&name).await {
                            Ok(_) => info!(store = %name, "deleted stale store"),
                            Err(error) => {
                                warn!(store = %name, %error, "failed to delete stale store")
                            }
                        }
                    }
                }
            }
            Err(error) => warn!(%error, "could not enumerate stores for eviction"),
        }

        let claimed = self.clients.claim_all(&self.config.version).await;
        info!(store = %current, clients = claimed, "activated");
        Ok(())
    }

    /// Message hook.
    pub async fn on_message(&self, message: ControlMessage) -> LarderResult<()> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    /// Fetch hook: delegate to the request interceptor.
    pub async fn on_fetch(&self, request: &Request) -> LarderResult<FetchOutcome> {
        self.interceptor.intercept(request).await
    }

    /// Mark this worker as superseded by a newer deployment.
    pub async fn retire(&self) {
        self.set_state(WorkerState::Redundant).await;
    }
}
