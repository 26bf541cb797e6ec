//! Page client registry and takeover.
//!
//! Tracks the open page clients the hosting environment reports, and which
//! deployment version currently controls each. Activation claims every
//! registered client immediately instead of waiting for the next
//! navigation.

use std::collections::HashMap;

use larder_core::VersionId;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identifier for an open page client, assigned by the host.
pub type ClientId = Uuid;

/// Generate a new client id (UUIDv7, timestamp-sortable).
pub fn new_client_id() -> ClientId {
    Uuid::now_v7()
}

/// Registry of open page clients and their controlling version.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, Option<VersionId>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. New clients start uncontrolled.
    pub async fn register(&self, id: ClientId) {
        self.clients.write().await.entry(id).or_insert(None);
    }

    /// Remove a client (page unloaded). Returns whether it was known.
    pub async fn unregister(&self, id: ClientId) -> bool {
        self.clients.write().await.remove(&id).is_some()
    }

    /// Claim every registered client for `version`. Returns how many were
    /// claimed, including those already controlled by an older version.
    pub async fn claim_all(&self, version: &VersionId) -> usize {
        let mut clients = self.clients.write().await;
        for controller in clients.values_mut() {
            *controller = Some(version.clone());
        }
        clients.len()
    }

    /// Number of clients controlled by `version`.
    pub async fn controlled_by(&self, version: &VersionId) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|controller| controller.as_ref() == Some(version))
            .count()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}
