//! LARDER Core - Offline Cache Data Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no storage or network logic.

pub mod config;
pub mod error;

pub use config::WorkerConfig;
pub use error::{
    ConfigError, LarderError, LarderResult, LifecycleError, NetworkError, StorageError,
};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// REQUEST IDENTITY
// ============================================================================

/// HTTP method of an intercepted request.
///
/// Only `Get` participates in caching; every other method is forwarded to
/// the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    /// Whether this method is eligible for cache interception.
    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized request identity: method plus URL.
///
/// This is the key under which responses are stored. Two requests with the
/// same identity are interchangeable from the cache's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestIdentity {
    pub method: Method,
    pub url: String,
}

impl RequestIdentity {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Shorthand for a GET identity, the common case.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Stable string form used by storage backends as the entry key.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Whether a request is a top-level page load or a subresource fetch.
///
/// Navigations get the root-document fallback when offline; subresources
/// fail outright on a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Navigation,
    Subresource,
}

impl RequestKind {
    pub fn is_navigation(&self) -> bool {
        matches!(self, RequestKind::Navigation)
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub identity: RequestIdentity,
    pub kind: RequestKind,
}

impl Request {
    pub fn new(identity: RequestIdentity, kind: RequestKind) -> Self {
        Self { identity, kind }
    }

    /// A top-level page load for `url`.
    pub fn navigation(url: impl Into<String>) -> Self {
        Self::new(RequestIdentity::get(url), RequestKind::Navigation)
    }

    /// A subresource fetch (image, script, stylesheet) for `url`.
    pub fn subresource(url: impl Into<String>) -> Self {
        Self::new(RequestIdentity::get(url), RequestKind::Subresource)
    }

    pub fn url(&self) -> &str {
        &self.identity.url
    }

    pub fn method(&self) -> Method {
        self.identity.method
    }
}

// ============================================================================
// RESPONSE SNAPSHOT
// ============================================================================

/// A stored response: status, headers, and body.
///
/// Snapshots are what the cache holds and what the interceptor returns.
/// Only snapshots with status exactly 200 are ever written to a store;
/// that policy lives in the worker, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A 200 response with no headers.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, Vec::new(), body.into())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the interceptor may store this snapshot.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

// ============================================================================
// VERSIONING
// ============================================================================

/// Opaque deployment version identifier (e.g. `"v1.3.0"`).
///
/// Bumped by whoever deploys a new build; the worker never computes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Version-qualified cache store name, e.g. `"app-cache-v1.3.0"`.
///
/// Exactly one store is current at a time; every other name is stale and
/// eligible for eviction at activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreName(String);

impl StoreName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build the store name for a prefix and deployment version.
    pub fn qualified(prefix: &str, version: &VersionId) -> Self {
        Self(format!("{}-{}", prefix, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// STATIC MANIFEST
// ============================================================================

/// Ordered list of absolute root-relative paths that must be cached before
/// an install is considered complete.
///
/// Supplied by the surrounding build/deploy process. Existence of the paths
/// is not checked here; the installer verifies each by fetching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticManifest(Vec<String>);

impl StaticManifest {
    /// Validate path shape: every entry must be root-relative (`/...`).
    pub fn new(paths: Vec<String>) -> Result<Self, ConfigError> {
        for path in &paths {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "static_manifest".to_string(),
                    value: path.clone(),
                    reason: "manifest paths must be root-relative".to_string(),
                });
            }
        }
        Ok(Self(paths))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// WORKER STATE
// ============================================================================

/// Worker lifecycle state machine.
///
/// A worker is installed, then activated, in that order, exactly once per
/// version. `Redundant` marks a worker replaced by a newer deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    /// Constructed, nothing run yet.
    Parsed,
    /// Install in progress; the store is being populated.
    Installing,
    /// Installed, waiting for activation.
    Waiting,
    /// Controlling clients and intercepting requests.
    Activated,
    /// Superseded by a newer version.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
