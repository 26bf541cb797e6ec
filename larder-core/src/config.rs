//! Worker configuration types

use crate::error::ConfigError;
use crate::{StaticManifest, StoreName, VersionId};
use serde::{Deserialize, Serialize};

/// Configuration for one worker deployment.
///
/// Everything the worker needs is passed in here explicitly - version,
/// store prefix, static manifest, navigation fallback - so a worker can be
/// constructed against fake storage and fake network in tests. There is no
/// ambient module state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Deployment version; bumped externally on every deploy.
    pub version: VersionId,
    /// Prefix for the version-qualified store name.
    pub cache_prefix: String,
    /// Paths guaranteed to be cached before install completes.
    pub static_manifest: StaticManifest,
    /// Root document served to offline navigations on a cache miss.
    pub navigation_fallback: String,
}

impl WorkerConfig {
    pub fn new(
        version: VersionId,
        cache_prefix: impl Into<String>,
        static_manifest: StaticManifest,
    ) -> Self {
        Self {
            version,
            cache_prefix: cache_prefix.into(),
            static_manifest,
            navigation_fallback: "/index.html".to_string(),
        }
    }

    /// Override the offline navigation fallback document.
    pub fn with_navigation_fallback(mut self, path: impl Into<String>) -> Self {
        self.navigation_fallback = path.into();
        self
    }

    /// The store name this deployment owns.
    pub fn store_name(&self) -> StoreName {
        StoreName::qualified(&self.cache_prefix, &self.version)
    }

    /// Check all required fields before the worker starts using the config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.as_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "version".to_string(),
            });
        }
        if self.cache_prefix.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "cache_prefix".to_string(),
            });
        }
        if !self.navigation_fallback.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "navigation_fallback".to_string(),
                value: self.navigation_fallback.clone(),
                reason: "must be root-relative".to_string(),
            });
        }
        Ok(())
    }
}
