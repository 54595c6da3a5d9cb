//! Backend registry
//!
//! Resolves a [`BackendConfig`] descriptor to a constructed adapter.
//! Validation happens eagerly, before any adapter is built; construction
//! results are cached by a normalized config fingerprint so repeated
//! resolution with identical config reuses the adapter (a local model is
//! loaded once, an HTTP client pool is shared). The cache is shared across
//! concurrent `analyze` calls: reads hand out `Arc` clones without
//! blocking, and a build lock guarantees at-most-one constructed instance
//! per fingerprint.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use medscan_core::config::{BackendConfig, Validate};

use crate::domain::{Backend, BackendError};
use crate::infrastructure::backends::{HostedBackend, LanBackend, LocalBackend, MockBackend};

/// Registry owning adapter lifecycle
pub struct BackendRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn Backend>>>,
    build_lock: Mutex<()>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            adapters: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
        }
    }

    /// Resolve a descriptor to an adapter, constructing it on first use.
    ///
    /// Fails with [`BackendError::Configuration`] when required variant
    /// fields are missing or invalid, and with [`BackendError::ModelLoad`]
    /// when a local model cannot be loaded; in both cases nothing is cached.
    pub async fn resolve(&self, config: &BackendConfig) -> Result<Arc<dyn Backend>, BackendError> {
        config.validate()?;

        let fingerprint = Self::fingerprint(config)?;

        if let Some(adapter) = self.adapters.read().await.get(&fingerprint) {
            debug!(fingerprint = %fingerprint, "Reusing cached backend adapter");
            return Ok(adapter.clone());
        }

        // One construction at a time; re-check under the lock so losers of
        // the race reuse the winner's adapter.
        let _guard = self.build_lock.lock().await;
        if let Some(adapter) = self.adapters.read().await.get(&fingerprint) {
            return Ok(adapter.clone());
        }

        let adapter = Self::build(config).await?;
        info!(
            backend_type = config.backend_type(),
            fingerprint = %fingerprint,
            "Constructed backend adapter"
        );

        self.adapters
            .write()
            .await
            .insert(fingerprint, adapter.clone());
        Ok(adapter)
    }

    /// Drop the cached adapter for this descriptor, if any.
    ///
    /// Other cache entries are untouched; in-flight users keep their `Arc`.
    pub async fn invalidate(&self, config: &BackendConfig) -> bool {
        match Self::fingerprint(config) {
            Ok(fingerprint) => self.adapters.write().await.remove(&fingerprint).is_some(),
            Err(_) => false,
        }
    }

    /// Number of cached adapters.
    pub async fn cached_count(&self) -> usize {
        self.adapters.read().await.len()
    }

    async fn build(config: &BackendConfig) -> Result<Arc<dyn Backend>, BackendError> {
        let adapter: Arc<dyn Backend> = match config {
            BackendConfig::Hosted(c) => Arc::new(HostedBackend::new(c.clone())),
            BackendConfig::Lan(c) => Arc::new(LanBackend::new(c.clone())),
            BackendConfig::Local(c) => Arc::new(LocalBackend::load(c.clone()).await?),
            BackendConfig::Mock(c) => Arc::new(MockBackend::new(c.clone())),
        };
        Ok(adapter)
    }

    /// Normalized fingerprint of a descriptor.
    ///
    /// Field order in the serialized form is fixed by the struct
    /// definitions, so identical descriptors always hash identically
    /// within one process.
    fn fingerprint(config: &BackendConfig) -> Result<String, BackendError> {
        let canonical = serde_json::to_string(config)
            .map_err(|e| BackendError::configuration(format!("Unserializable config: {}", e)))?;
        let mut hasher = DefaultHasher::new();
        hasher.write(canonical.as_bytes());
        Ok(format!("{}-{:016x}", config.backend_type(), hasher.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medscan_core::config::{HostedBackendConfig, MockBackendConfig};

    fn mock_config(responses: Vec<&str>) -> BackendConfig {
        BackendConfig::Mock(MockBackendConfig {
            responses: responses.into_iter().map(String::from).collect(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_resolve_mock() {
        let registry = BackendRegistry::new();
        let adapter = registry.resolve(&mock_config(vec!["ok"])).await.unwrap();
        assert_eq!(adapter.info().id, "mock");
    }

    #[tokio::test]
    async fn test_invalid_config_constructs_nothing() {
        let registry = BackendRegistry::new();
        let config = BackendConfig::Hosted(HostedBackendConfig::default());

        let err = registry.resolve(&config).await.unwrap_err();
        assert!(matches!(err, BackendError::Configuration(_)));
        assert_eq!(registry.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_identical_config_reuses_adapter() {
        let registry = BackendRegistry::new();
        let config = mock_config(vec!["ok"]);

        let first = registry.resolve(&config).await.unwrap();
        let second = registry.resolve(&config).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cached_count().await, 1);
    }

    #[tokio::test]
    async fn test_changed_config_builds_new_adapter() {
        let registry = BackendRegistry::new();

        let first = registry.resolve(&mock_config(vec!["a"])).await.unwrap();
        let second = registry.resolve(&mock_config(vec!["b"])).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cached_count().await, 2);
    }

    #[tokio::test]
    async fn test_invalidate_drops_only_that_entry() {
        let registry = BackendRegistry::new();
        let kept = mock_config(vec!["keep"]);
        let dropped = mock_config(vec!["drop"]);

        registry.resolve(&kept).await.unwrap();
        let before = registry.resolve(&dropped).await.unwrap();

        assert!(registry.invalidate(&dropped).await);
        assert_eq!(registry.cached_count().await, 1);

        let after = registry.resolve(&dropped).await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));

        // Kept entry survived
        assert_eq!(registry.cached_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_builds_once() {
        let registry = Arc::new(BackendRegistry::new());
        let config = mock_config(vec!["ok"]);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                registry.resolve(&config).await.unwrap()
            }));
        }

        let adapters: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        for adapter in &adapters[1..] {
            assert!(Arc::ptr_eq(&adapters[0], adapter));
        }
        assert_eq!(registry.cached_count().await, 1);
    }
}
