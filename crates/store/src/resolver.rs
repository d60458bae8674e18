use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;

use toolmux_protocol::{resolve, ResolvedConfig};

use crate::contract::ConfigStore;
use crate::error::{Result, StoreError};

/// Per-endpoint resolved-config cache with single-flight fetching.
///
/// Concurrent callers for the same endpoint share one store fetch: the cache
/// holds one `OnceCell` per endpoint and `get_or_try_init` parks latecomers
/// on the in-flight initialization. A failed fetch leaves the cell empty and
/// removes it from the map, so nothing is poisoned and the next caller
/// retries from the store.
pub struct ConfigResolver {
    store: Arc<dyn ConfigStore>,
    cache: Mutex<HashMap<Uuid, Arc<OnceCell<ResolvedConfig>>>>,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolved configuration for one endpoint of a namespace.
    ///
    /// Never fails: a missing namespace or a store error resolves to
    /// [`ResolvedConfig::fail_safe`], which is not cached.
    pub async fn get_resolved_config(
        &self,
        namespace_uuid: Uuid,
        endpoint_uuid: Uuid,
    ) -> ResolvedConfig {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache
                .entry(endpoint_uuid)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let fetched = cell
            .get_or_try_init(|| self.fetch(namespace_uuid, endpoint_uuid))
            .await;

        match fetched {
            Ok(config) => config.clone(),
            Err(err) => {
                tracing::warn!(
                    %namespace_uuid,
                    %endpoint_uuid,
                    error = %err,
                    "config resolution failed, serving fail-safe config"
                );
                // Drop the empty cell so a recovered store is retried.
                let mut cache = self.cache.lock().await;
                if let Some(existing) = cache.get(&endpoint_uuid) {
                    if Arc::ptr_eq(existing, &cell) {
                        cache.remove(&endpoint_uuid);
                    }
                }
                ResolvedConfig::fail_safe()
            }
        }
    }

    async fn fetch(&self, namespace_uuid: Uuid, endpoint_uuid: Uuid) -> Result<ResolvedConfig> {
        let namespace = self
            .store
            .find_namespace(namespace_uuid)
            .await?
            .ok_or(StoreError::NotFound("namespace"))?;
        let endpoint = self.store.find_endpoint(endpoint_uuid).await?;
        let overrides = self
            .store
            .find_tool_defer_loading_overrides(namespace_uuid)
            .await?;
        let search_config = self.store.find_tool_search_config(namespace_uuid).await?;

        Ok(resolve(
            &namespace,
            endpoint.as_ref(),
            overrides,
            search_config.as_ref(),
        ))
    }

    /// Drop the cached entry of one endpoint.
    pub async fn invalidate(&self, endpoint_uuid: Uuid) {
        self.cache.lock().await.remove(&endpoint_uuid);
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
