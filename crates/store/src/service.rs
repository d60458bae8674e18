use std::sync::Arc;

use uuid::Uuid;

use toolmux_protocol::{DeferLoadingBehavior, Endpoint, Namespace, ToolSearchConfig};

use crate::contract::{ConfigStore, EndpointUpdate, NamespaceUpdate};
use crate::error::Result;
use crate::resolver::ConfigResolver;

/// Write path of the configuration hierarchy.
///
/// Every mutation is followed by cache invalidation naming each endpoint the
/// write can affect; readers that observe the write's completion therefore
/// see it reflected by their next `get_resolved_config`.
pub struct ConfigService {
    store: Arc<dyn ConfigStore>,
    resolver: Arc<ConfigResolver>,
}

impl ConfigService {
    pub fn new(store: Arc<dyn ConfigStore>, resolver: Arc<ConfigResolver>) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    pub async fn update_namespace(
        &self,
        namespace_uuid: Uuid,
        update: NamespaceUpdate,
    ) -> Result<Namespace> {
        let namespace = self.store.update_namespace(namespace_uuid, update).await?;
        self.invalidate_namespace(namespace_uuid).await;
        Ok(namespace)
    }

    pub async fn update_endpoint(
        &self,
        endpoint_uuid: Uuid,
        update: EndpointUpdate,
    ) -> Result<Endpoint> {
        let endpoint = self.store.update_endpoint(endpoint_uuid, update).await?;
        self.resolver.invalidate(endpoint_uuid).await;
        Ok(endpoint)
    }

    pub async fn update_tool_defer_loading(
        &self,
        namespace_uuid: Uuid,
        tool_uuid: Uuid,
        server_uuid: Uuid,
        defer_loading: DeferLoadingBehavior,
    ) -> Result<()> {
        self.store
            .update_tool_defer_loading(namespace_uuid, tool_uuid, server_uuid, defer_loading)
            .await?;
        self.invalidate_namespace(namespace_uuid).await;
        Ok(())
    }

    pub async fn upsert_tool_search_config(
        &self,
        config: ToolSearchConfig,
    ) -> Result<ToolSearchConfig> {
        let namespace_uuid = config.namespace_uuid;
        let stored = self.store.upsert_tool_search_config(config).await?;
        self.invalidate_namespace(namespace_uuid).await;
        Ok(stored)
    }

    pub async fn delete_namespace(&self, namespace_uuid: Uuid) -> Result<()> {
        // Capture the affected endpoints before the cascade removes them.
        let endpoints = self.store.endpoints_by_namespace(namespace_uuid).await?;
        self.store.delete_namespace(namespace_uuid).await?;
        for endpoint in endpoints {
            self.resolver.invalidate(endpoint.uuid).await;
        }
        Ok(())
    }

    async fn invalidate_namespace(&self, namespace_uuid: Uuid) {
        match self.store.endpoints_by_namespace(namespace_uuid).await {
            Ok(endpoints) => {
                for endpoint in endpoints {
                    self.resolver.invalidate(endpoint.uuid).await;
                }
            }
            Err(err) => {
                // Cannot enumerate the affected endpoints; flush everything
                // rather than serve stale configs.
                tracing::warn!(
                    %namespace_uuid,
                    error = %err,
                    "endpoint enumeration failed after write, clearing resolver cache"
                );
                self.resolver.clear().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolmux_protocol::{SearchMethod, SearchMethodOverride, ToolVisibilityMode};

    use crate::memory::MemoryStore;

    fn seeded() -> (Arc<MemoryStore>, Uuid, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let namespace_uuid = Uuid::new_v4();
        store.insert_namespace(Namespace {
            uuid: namespace_uuid,
            name: "team".to_string(),
            owner_user_id: None,
            default_defer_loading: false,
            default_search_method: SearchMethod::None,
            default_tool_visibility: ToolVisibilityMode::All,
        });

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        for (uuid, name) in [(first, "main"), (second, "staging")] {
            store
                .insert_endpoint(Endpoint {
                    uuid,
                    namespace_uuid,
                    name: name.to_string(),
                    override_defer_loading: None,
                    override_search_method: None,
                    override_tool_visibility: None,
                })
                .expect("endpoint");
        }
        (store, namespace_uuid, first, second)
    }

    #[tokio::test]
    async fn namespace_update_is_visible_on_every_endpoint() {
        let (store, ns, first, second) = seeded();
        let resolver = Arc::new(ConfigResolver::new(store.clone()));
        let service = ConfigService::new(store, resolver.clone());

        assert_eq!(
            resolver.get_resolved_config(ns, first).await.search_method,
            SearchMethod::None
        );
        assert_eq!(
            resolver.get_resolved_config(ns, second).await.search_method,
            SearchMethod::None
        );

        service
            .update_namespace(
                ns,
                NamespaceUpdate {
                    default_search_method: Some(SearchMethod::Bm25),
                    default_defer_loading: Some(true),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(
            resolver.get_resolved_config(ns, first).await.search_method,
            SearchMethod::Bm25
        );
        assert_eq!(
            resolver.get_resolved_config(ns, second).await.search_method,
            SearchMethod::Bm25
        );
    }

    #[tokio::test]
    async fn endpoint_update_only_invalidates_that_endpoint() {
        let (store, ns, first, second) = seeded();
        let resolver = Arc::new(ConfigResolver::new(store.clone()));
        let service = ConfigService::new(store, resolver.clone());

        resolver.get_resolved_config(ns, first).await;
        resolver.get_resolved_config(ns, second).await;
        assert_eq!(resolver.cached_len().await, 2);

        service
            .update_endpoint(
                first,
                EndpointUpdate {
                    override_search_method: Some(SearchMethodOverride::Regex),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(resolver.cached_len().await, 1);

        assert_eq!(
            resolver.get_resolved_config(ns, first).await.search_method,
            SearchMethod::Regex
        );
        assert_eq!(
            resolver.get_resolved_config(ns, second).await.search_method,
            SearchMethod::None
        );
    }

    #[tokio::test]
    async fn upsert_search_config_refreshes_resolved_limits() {
        let (store, ns, first, _) = seeded();
        let resolver = Arc::new(ConfigResolver::new(store.clone()));
        let service = ConfigService::new(store, resolver.clone());

        assert_eq!(resolver.get_resolved_config(ns, first).await.max_results, 5);

        service
            .upsert_tool_search_config(ToolSearchConfig {
                namespace_uuid: ns,
                max_results: 15,
                provider_config: None,
            })
            .await
            .expect("upsert");

        assert_eq!(
            resolver.get_resolved_config(ns, first).await.max_results,
            15
        );
    }

    #[tokio::test]
    async fn delete_namespace_invalidates_its_endpoints() {
        let (store, ns, first, second) = seeded();
        let resolver = Arc::new(ConfigResolver::new(store.clone()));
        let service = ConfigService::new(store, resolver.clone());

        resolver.get_resolved_config(ns, first).await;
        resolver.get_resolved_config(ns, second).await;

        service.delete_namespace(ns).await.expect("delete");
        assert_eq!(resolver.cached_len().await, 0);

        // With the namespace gone only the fail-safe remains.
        let config = resolver.get_resolved_config(ns, first).await;
        assert_eq!(config.search_method, SearchMethod::None);
        assert!(!config.defer_loading_enabled);
    }
}
