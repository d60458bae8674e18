use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use toolmux_protocol::{
    public_tool_name, sanitize_server_name, AvailableTool, DeferLoadingBehavior, Endpoint,
    MappingStatus, Namespace, ToolDef, ToolMapping, ToolSearchConfig,
};

use crate::contract::{ConfigStore, EndpointUpdate, NamespaceUpdate, ServerRecord, ToolRecord};
use crate::error::{Result, StoreError};

/// Reference [`ConfigStore`] backed by process memory.
///
/// Used by the test suite and by embedders that do not need durable
/// configuration. Enforces the same constraints a relational backend would:
/// mapping uniqueness on (namespace, tool, server), one search config per
/// namespace, cascade delete from namespace to config and mappings, and
/// uniqueness of sanitized server names (colliding names would merge two
/// servers' public tool namespaces).
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    namespaces: HashMap<Uuid, Namespace>,
    endpoints: HashMap<Uuid, Endpoint>,
    servers: HashMap<Uuid, ServerRecord>,
    tools: HashMap<Uuid, ToolRecord>,
    mappings: Vec<ToolMapping>,
    search_configs: HashMap<Uuid, ToolSearchConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_namespace(&self, namespace: Namespace) {
        let mut tables = self.inner.write().expect("store lock poisoned");
        tables.namespaces.insert(namespace.uuid, namespace);
    }

    pub fn insert_endpoint(&self, endpoint: Endpoint) -> Result<()> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        if !tables.namespaces.contains_key(&endpoint.namespace_uuid) {
            return Err(StoreError::ForeignKey(format!(
                "endpoint {} references missing namespace {}",
                endpoint.uuid, endpoint.namespace_uuid
            )));
        }
        tables.endpoints.insert(endpoint.uuid, endpoint);
        Ok(())
    }

    pub fn insert_server(&self, server: ServerRecord) -> Result<()> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        let sanitized = sanitize_server_name(&server.name);
        let collision = tables
            .servers
            .values()
            .any(|existing| existing.uuid != server.uuid && sanitize_server_name(&existing.name) == sanitized);
        if collision {
            return Err(StoreError::Conflict(format!(
                "server name '{}' sanitizes to '{sanitized}', which is already taken",
                server.name
            )));
        }
        tables.servers.insert(server.uuid, server);
        Ok(())
    }

    pub fn insert_tool(&self, tool: ToolRecord) -> Result<()> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        if !tables.servers.contains_key(&tool.server_uuid) {
            return Err(StoreError::ForeignKey(format!(
                "tool {} references missing server {}",
                tool.uuid, tool.server_uuid
            )));
        }
        tables.tools.insert(tool.uuid, tool);
        Ok(())
    }

    pub fn insert_mapping(&self, mapping: ToolMapping) -> Result<()> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        if !tables.namespaces.contains_key(&mapping.namespace_uuid) {
            return Err(StoreError::ForeignKey(format!(
                "mapping references missing namespace {}",
                mapping.namespace_uuid
            )));
        }
        if !tables.tools.contains_key(&mapping.tool_uuid) {
            return Err(StoreError::ForeignKey(format!(
                "mapping references missing tool {}",
                mapping.tool_uuid
            )));
        }
        let duplicate = tables.mappings.iter().any(|existing| {
            existing.namespace_uuid == mapping.namespace_uuid
                && existing.tool_uuid == mapping.tool_uuid
                && existing.server_uuid == mapping.server_uuid
        });
        if duplicate {
            return Err(StoreError::Conflict(
                "mapping already exists for (namespace, tool, server)".to_string(),
            ));
        }
        tables.mappings.push(mapping);
        Ok(())
    }

    /// Join of ACTIVE mappings with their tool and server records, producing
    /// the public-named candidate pool of a namespace.
    pub fn namespace_tools(&self, namespace_uuid: Uuid) -> Vec<AvailableTool> {
        let tables = self.inner.read().expect("store lock poisoned");
        let mut pool = Vec::new();
        for mapping in &tables.mappings {
            if mapping.namespace_uuid != namespace_uuid
                || mapping.status != MappingStatus::Active
            {
                continue;
            }
            let Some(tool) = tables.tools.get(&mapping.tool_uuid) else {
                continue;
            };
            let Some(server) = tables.servers.get(&mapping.server_uuid) else {
                continue;
            };
            let mut def = ToolDef::new(public_tool_name(&server.name, &tool.name));
            def.description = tool.description.clone();
            def.input_schema = tool.input_schema.clone();
            pool.push(AvailableTool {
                tool: def,
                server_uuid: server.uuid,
            });
        }
        pool
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn find_namespace(&self, namespace_uuid: Uuid) -> Result<Option<Namespace>> {
        let tables = self.inner.read().expect("store lock poisoned");
        Ok(tables.namespaces.get(&namespace_uuid).cloned())
    }

    async fn find_endpoint(&self, endpoint_uuid: Uuid) -> Result<Option<Endpoint>> {
        let tables = self.inner.read().expect("store lock poisoned");
        Ok(tables.endpoints.get(&endpoint_uuid).cloned())
    }

    async fn find_tool_defer_loading_overrides(
        &self,
        namespace_uuid: Uuid,
    ) -> Result<HashMap<String, bool>> {
        let tables = self.inner.read().expect("store lock poisoned");
        let mut overrides = HashMap::new();
        for mapping in &tables.mappings {
            if mapping.namespace_uuid != namespace_uuid
                || mapping.status != MappingStatus::Active
            {
                continue;
            }
            let Some(value) = mapping.defer_loading.as_bool() else {
                continue;
            };
            let Some(tool) = tables.tools.get(&mapping.tool_uuid) else {
                continue;
            };
            let Some(server) = tables.servers.get(&mapping.server_uuid) else {
                continue;
            };
            overrides.insert(public_tool_name(&server.name, &tool.name), value);
        }
        Ok(overrides)
    }

    async fn find_tool_search_config(
        &self,
        namespace_uuid: Uuid,
    ) -> Result<Option<ToolSearchConfig>> {
        let tables = self.inner.read().expect("store lock poisoned");
        Ok(tables.search_configs.get(&namespace_uuid).cloned())
    }

    async fn endpoints_by_namespace(&self, namespace_uuid: Uuid) -> Result<Vec<Endpoint>> {
        let tables = self.inner.read().expect("store lock poisoned");
        Ok(tables
            .endpoints
            .values()
            .filter(|endpoint| endpoint.namespace_uuid == namespace_uuid)
            .cloned()
            .collect())
    }

    async fn update_namespace(
        &self,
        namespace_uuid: Uuid,
        update: NamespaceUpdate,
    ) -> Result<Namespace> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        let namespace = tables
            .namespaces
            .get_mut(&namespace_uuid)
            .ok_or(StoreError::NotFound("namespace"))?;
        if let Some(value) = update.default_defer_loading {
            namespace.default_defer_loading = value;
        }
        if let Some(value) = update.default_search_method {
            namespace.default_search_method = value;
        }
        if let Some(value) = update.default_tool_visibility {
            namespace.default_tool_visibility = value;
        }
        Ok(namespace.clone())
    }

    async fn update_endpoint(
        &self,
        endpoint_uuid: Uuid,
        update: EndpointUpdate,
    ) -> Result<Endpoint> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        let endpoint = tables
            .endpoints
            .get_mut(&endpoint_uuid)
            .ok_or(StoreError::NotFound("endpoint"))?;
        if let Some(value) = update.override_defer_loading {
            endpoint.override_defer_loading = Some(value);
        }
        if let Some(value) = update.override_search_method {
            endpoint.override_search_method = Some(value);
        }
        if let Some(value) = update.override_tool_visibility {
            endpoint.override_tool_visibility = Some(value);
        }
        Ok(endpoint.clone())
    }

    async fn update_tool_defer_loading(
        &self,
        namespace_uuid: Uuid,
        tool_uuid: Uuid,
        server_uuid: Uuid,
        defer_loading: DeferLoadingBehavior,
    ) -> Result<()> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        let mapping = tables
            .mappings
            .iter_mut()
            .find(|mapping| {
                mapping.namespace_uuid == namespace_uuid
                    && mapping.tool_uuid == tool_uuid
                    && mapping.server_uuid == server_uuid
            })
            .ok_or(StoreError::NotFound("tool mapping"))?;
        mapping.defer_loading = defer_loading;
        Ok(())
    }

    async fn upsert_tool_search_config(
        &self,
        config: ToolSearchConfig,
    ) -> Result<ToolSearchConfig> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        if !tables.namespaces.contains_key(&config.namespace_uuid) {
            return Err(StoreError::ForeignKey(format!(
                "tool search config references missing namespace {}",
                config.namespace_uuid
            )));
        }
        tables
            .search_configs
            .insert(config.namespace_uuid, config.clone());
        Ok(config)
    }

    async fn delete_namespace(&self, namespace_uuid: Uuid) -> Result<()> {
        let mut tables = self.inner.write().expect("store lock poisoned");
        tables
            .namespaces
            .remove(&namespace_uuid)
            .ok_or(StoreError::NotFound("namespace"))?;
        // Cascade: search config and mappings go with the namespace.
        tables.search_configs.remove(&namespace_uuid);
        tables
            .mappings
            .retain(|mapping| mapping.namespace_uuid != namespace_uuid);
        tables
            .endpoints
            .retain(|_, endpoint| endpoint.namespace_uuid != namespace_uuid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolmux_protocol::{SearchMethod, ToolVisibilityMode};

    fn namespace() -> Namespace {
        Namespace {
            uuid: Uuid::new_v4(),
            name: "team".to_string(),
            owner_user_id: None,
            default_defer_loading: true,
            default_search_method: SearchMethod::Bm25,
            default_tool_visibility: ToolVisibilityMode::All,
        }
    }

    fn seeded() -> (MemoryStore, Namespace, ServerRecord, ToolRecord) {
        let store = MemoryStore::new();
        let ns = namespace();
        store.insert_namespace(ns.clone());

        let server = ServerRecord {
            uuid: Uuid::new_v4(),
            name: "filesystem".to_string(),
        };
        store.insert_server(server.clone()).expect("server");

        let tool = ToolRecord {
            uuid: Uuid::new_v4(),
            server_uuid: server.uuid,
            name: "read_file".to_string(),
            description: Some("Read a file".to_string()),
            input_schema: None,
        };
        store.insert_tool(tool.clone()).expect("tool");

        store
            .insert_mapping(ToolMapping {
                namespace_uuid: ns.uuid,
                tool_uuid: tool.uuid,
                server_uuid: server.uuid,
                status: MappingStatus::Active,
                defer_loading: DeferLoadingBehavior::Inherit,
            })
            .expect("mapping");

        (store, ns, server, tool)
    }

    #[tokio::test]
    async fn overrides_skip_inherit_mappings() {
        let (store, ns, _, _) = seeded();
        let overrides = store
            .find_tool_defer_loading_overrides(ns.uuid)
            .await
            .expect("overrides");
        assert!(overrides.is_empty());
    }

    #[tokio::test]
    async fn overrides_carry_enabled_and_disabled_by_public_name() {
        let (store, ns, server, tool) = seeded();
        store
            .update_tool_defer_loading(
                ns.uuid,
                tool.uuid,
                server.uuid,
                DeferLoadingBehavior::Disabled,
            )
            .await
            .expect("update");

        let overrides = store
            .find_tool_defer_loading_overrides(ns.uuid)
            .await
            .expect("overrides");
        assert_eq!(overrides.get("filesystem__read_file"), Some(&false));
    }

    #[tokio::test]
    async fn inactive_mappings_are_invisible() {
        let (store, ns, server, _) = seeded();
        let tool = ToolRecord {
            uuid: Uuid::new_v4(),
            server_uuid: server.uuid,
            name: "write_file".to_string(),
            description: None,
            input_schema: None,
        };
        store.insert_tool(tool.clone()).expect("tool");
        store
            .insert_mapping(ToolMapping {
                namespace_uuid: ns.uuid,
                tool_uuid: tool.uuid,
                server_uuid: server.uuid,
                status: MappingStatus::Inactive,
                defer_loading: DeferLoadingBehavior::Enabled,
            })
            .expect("mapping");

        let overrides = store
            .find_tool_defer_loading_overrides(ns.uuid)
            .await
            .expect("overrides");
        assert!(!overrides.contains_key("filesystem__write_file"));

        let pool = store.namespace_tools(ns.uuid);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].tool.name, "filesystem__read_file");
    }

    #[tokio::test]
    async fn mapping_uniqueness_is_enforced() {
        let (store, ns, server, tool) = seeded();
        let duplicate = store.insert_mapping(ToolMapping {
            namespace_uuid: ns.uuid,
            tool_uuid: tool.uuid,
            server_uuid: server.uuid,
            status: MappingStatus::Active,
            defer_loading: DeferLoadingBehavior::Enabled,
        });
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn sanitized_server_name_collisions_are_rejected() {
        let (store, _, _, _) = seeded();
        let collision = store.insert_server(ServerRecord {
            uuid: Uuid::new_v4(),
            name: "file system".to_string(),
        });
        assert!(collision.is_ok());

        let rejected = store.insert_server(ServerRecord {
            uuid: Uuid::new_v4(),
            name: "file-system".to_string(),
        });
        assert!(matches!(rejected, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn upsert_search_config_requires_namespace() {
        let store = MemoryStore::new();
        let missing = store
            .upsert_tool_search_config(ToolSearchConfig {
                namespace_uuid: Uuid::new_v4(),
                max_results: 5,
                provider_config: None,
            })
            .await;
        assert!(matches!(missing, Err(StoreError::ForeignKey(_))));
    }

    #[tokio::test]
    async fn upsert_search_config_is_idempotent() {
        let (store, ns, _, _) = seeded();
        let config = ToolSearchConfig {
            namespace_uuid: ns.uuid,
            max_results: 10,
            provider_config: Some(serde_json::json!({"k1": 0.9})),
        };

        store
            .upsert_tool_search_config(config.clone())
            .await
            .expect("first upsert");
        store
            .upsert_tool_search_config(config.clone())
            .await
            .expect("second upsert");

        let stored = store
            .find_tool_search_config(ns.uuid)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(stored, config);
    }

    #[tokio::test]
    async fn delete_namespace_cascades() {
        let (store, ns, _, _) = seeded();
        store
            .upsert_tool_search_config(ToolSearchConfig {
                namespace_uuid: ns.uuid,
                max_results: 5,
                provider_config: None,
            })
            .await
            .expect("config");

        store.delete_namespace(ns.uuid).await.expect("delete");

        assert!(store
            .find_namespace(ns.uuid)
            .await
            .expect("find")
            .is_none());
        assert!(store
            .find_tool_search_config(ns.uuid)
            .await
            .expect("find")
            .is_none());
        assert!(store
            .find_tool_defer_loading_overrides(ns.uuid)
            .await
            .expect("overrides")
            .is_empty());
    }

    #[tokio::test]
    async fn update_missing_mapping_reports_not_found() {
        let (store, ns, server, _) = seeded();
        let missing = store
            .update_tool_defer_loading(
                ns.uuid,
                Uuid::new_v4(),
                server.uuid,
                DeferLoadingBehavior::Enabled,
            )
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }
}
