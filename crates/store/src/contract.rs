use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use toolmux_protocol::{
    DeferLoadingBehavior, Endpoint, Namespace, SearchMethod, SearchMethodOverride,
    ToolSearchConfig, ToolVisibilityMode, ToolVisibilityOverride,
};

use crate::error::Result;

/// An upstream MCP server registered with the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub uuid: Uuid,
    pub name: String,
}

/// An upstream tool as recorded at aggregation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub uuid: Uuid,
    pub server_uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

/// Partial namespace update; `None` fields stay untouched.
#[derive(Debug, Clone, Default)]
pub struct NamespaceUpdate {
    pub default_defer_loading: Option<bool>,
    pub default_search_method: Option<SearchMethod>,
    pub default_tool_visibility: Option<ToolVisibilityMode>,
}

/// Partial endpoint update; `None` fields stay untouched. Setting an
/// override to `Inherit` is how a previously pinned value is released.
#[derive(Debug, Clone, Default)]
pub struct EndpointUpdate {
    pub override_defer_loading: Option<DeferLoadingBehavior>,
    pub override_search_method: Option<SearchMethodOverride>,
    pub override_tool_visibility: Option<ToolVisibilityOverride>,
}

/// Read/write surface the discovery core consumes.
///
/// Implementations are the source of truth for the configuration hierarchy.
/// Every write that can change a resolved config must be followed by an
/// invalidation naming the affected endpoints; [`crate::ConfigService`]
/// wires that up.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn find_namespace(&self, namespace_uuid: Uuid) -> Result<Option<Namespace>>;

    async fn find_endpoint(&self, endpoint_uuid: Uuid) -> Result<Option<Endpoint>>;

    /// Explicit per-tool defer-loading decisions of a namespace, keyed by
    /// public tool name. INHERIT mappings and inactive mappings are absent.
    async fn find_tool_defer_loading_overrides(
        &self,
        namespace_uuid: Uuid,
    ) -> Result<HashMap<String, bool>>;

    async fn find_tool_search_config(
        &self,
        namespace_uuid: Uuid,
    ) -> Result<Option<ToolSearchConfig>>;

    /// Endpoints bound to a namespace; drives namespace-scoped invalidation.
    async fn endpoints_by_namespace(&self, namespace_uuid: Uuid) -> Result<Vec<Endpoint>>;

    async fn update_namespace(
        &self,
        namespace_uuid: Uuid,
        update: NamespaceUpdate,
    ) -> Result<Namespace>;

    async fn update_endpoint(
        &self,
        endpoint_uuid: Uuid,
        update: EndpointUpdate,
    ) -> Result<Endpoint>;

    async fn update_tool_defer_loading(
        &self,
        namespace_uuid: Uuid,
        tool_uuid: Uuid,
        server_uuid: Uuid,
        defer_loading: DeferLoadingBehavior,
    ) -> Result<()>;

    async fn upsert_tool_search_config(
        &self,
        config: ToolSearchConfig,
    ) -> Result<ToolSearchConfig>;

    /// Remove a namespace, cascading to its tool-search config and tool
    /// mappings.
    async fn delete_namespace(&self, namespace_uuid: Uuid) -> Result<()>;
}
