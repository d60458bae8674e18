use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use toolmux_protocol::{AvailableTool, CallResult, ToolDef};
use toolmux_search::SearchService;
use toolmux_store::ConfigResolver;

use crate::builtin::{EXECUTE_TOOL_NAME, SEARCH_TOOLS_NAME};
use crate::error::{GatewayError, Result};
use crate::execute_tool::run_execute_tool;
use crate::middleware::advertise_tools;
use crate::proxy::ToolProxy;
use crate::search_tools::run_search_tools;

/// The endpoint a request arrived on, as established by the transport.
#[derive(Debug, Clone, Copy)]
pub struct EndpointContext {
    pub namespace_uuid: Uuid,
    pub endpoint_uuid: Uuid,
}

/// Per-endpoint facade over the discovery core.
///
/// Wires the resolved-config cache, the search service, and the upstream
/// proxy. The aggregated tool pool is an input: fetching tools from upstream
/// servers is the transport layer's job.
pub struct Gateway {
    resolver: Arc<ConfigResolver>,
    search: Arc<SearchService>,
    proxy: Arc<dyn ToolProxy>,
}

impl Gateway {
    pub fn new(
        resolver: Arc<ConfigResolver>,
        search: Arc<SearchService>,
        proxy: Arc<dyn ToolProxy>,
    ) -> Self {
        Self {
            resolver,
            search,
            proxy,
        }
    }

    pub fn search_service(&self) -> &Arc<SearchService> {
        &self.search
    }

    /// Advertise-tools pipeline. Never fails: configuration trouble resolves
    /// to the fail-safe config, under which the upstream list passes through
    /// unchanged.
    pub async fn advertise_tools(
        &self,
        context: &EndpointContext,
        upstream: &[ToolDef],
    ) -> Vec<ToolDef> {
        let resolved = self
            .resolver
            .get_resolved_config(context.namespace_uuid, context.endpoint_uuid)
            .await;
        advertise_tools(&resolved, upstream)
    }

    /// Route a tool call: built-ins are intercepted, everything else goes to
    /// the upstream proxy untouched.
    pub async fn call_tool(
        &self,
        context: &EndpointContext,
        tool_name: &str,
        args: &Value,
        pool: &[AvailableTool],
    ) -> Result<CallResult> {
        match tool_name {
            SEARCH_TOOLS_NAME => {
                let resolved = self
                    .resolver
                    .get_resolved_config(context.namespace_uuid, context.endpoint_uuid)
                    .await;
                run_search_tools(
                    args,
                    &resolved,
                    &self.search,
                    pool,
                    Some(context.namespace_uuid),
                    Some(context.endpoint_uuid),
                )
                .await
            }
            EXECUTE_TOOL_NAME => {
                let candidates: Vec<ToolDef> =
                    pool.iter().map(|entry| entry.tool.clone()).collect();
                Ok(run_execute_tool(args, &candidates, self.proxy.as_ref()).await)
            }
            other => self
                .proxy
                .call_tool(other, args)
                .await
                .map_err(|err| GatewayError::Dispatch(err.to_string())),
        }
    }
}
