use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{
    Endpoint, Namespace, SearchMethod, ToolSearchConfig, ToolVisibilityMode,
};

/// Fully inherited, INHERIT-free view of namespace x endpoint x per-tool
/// configuration. Built per request, cached per endpoint, and treated as a
/// value: readers never observe a partially constructed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub defer_loading_enabled: bool,
    pub search_method: SearchMethod,
    pub tool_visibility: ToolVisibilityMode,
    /// Public tool name -> explicit defer-loading decision. Only ENABLED
    /// (`true`) and DISABLED (`false`) entries appear; INHERIT is omitted.
    pub tool_overrides: HashMap<String, bool>,
    pub max_results: usize,
    pub provider_config: Option<serde_json::Value>,
}

impl ResolvedConfig {
    /// Configuration used when the namespace is missing or the store fails:
    /// nothing deferred, search off, everything visible.
    pub fn fail_safe() -> Self {
        Self {
            defer_loading_enabled: false,
            search_method: SearchMethod::None,
            tool_visibility: ToolVisibilityMode::All,
            tool_overrides: HashMap::new(),
            max_results: ToolSearchConfig::DEFAULT_MAX_RESULTS,
            provider_config: None,
        }
    }
}

/// Collapse the configuration layers into one snapshot.
///
/// Endpoint overrides win when present and not `Inherit`; otherwise the
/// namespace defaults apply. `tool_overrides` must already be keyed by public
/// tool name with INHERIT entries dropped (the store contract guarantees
/// this).
pub fn resolve(
    namespace: &Namespace,
    endpoint: Option<&Endpoint>,
    tool_overrides: HashMap<String, bool>,
    search_config: Option<&ToolSearchConfig>,
) -> ResolvedConfig {
    let defer_loading_enabled = endpoint
        .and_then(|ep| ep.override_defer_loading)
        .and_then(|behavior| behavior.as_bool())
        .unwrap_or(namespace.default_defer_loading);

    let search_method = endpoint
        .and_then(|ep| ep.override_search_method)
        .map(|value| value.resolve(namespace.default_search_method))
        .unwrap_or(namespace.default_search_method);

    let tool_visibility = endpoint
        .and_then(|ep| ep.override_tool_visibility)
        .map(|value| value.resolve(namespace.default_tool_visibility))
        .unwrap_or(namespace.default_tool_visibility);

    let (max_results, provider_config) = match search_config {
        Some(config) => (config.max_results, config.provider_config.clone()),
        None => (ToolSearchConfig::DEFAULT_MAX_RESULTS, None),
    };

    ResolvedConfig {
        defer_loading_enabled,
        search_method,
        tool_visibility,
        tool_overrides,
        max_results,
        provider_config,
    }
}
