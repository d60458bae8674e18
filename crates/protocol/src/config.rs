use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ranked-retrieval method for a namespace or endpoint.
///
/// `None` disables ranked retrieval entirely; `Embeddings` is reserved and
/// reported as unsupported by the provider registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMethod {
    None,
    Regex,
    Bm25,
    Embeddings,
}

impl SearchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMethod::None => "NONE",
            SearchMethod::Regex => "REGEX",
            SearchMethod::Bm25 => "BM25",
            SearchMethod::Embeddings => "EMBEDDINGS",
        }
    }
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state defer-loading setting.
///
/// `Inherit` falls through to the next configuration layer; a nullable bool
/// cannot express the difference between "unset" and "deliberately off".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeferLoadingBehavior {
    Enabled,
    Disabled,
    Inherit,
}

impl DeferLoadingBehavior {
    /// `Enabled`/`Disabled` as a bool; `Inherit` has no value of its own.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            DeferLoadingBehavior::Enabled => Some(true),
            DeferLoadingBehavior::Disabled => Some(false),
            DeferLoadingBehavior::Inherit => None,
        }
    }
}

/// Which tools an endpoint advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolVisibilityMode {
    All,
    SearchOnly,
}

/// Endpoint-level search-method override, including the inherit sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMethodOverride {
    Inherit,
    None,
    Regex,
    Bm25,
    Embeddings,
}

impl SearchMethodOverride {
    pub fn resolve(self, default: SearchMethod) -> SearchMethod {
        match self {
            SearchMethodOverride::Inherit => default,
            SearchMethodOverride::None => SearchMethod::None,
            SearchMethodOverride::Regex => SearchMethod::Regex,
            SearchMethodOverride::Bm25 => SearchMethod::Bm25,
            SearchMethodOverride::Embeddings => SearchMethod::Embeddings,
        }
    }
}

/// Endpoint-level visibility override, including the inherit sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolVisibilityOverride {
    Inherit,
    All,
    SearchOnly,
}

impl ToolVisibilityOverride {
    pub fn resolve(self, default: ToolVisibilityMode) -> ToolVisibilityMode {
        match self {
            ToolVisibilityOverride::Inherit => default,
            ToolVisibilityOverride::All => ToolVisibilityMode::All,
            ToolVisibilityOverride::SearchOnly => ToolVisibilityMode::SearchOnly,
        }
    }
}

/// Logical grouping of upstream MCP servers, carrying the defaults every
/// endpoint of the namespace inherits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Namespace {
    pub uuid: Uuid,
    pub name: String,
    /// `None` means public ownership: any caller may modify the namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
    pub default_defer_loading: bool,
    pub default_search_method: SearchMethod,
    pub default_tool_visibility: ToolVisibilityMode,
}

/// Client-visible projection of a namespace with tri-state overrides.
///
/// An unset override (`None`) and an explicit `Inherit` resolve identically;
/// both fall through to the namespace default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Endpoint {
    pub uuid: Uuid,
    pub namespace_uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_defer_loading: Option<DeferLoadingBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_search_method: Option<SearchMethodOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_tool_visibility: Option<ToolVisibilityOverride>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingStatus {
    Active,
    Inactive,
}

/// Per (namespace, server, tool) record; unique on that triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMapping {
    pub namespace_uuid: Uuid,
    pub tool_uuid: Uuid,
    pub server_uuid: Uuid,
    pub status: MappingStatus,
    pub defer_loading: DeferLoadingBehavior,
}

/// Per-namespace search tuning; unique on the namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolSearchConfig {
    pub namespace_uuid: Uuid,
    pub max_results: usize,
    /// Method-specific tuning; shape depends on the namespace's method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

impl ToolSearchConfig {
    pub const MIN_RESULTS: usize = 1;
    pub const MAX_RESULTS: usize = 20;
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    pub fn max_results_in_bounds(max_results: usize) -> bool {
        (Self::MIN_RESULTS..=Self::MAX_RESULTS).contains(&max_results)
    }
}

/// BM25 tuning stored in `provider_config` when the method is `BM25`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    pub fields: Vec<String>,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            fields: vec!["name".to_string(), "description".to_string()],
        }
    }
}

impl Bm25Params {
    /// Range checks applied both on upsert and at provider initialization.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=3.0).contains(&self.k1) {
            return Err(format!("k1 must be within [0, 3], got {}", self.k1));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(format!("b must be within [0, 1], got {}", self.b));
        }
        if self.fields.is_empty() {
            return Err("fields must not be empty".to_string());
        }
        Ok(())
    }
}

/// Reserved EMBEDDINGS tuning; kept so stored configurations survive until
/// the method is implemented.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmbeddingsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
}

impl EmbeddingsParams {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(threshold) = self.similarity_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(format!(
                    "similarity_threshold must be within [0, 1], got {threshold}"
                ));
            }
        }
        Ok(())
    }
}
