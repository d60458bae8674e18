use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use toolmux_protocol::{
    ApiResponse, Bm25Params, DeferLoadingBehavior, EmbeddingsParams, Namespace, SearchMethod,
    ToolSearchConfig,
};
use toolmux_store::{ConfigService, StoreError};

/// Authorization seam consulted before any write touches the store.
///
/// The proxy's authenticator implements this; [`OwnerPolicy`] is the
/// built-in ownership rule.
pub trait AccessPolicy: Send + Sync {
    fn can_modify(&self, namespace: &Namespace, caller_user_id: Option<&str>) -> bool;
}

/// Public-ownership rule: namespaces without an owner accept writes from any
/// caller; owned namespaces only from their owner.
pub struct OwnerPolicy;

impl AccessPolicy for OwnerPolicy {
    fn can_modify(&self, namespace: &Namespace, caller_user_id: Option<&str>) -> bool {
        match namespace.owner_user_id.as_deref() {
            None => true,
            Some(owner) => caller_user_id == Some(owner),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpsertToolSearchConfigRequest {
    pub namespace_uuid: Uuid,
    pub max_results: usize,
    #[serde(default)]
    pub provider_config: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateToolDeferLoadingRequest {
    pub namespace_uuid: Uuid,
    pub tool_uuid: Uuid,
    pub server_uuid: Uuid,
    pub defer_loading: DeferLoadingBehavior,
}

/// CRUD surface for per-namespace search tuning and per-tool defer-loading.
///
/// Expected failures (missing rows, denied access, invalid tuning) come back
/// as `{success: false, message}`; store errors on upsert are re-raised so
/// transports can map them to their own error envelope.
pub struct ToolSearchConfigApi {
    service: Arc<ConfigService>,
    policy: Box<dyn AccessPolicy>,
}

impl ToolSearchConfigApi {
    pub fn new(service: Arc<ConfigService>) -> Self {
        Self::with_policy(service, Box::new(OwnerPolicy))
    }

    pub fn with_policy(service: Arc<ConfigService>, policy: Box<dyn AccessPolicy>) -> Self {
        Self { service, policy }
    }

    /// Read the stored config; a namespace with no config is a success with
    /// empty data, not an error.
    pub async fn get(&self, namespace_uuid: Uuid) -> ApiResponse<ToolSearchConfig> {
        match self
            .service
            .store()
            .find_tool_search_config(namespace_uuid)
            .await
        {
            Ok(Some(config)) => ApiResponse::ok(config),
            Ok(None) => ApiResponse::ok_empty(),
            Err(err) => {
                tracing::warn!(%namespace_uuid, error = %err, "tool search config read failed");
                ApiResponse::fail(err.to_string())
            }
        }
    }

    /// Create or replace the namespace's search tuning.
    ///
    /// Validation failures are reported in-band; store errors (foreign key
    /// violations included) are re-raised.
    pub async fn upsert(
        &self,
        request: UpsertToolSearchConfigRequest,
        caller_user_id: Option<&str>,
    ) -> Result<ApiResponse<ToolSearchConfig>, StoreError> {
        if !ToolSearchConfig::max_results_in_bounds(request.max_results) {
            return Ok(ApiResponse::fail(format!(
                "max_results must be within [{}, {}], got {}",
                ToolSearchConfig::MIN_RESULTS,
                ToolSearchConfig::MAX_RESULTS,
                request.max_results
            )));
        }

        // The ownership check needs the namespace row. When it is absent the
        // store's foreign-key error is the authoritative answer.
        if let Some(namespace) = self
            .service
            .store()
            .find_namespace(request.namespace_uuid)
            .await?
        {
            if !self.policy.can_modify(&namespace, caller_user_id) {
                return Ok(ApiResponse::fail("Access denied"));
            }
            if let Err(message) = validate_provider_config(
                namespace.default_search_method,
                request.provider_config.as_ref(),
            ) {
                return Ok(ApiResponse::fail(message));
            }
        }

        let stored = self
            .service
            .upsert_tool_search_config(ToolSearchConfig {
                namespace_uuid: request.namespace_uuid,
                max_results: request.max_results,
                provider_config: request.provider_config,
            })
            .await?;
        Ok(ApiResponse::ok(stored))
    }

    /// Pin or release the defer-loading behavior of one mapped tool.
    pub async fn update_tool_defer_loading(
        &self,
        request: UpdateToolDeferLoadingRequest,
        caller_user_id: Option<&str>,
    ) -> ApiResponse<()> {
        let namespace = match self
            .service
            .store()
            .find_namespace(request.namespace_uuid)
            .await
        {
            Ok(Some(namespace)) => namespace,
            Ok(None) => return ApiResponse::fail("Namespace not found"),
            Err(err) => return ApiResponse::fail(err.to_string()),
        };

        if !self.policy.can_modify(&namespace, caller_user_id) {
            return ApiResponse::fail("Access denied");
        }

        match self
            .service
            .update_tool_defer_loading(
                request.namespace_uuid,
                request.tool_uuid,
                request.server_uuid,
                request.defer_loading,
            )
            .await
        {
            Ok(()) => ApiResponse::ok_empty(),
            Err(StoreError::NotFound(_)) => ApiResponse::fail("Tool not found in namespace"),
            Err(err) => ApiResponse::fail(err.to_string()),
        }
    }
}

/// Shape-check `provider_config` against the namespace's current method.
/// REGEX and NONE accept free-form objects.
fn validate_provider_config(method: SearchMethod, config: Option<&Value>) -> Result<(), String> {
    let Some(config) = config else {
        return Ok(());
    };
    if !config.is_object() {
        return Err("provider_config must be a JSON object".to_string());
    }
    match method {
        SearchMethod::Bm25 => serde_json::from_value::<Bm25Params>(config.clone())
            .map_err(|err| format!("invalid BM25 provider_config: {err}"))?
            .validate(),
        SearchMethod::Embeddings => serde_json::from_value::<EmbeddingsParams>(config.clone())
            .map_err(|err| format!("invalid EMBEDDINGS provider_config: {err}"))?
            .validate(),
        SearchMethod::None | SearchMethod::Regex => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolmux_protocol::ToolVisibilityMode;
    use toolmux_store::{ConfigResolver, MemoryStore};

    fn api_with(store: Arc<MemoryStore>) -> ToolSearchConfigApi {
        let resolver = Arc::new(ConfigResolver::new(store.clone()));
        ToolSearchConfigApi::new(Arc::new(ConfigService::new(store, resolver)))
    }

    fn namespace(owner: Option<&str>, method: SearchMethod) -> Namespace {
        Namespace {
            uuid: Uuid::new_v4(),
            name: "team".to_string(),
            owner_user_id: owner.map(str::to_string),
            default_defer_loading: true,
            default_search_method: method,
            default_tool_visibility: ToolVisibilityMode::All,
        }
    }

    fn upsert_request(namespace_uuid: Uuid, max_results: usize) -> UpsertToolSearchConfigRequest {
        UpsertToolSearchConfigRequest {
            namespace_uuid,
            max_results,
            provider_config: None,
        }
    }

    #[tokio::test]
    async fn get_returns_empty_success_for_unconfigured_namespace() {
        let store = Arc::new(MemoryStore::new());
        let ns = namespace(None, SearchMethod::Bm25);
        store.insert_namespace(ns.clone());

        let response = api_with(store).get(ns.uuid).await;
        assert!(response.success);
        assert!(response.data.is_none());
        assert!(response.message.is_none());
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let ns = namespace(None, SearchMethod::Bm25);
        store.insert_namespace(ns.clone());
        let api = api_with(store);

        let request = UpsertToolSearchConfigRequest {
            namespace_uuid: ns.uuid,
            max_results: 10,
            provider_config: Some(json!({"k1": 0.9, "b": 0.4})),
        };
        let first = api
            .upsert(request.clone(), None)
            .await
            .expect("no store error");
        assert!(first.success);

        // Idempotence: repeating the upsert changes nothing.
        let second = api
            .upsert(request.clone(), None)
            .await
            .expect("no store error");
        assert_eq!(first.data, second.data);

        let fetched = api.get(ns.uuid).await;
        let data = fetched.data.expect("stored config");
        assert_eq!(data.max_results, 10);
        assert_eq!(data.provider_config, request.provider_config);
    }

    #[tokio::test]
    async fn upsert_enforces_max_results_bounds() {
        let store = Arc::new(MemoryStore::new());
        let ns = namespace(None, SearchMethod::Bm25);
        store.insert_namespace(ns.clone());
        let api = api_with(store);

        for ok in [1, 20] {
            let response = api
                .upsert(upsert_request(ns.uuid, ok), None)
                .await
                .expect("no store error");
            assert!(response.success, "max_results={ok} must be accepted");
        }
        for bad in [0, 21] {
            let response = api
                .upsert(upsert_request(ns.uuid, bad), None)
                .await
                .expect("no store error");
            assert!(!response.success, "max_results={bad} must be rejected");
            assert!(response.message.expect("message").contains("max_results"));
        }
    }

    #[tokio::test]
    async fn upsert_validates_bm25_parameter_ranges() {
        let store = Arc::new(MemoryStore::new());
        let ns = namespace(None, SearchMethod::Bm25);
        store.insert_namespace(ns.clone());
        let api = api_with(store);

        for bad in [json!({"k1": 3.5}), json!({"b": 1.2}), json!({"k1": -0.1})] {
            let response = api
                .upsert(
                    UpsertToolSearchConfigRequest {
                        namespace_uuid: ns.uuid,
                        max_results: 5,
                        provider_config: Some(bad.clone()),
                    },
                    None,
                )
                .await
                .expect("no store error");
            assert!(!response.success, "config {bad} must be rejected");
        }

        let ok = api
            .upsert(
                UpsertToolSearchConfigRequest {
                    namespace_uuid: ns.uuid,
                    max_results: 5,
                    provider_config: Some(json!({"k1": 3.0, "b": 1.0})),
                },
                None,
            )
            .await
            .expect("no store error");
        assert!(ok.success);
    }

    #[tokio::test]
    async fn upsert_accepts_free_form_config_for_regex() {
        let store = Arc::new(MemoryStore::new());
        let ns = namespace(None, SearchMethod::Regex);
        store.insert_namespace(ns.clone());
        let api = api_with(store);

        let response = api
            .upsert(
                UpsertToolSearchConfigRequest {
                    namespace_uuid: ns.uuid,
                    max_results: 5,
                    provider_config: Some(json!({"pattern": "^file", "custom": 1})),
                },
                None,
            )
            .await
            .expect("no store error");
        assert!(response.success);
    }

    #[tokio::test]
    async fn upsert_reraises_foreign_key_errors() {
        let store = Arc::new(MemoryStore::new());
        let api = api_with(store);

        let err = api
            .upsert(upsert_request(Uuid::new_v4(), 5), None)
            .await
            .expect_err("missing namespace is a store error");
        assert!(matches!(err, StoreError::ForeignKey(_)));
    }

    #[tokio::test]
    async fn owned_namespace_rejects_other_callers() {
        let store = Arc::new(MemoryStore::new());
        let ns = namespace(Some("alice"), SearchMethod::Bm25);
        store.insert_namespace(ns.clone());
        let api = api_with(store);

        let denied = api
            .upsert(upsert_request(ns.uuid, 5), Some("mallory"))
            .await
            .expect("no store error");
        assert!(!denied.success);
        assert_eq!(denied.message.as_deref(), Some("Access denied"));

        let allowed = api
            .upsert(upsert_request(ns.uuid, 5), Some("alice"))
            .await
            .expect("no store error");
        assert!(allowed.success);
    }

    #[tokio::test]
    async fn update_defer_loading_reports_missing_namespace_and_tool() {
        let store = Arc::new(MemoryStore::new());
        let ns = namespace(None, SearchMethod::Bm25);
        store.insert_namespace(ns.clone());
        let api = api_with(store);

        let response = api
            .update_tool_defer_loading(
                UpdateToolDeferLoadingRequest {
                    namespace_uuid: Uuid::new_v4(),
                    tool_uuid: Uuid::new_v4(),
                    server_uuid: Uuid::new_v4(),
                    defer_loading: DeferLoadingBehavior::Enabled,
                },
                None,
            )
            .await;
        assert_eq!(response.message.as_deref(), Some("Namespace not found"));

        let response = api
            .update_tool_defer_loading(
                UpdateToolDeferLoadingRequest {
                    namespace_uuid: ns.uuid,
                    tool_uuid: Uuid::new_v4(),
                    server_uuid: Uuid::new_v4(),
                    defer_loading: DeferLoadingBehavior::Enabled,
                },
                None,
            )
            .await;
        assert_eq!(
            response.message.as_deref(),
            Some("Tool not found in namespace")
        );
    }

    #[tokio::test]
    async fn update_defer_loading_honors_ownership() {
        use toolmux_protocol::{MappingStatus, ToolMapping};
        use toolmux_store::{ServerRecord, ToolRecord};

        let store = Arc::new(MemoryStore::new());
        let ns = namespace(Some("alice"), SearchMethod::Bm25);
        store.insert_namespace(ns.clone());

        let server_uuid = Uuid::new_v4();
        let tool_uuid = Uuid::new_v4();
        store
            .insert_server(ServerRecord {
                uuid: server_uuid,
                name: "filesystem".to_string(),
            })
            .expect("server");
        store
            .insert_tool(ToolRecord {
                uuid: tool_uuid,
                server_uuid,
                name: "read_file".to_string(),
                description: None,
                input_schema: None,
            })
            .expect("tool");
        store
            .insert_mapping(ToolMapping {
                namespace_uuid: ns.uuid,
                tool_uuid,
                server_uuid,
                status: MappingStatus::Active,
                defer_loading: DeferLoadingBehavior::Inherit,
            })
            .expect("mapping");

        let api = api_with(store);
        let request = UpdateToolDeferLoadingRequest {
            namespace_uuid: ns.uuid,
            tool_uuid,
            server_uuid,
            defer_loading: DeferLoadingBehavior::Disabled,
        };

        let denied = api
            .update_tool_defer_loading(request.clone(), Some("mallory"))
            .await;
        assert_eq!(denied.message.as_deref(), Some("Access denied"));

        let allowed = api
            .update_tool_defer_loading(request, Some("alice"))
            .await;
        assert!(allowed.success);
    }
}
