use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod config;
mod names;
mod resolved;
mod wire;

pub use config::{
    Bm25Params, DeferLoadingBehavior, EmbeddingsParams, Endpoint, MappingStatus, Namespace,
    SearchMethod, SearchMethodOverride, ToolMapping, ToolSearchConfig, ToolVisibilityMode,
    ToolVisibilityOverride,
};
pub use names::{public_tool_name, sanitize_server_name, PUBLIC_NAME_SEPARATOR};
pub use resolved::{resolve, ResolvedConfig};
pub use wire::{AvailableTool, CallResult, ContentBlock, ToolDef};

/// Envelope returned by the config CRUD surface.
///
/// `success: true` with `data: None` means "nothing stored yet", not an
/// error; failures carry a human-readable `message` instead of data.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}
