use async_trait::async_trait;
use serde_json::Value;

use toolmux_protocol::CallResult;

/// Seam to the actual proxying layer.
///
/// `execute_tool` validates arguments and then hands the call here; whatever
/// the implementation returns is passed back to the client verbatim. Errors
/// are rendered into `isError` results by the caller, never rethrown.
#[async_trait]
pub trait ToolProxy: Send + Sync {
    async fn call_tool(&self, tool_name: &str, arguments: &Value) -> anyhow::Result<CallResult>;
}
