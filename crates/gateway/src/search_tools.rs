use serde::Deserialize;
use serde_json::Value;

use toolmux_protocol::{AvailableTool, CallResult, ContentBlock, ResolvedConfig, ToolSearchConfig};
use toolmux_search::{SearchQuery, SearchService, ToolMatch};

use crate::error::{GatewayError, Result};

const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Deserialize)]
struct SearchToolsArgs {
    query: String,
    /// Wire type is `number`; fractional values are floored.
    #[serde(default)]
    max_results: Option<f64>,
}

/// Run the built-in `search_tools`.
///
/// Argument errors surface as `Err`; provider failures propagate to the
/// caller rather than being swallowed into an `isError` result.
pub async fn run_search_tools(
    args: &Value,
    resolved: &ResolvedConfig,
    service: &SearchService,
    available: &[AvailableTool],
    namespace_uuid: Option<uuid::Uuid>,
    endpoint_uuid: Option<uuid::Uuid>,
) -> Result<CallResult> {
    let args: SearchToolsArgs =
        serde_json::from_value(args.clone()).map_err(|err| GatewayError::InvalidArguments {
            tool: "search_tools",
            message: err.to_string(),
        })?;

    let max_results = match args.max_results {
        Some(value) => {
            let floored = value.floor();
            if !(ToolSearchConfig::MIN_RESULTS as f64..=ToolSearchConfig::MAX_RESULTS as f64)
                .contains(&floored)
            {
                return Err(GatewayError::InvalidArguments {
                    tool: "search_tools",
                    message: format!(
                        "max_results must be within [{}, {}], got {value}",
                        ToolSearchConfig::MIN_RESULTS,
                        ToolSearchConfig::MAX_RESULTS
                    ),
                });
            }
            Some(floored as usize)
        }
        None => None,
    };

    let query = SearchQuery {
        query: args.query,
        max_results,
        namespace_uuid,
        endpoint_uuid,
    };

    let matches = service.search(query, available, resolved).await?;
    Ok(CallResult::success(
        matches.iter().map(reference_block).collect(),
    ))
}

fn reference_block(hit: &ToolMatch) -> ContentBlock {
    let description = hit.tool.description.as_deref().unwrap_or(NO_DESCRIPTION);
    ContentBlock::ToolReference {
        name: hit.tool.name.clone(),
        description: format!(
            "{description} (score: {:.2}, {})",
            hit.score, hit.match_reason
        ),
    }
}
