use serde_json::{Map, Value};

use toolmux_protocol::{CallResult, ToolDef};

use crate::builtin::{is_builtin_tool, SEARCH_TOOLS_NAME};
use crate::proxy::ToolProxy;
use crate::validation::{format_validation_failure, validate_tool_arguments};

const MAX_LISTED_CANDIDATES: usize = 10;

/// Run the built-in `execute_tool`.
///
/// Never returns an error: every failure mode becomes an `isError` result
/// with human-readable text. The happy path delegates to the proxy and
/// passes its result through verbatim.
pub async fn run_execute_tool(
    args: &Value,
    candidates: &[ToolDef],
    proxy: &dyn ToolProxy,
) -> CallResult {
    let Some((tool_name, arguments)) = parse_args(args) else {
        return CallResult::error(
            "Invalid arguments for execute_tool: expected an object with \
             \"tool_name\" (string) and \"arguments\" (object).",
        );
    };

    // Refuse the built-ins by name before any lookup; a pool entry with a
    // colliding name must not open a recursion path.
    if is_builtin_tool(tool_name) {
        return CallResult::error(format!("Cannot execute builtin tool \"{tool_name}\""));
    }

    let Some(tool) = candidates.iter().find(|tool| tool.name == tool_name) else {
        return CallResult::error(not_found_message(tool_name, candidates));
    };

    let argument_value = Value::Object(arguments.clone());
    let violations = validate_tool_arguments(tool.input_schema.as_ref(), &argument_value);
    if !violations.is_empty() {
        let schema = tool
            .input_schema
            .clone()
            .unwrap_or_else(|| serde_json::json!({"type": "object", "additionalProperties": true}));
        return CallResult::error(format_validation_failure(tool_name, &violations, &schema));
    }

    match proxy.call_tool(tool_name, &argument_value).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(tool = tool_name, error = %err, "upstream tool invocation failed");
            CallResult::error(format!("Error executing tool \"{tool_name}\": {err}"))
        }
    }
}

/// Arguments are valid only as `{tool_name: string, arguments: object}`;
/// `arguments: null` is rejected rather than coerced.
fn parse_args(args: &Value) -> Option<(&str, &Map<String, Value>)> {
    let object = args.as_object()?;
    let tool_name = object.get("tool_name")?.as_str()?;
    let arguments = object.get("arguments")?.as_object()?;
    Some((tool_name, arguments))
}

fn not_found_message(tool_name: &str, candidates: &[ToolDef]) -> String {
    let mut lines = vec![format!("Tool \"{tool_name}\" not found.")];
    if !candidates.is_empty() {
        lines.push(String::new());
        lines.push("Available tools include:".to_string());
        for tool in candidates.iter().take(MAX_LISTED_CANDIDATES) {
            lines.push(format!("  - {}", tool.name));
        }
        if candidates.len() > MAX_LISTED_CANDIDATES {
            lines.push(format!(
                "  ... and {} more tools",
                candidates.len() - MAX_LISTED_CANDIDATES
            ));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Call {SEARCH_TOOLS_NAME} to discover available tools."
    ));
    lines.join("\n")
}
