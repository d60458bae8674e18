use serde_json::json;
use toolmux_protocol::ToolDef;

/// Public name of the built-in discovery tool. Spelled identically by
/// clients, the middleware, and the `execute_tool` recursion guard.
pub const SEARCH_TOOLS_NAME: &str = "search_tools";

/// Public name of the built-in dispatch tool.
pub const EXECUTE_TOOL_NAME: &str = "execute_tool";

/// Built-in detection goes by name, never by tool metadata: a malicious or
/// confused upstream could advertise look-alike metadata, but it cannot own
/// these names.
pub fn is_builtin_tool(name: &str) -> bool {
    name == SEARCH_TOOLS_NAME || name == EXECUTE_TOOL_NAME
}

/// Advertised definition of `search_tools`. Never carries `defer_loading`.
pub fn search_tools_definition() -> ToolDef {
    ToolDef::new(SEARCH_TOOLS_NAME)
        .with_description(
            "Search the tools available through this endpoint. Returns ranked \
             tool references; pass the returned name to execute_tool to invoke one.",
        )
        .with_input_schema(json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": { "type": "string" },
                "max_results": { "type": "number", "minimum": 1, "maximum": 20 }
            }
        }))
}

/// Definition of `execute_tool`. Invokable by name even when unadvertised.
pub fn execute_tool_definition() -> ToolDef {
    ToolDef::new(EXECUTE_TOOL_NAME)
        .with_description(
            "Execute a tool discovered via search_tools, addressed by its public name.",
        )
        .with_input_schema(json!({
            "type": "object",
            "required": ["tool_name", "arguments"],
            "properties": {
                "tool_name": { "type": "string" },
                "arguments": { "type": "object", "additionalProperties": true }
            }
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_are_detected() {
        assert!(is_builtin_tool("search_tools"));
        assert!(is_builtin_tool("execute_tool"));
        assert!(!is_builtin_tool("filesystem__read_file"));
        assert!(!is_builtin_tool("Search_Tools"));
    }

    #[test]
    fn builtin_definitions_never_carry_defer_loading() {
        assert_eq!(search_tools_definition().defer_loading, None);
        assert_eq!(execute_tool_definition().defer_loading, None);
    }

    #[test]
    fn search_tools_schema_shape() {
        let def = search_tools_definition();
        let schema = def.input_schema.expect("schema");
        assert_eq!(schema["required"], serde_json::json!(["query"]));
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["max_results"]["minimum"], 1);
        assert_eq!(schema["properties"]["max_results"]["maximum"], 20);
    }

    #[test]
    fn execute_tool_schema_requires_name_and_arguments() {
        let def = execute_tool_definition();
        let schema = def.input_schema.expect("schema");
        assert_eq!(
            schema["required"],
            serde_json::json!(["tool_name", "arguments"])
        );
        assert_eq!(
            schema["properties"]["arguments"]["additionalProperties"],
            serde_json::json!(true)
        );
    }
}
