use toolmux_protocol::{ResolvedConfig, SearchMethod, ToolDef, ToolVisibilityMode};

use crate::builtin::{is_builtin_tool, search_tools_definition, SEARCH_TOOLS_NAME};

/// Rewrite an upstream tool list for advertisement under `resolved`.
///
/// Three passes, in order: inject `search_tools` when discovery is on, apply
/// the `defer_loading` hint per tool, then filter by visibility. Upstream
/// definitions are never mutated; flagging always clones. The pipeline is
/// pure, so re-applying it to its own output is a no-op.
pub fn advertise_tools(resolved: &ResolvedConfig, upstream: &[ToolDef]) -> Vec<ToolDef> {
    let mut tools: Vec<ToolDef> = upstream.to_vec();

    // search_tools is advertised iff deferred loading is on and a search
    // method exists to back it. The name guard keeps re-application from
    // duplicating the entry.
    if resolved.defer_loading_enabled
        && resolved.search_method != SearchMethod::None
        && !tools.iter().any(|tool| tool.name == SEARCH_TOOLS_NAME)
    {
        tools.push(search_tools_definition());
    }

    let flagged: Vec<ToolDef> = tools.into_iter().map(|tool| flag_tool(resolved, tool)).collect();

    match resolved.tool_visibility {
        ToolVisibilityMode::All => flagged,
        ToolVisibilityMode::SearchOnly => flagged
            .into_iter()
            .filter(|tool| is_builtin_tool(&tool.name))
            .collect(),
    }
}

fn flag_tool(resolved: &ResolvedConfig, tool: ToolDef) -> ToolDef {
    if tool.name == SEARCH_TOOLS_NAME {
        return tool;
    }
    match resolved.tool_overrides.get(&tool.name) {
        Some(false) => tool,
        Some(true) => tool.deferred(),
        None if resolved.defer_loading_enabled => tool.deferred(),
        None => tool,
    }
}
