use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between the sanitized server name and the upstream tool name.
pub const PUBLIC_NAME_SEPARATOR: &str = "__";

static NON_WORD_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static pattern must compile"));

/// Normalize an upstream server name for use in public tool names.
///
/// Trims surrounding whitespace and collapses every run of non-word
/// characters into a single underscore. The mapping must stay stable: the
/// same function feeds overrides, search results, and dispatch.
pub fn sanitize_server_name(name: &str) -> String {
    NON_WORD_RUN.replace_all(name.trim(), "_").into_owned()
}

/// Canonical public name of an aggregated tool: `sanitize(server)__tool`.
pub fn public_tool_name(server_name: &str, tool_name: &str) -> String {
    format!(
        "{}{}{}",
        sanitize_server_name(server_name),
        PUBLIC_NAME_SEPARATOR,
        tool_name
    )
}
