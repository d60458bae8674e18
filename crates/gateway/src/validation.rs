use serde_json::{json, Value};

/// One argument-validation failure, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer into the offending argument, or `(root)`.
    pub path: String,
    pub message: String,
}

/// Validate `arguments` against a tool's `inputSchema`.
///
/// The validator is deliberately permissive: unknown keywords are tolerated
/// (upstream schemas use extensions this crate has never heard of), every
/// error is collected rather than just the first, a missing schema accepts
/// any object, and a schema that fails to compile is reported as a single
/// violation instead of an internal error.
pub fn validate_tool_arguments(schema: Option<&Value>, arguments: &Value) -> Vec<SchemaViolation> {
    let permissive;
    let schema = match schema {
        Some(schema) => schema,
        None => {
            permissive = json!({"type": "object", "additionalProperties": true});
            &permissive
        }
    };

    let validator = match jsonschema::options().build(schema) {
        Ok(validator) => validator,
        Err(err) => {
            return vec![SchemaViolation {
                path: "(root)".to_string(),
                message: format!("Invalid tool schema: {err}"),
            }];
        }
    };

    validator
        .iter_errors(arguments)
        .map(|err| {
            let pointer = err.instance_path.to_string();
            SchemaViolation {
                path: if pointer.is_empty() {
                    "(root)".to_string()
                } else {
                    pointer
                },
                message: err.to_string(),
            }
        })
        .collect()
}

const MAX_REPORTED_ERRORS: usize = 10;

/// Render violations the way clients see them: capped list, overflow hint,
/// then the schema the arguments were expected to satisfy.
pub fn format_validation_failure(
    tool_name: &str,
    violations: &[SchemaViolation],
    schema: &Value,
) -> String {
    let mut lines = vec![format!("Arguments validation failed for tool \"{tool_name}\":")];
    for violation in violations.iter().take(MAX_REPORTED_ERRORS) {
        lines.push(format!("  - {}: {}", violation.path, violation.message));
    }
    if violations.len() > MAX_REPORTED_ERRORS {
        lines.push(format!(
            "  ... and {} more errors",
            violations.len() - MAX_REPORTED_ERRORS
        ));
    }
    lines.push(String::new());
    lines.push("Expected input schema:".to_string());
    lines.push(serde_json::to_string_pretty(schema).unwrap_or_default());
    lines.join("\n")
}
