//! Tool-call extraction.
//!
//! Every allow-listed `tool_call.*` action in a case becomes a
//! [`ToolCallSpec`]. Arguments are stored as canonical JSON and decoded
//! against the tool's schema; a failed decode is kept as `parse_error` and
//! never stops extraction.

use serde_json::Value;

use crate::models::{Action, ToolCallSpec};
use crate::tool_args::{decode_tool_args, is_allowed_tool};

/// Build specs for the allow-listed tool calls among `actions`, in order.
pub fn extract_tool_calls(actions: &[Action]) -> Vec<ToolCallSpec> {
    actions
        .iter()
        .filter_map(|action| {
            let tool = action.tool_name()?;
            if !is_allowed_tool(tool) {
                return None;
            }
            Some(build_spec(action, tool))
        })
        .collect()
}

fn build_spec(action: &Action, tool: &str) -> ToolCallSpec {
    let raw = Value::Object(action.params.clone());
    // serde_json's default map is ordered by key, so this is canonical.
    let arguments = raw.to_string();

    let (parsed_arguments, parse_error) = match decode_tool_args(tool, &raw) {
        Ok(args) => (Some(args), String::new()),
        Err(err) => {
            tracing::warn!(
                action_id = %action.id,
                tool = tool,
                error = %err,
                "tool arguments did not match schema"
            );
            (None, err)
        }
    };

    ToolCallSpec {
        tool_name: tool.to_string(),
        action_id: action.id.clone(),
        arguments,
        parsed_arguments,
        parse_error,
        result: if action.result.is_empty() {
            None
        } else {
            Some(action.result.clone())
        },
    }
}

/// Path-like string values in raw argument JSON.
///
/// Used when the typed decode failed. Collects values under `file_path`,
/// `filePath` and `path` keys at any depth, in key order.
pub fn raw_argument_paths(arguments: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(arguments) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    collect_path_values(&value, &mut out);
    out
}

fn collect_path_values(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match (key.as_str(), v) {
                    ("file_path" | "filePath" | "path", Value::String(s)) => {
                        if !out.contains(s) {
                            out.push(s.clone());
                        }
                    }
                    _ => collect_path_values(v, out),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_path_values(item, out);
            }
        }
        _ => {}
    }
}
