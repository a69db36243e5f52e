//! File-path extraction.

use std::collections::HashMap;

use super::result_text::result_paths;
use super::tool_calls::raw_argument_paths;
use super::{normalize_path, EvidenceOptions, PathCollector};
use crate::diff::{contains_diff, parse_paths};
use crate::models::{Case, FilePath, PathSource, ToolCallSpec};

/// Collect every file path a case touched or looked at.
///
/// Golden paths from `merge_diff` come first, tagged `review_merge_diff`.
/// Then, walking the case in action order:
///
/// - allow-listed tool calls contribute the file paths in their arguments
///   (`tool_call_args`) and the paths named in their result text
///   (`tool_call_result`);
/// - any other action whose result holds a diff contributes that diff's
///   paths (`diff`).
pub fn extract_file_paths(
    case: &Case,
    merge_diff: Option<&str>,
    tool_calls: &[ToolCallSpec],
    options: &EvidenceOptions,
) -> Vec<FilePath> {
    let mut collector = PathCollector::new();

    if let Some(diff) = merge_diff {
        for path in parse_paths(diff) {
            collector.add(path, PathSource::ReviewMergeDiff);
        }
    }

    let by_action: HashMap<&str, &ToolCallSpec> = tool_calls
        .iter()
        .map(|call| (call.action_id.as_str(), call))
        .collect();

    for action in &case.actions {
        if action.is_merge_approval() {
            continue;
        }

        if let Some(call) = by_action.get(action.id.as_str()) {
            for raw in argument_paths(call) {
                if let Some(path) = normalize_path(&raw, &options.strip_prefixes) {
                    collector.add(path, PathSource::ToolCallArgs);
                }
            }
            if let Some(result) = &call.result {
                for raw in result_paths(result) {
                    if let Some(path) = normalize_path(&raw, &options.strip_prefixes) {
                        collector.add(path, PathSource::ToolCallResult);
                    }
                }
            }
            continue;
        }

        if contains_diff(&action.result) {
            for path in parse_paths(&action.result) {
                collector.add(path, PathSource::Diff);
            }
        }
    }

    collector.into_items()
}

/// Explicit file paths in a call's arguments: typed when the decode
/// succeeded, raw JSON otherwise.
pub fn argument_paths(call: &ToolCallSpec) -> Vec<String> {
    match &call.parsed_arguments {
        Some(args) => args.file_paths().into_iter().map(str::to_string).collect(),
        None => raw_argument_paths(&call.arguments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tool_calls::extract_tool_calls;
    use crate::models::{Action, MERGE_APPROVAL_ACTION_TYPE};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn action(id: &str, action_type: &str, params: Value, result: &str, secs: i64) -> Action {
        Action {
            id: id.into(),
            workspace_id: "ws".into(),
            flow_id: "f1".into(),
            action_type: action_type.into(),
            params: params.as_object().cloned().unwrap_or_default(),
            result: result.into(),
            status: "complete".into(),
            created: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    const MERGE_DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n@@ -1,2 +1,3 @@\n a\n+b\n c\n";

    fn sample_case() -> Case {
        let actions = vec![
            action(
                "a1",
                "tool_call.bulk_search_repository",
                json!({"searches": [{"search_term": "connect", "path_glob": "src/**"}]}),
                "src/db.rs:12:fn connect()\nsrc/lib.rs:3:mod db;",
                1,
            ),
            action(
                "a2",
                "tool_call.read_file_lines",
                json!({"file_lines": [{"file_path": "./src/db.rs", "line_number": 12}]}),
                "File: src/db.rs\nLines: 1-40",
                2,
            ),
            action(
                "a3",
                "code_diff",
                json!({}),
                "diff --git a/README.md b/README.md\n@@ -1 +1 @@\n",
                3,
            ),
            action(
                "a4",
                "tool_call.retrieve_code_context",
                json!({"code_context_requests": "broken"}),
                "",
                4,
            ),
            action(
                "m1",
                MERGE_APPROVAL_ACTION_TYPE,
                json!({"diff": MERGE_DIFF}),
                "",
                5,
            ),
        ];
        Case {
            id: "m1".into(),
            index: 0,
            flow_id: "f1".into(),
            actions,
        }
    }

    #[test]
    fn golden_first_then_first_seen() {
        let case = sample_case();
        let calls = extract_tool_calls(&case.actions);
        let paths = extract_file_paths(&case, Some(MERGE_DIFF), &calls, &EvidenceOptions::default());
        let names: Vec<&str> = paths.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(names, vec!["src/lib.rs", "src/db.rs", "README.md"]);
        assert_eq!(
            paths[0].sources,
            vec![PathSource::ReviewMergeDiff, PathSource::ToolCallResult]
        );
        assert_eq!(
            paths[1].sources,
            vec![PathSource::ToolCallResult, PathSource::ToolCallArgs]
        );
        assert_eq!(paths[2].sources, vec![PathSource::Diff]);
    }

    #[test]
    fn globs_are_not_paths() {
        let case = sample_case();
        let calls = extract_tool_calls(&case.actions);
        let paths = extract_file_paths(&case, None, &calls, &EvidenceOptions::default());
        assert!(paths.iter().all(|p| p.path != "src/**"));
        assert!(paths.iter().all(|p| !p.is_golden()));
    }

    #[test]
    fn raw_fallback_used_when_decode_fails() {
        let call = ToolCallSpec {
            tool_name: "read_file_lines".into(),
            action_id: "x".into(),
            arguments: r#"{"file_lines":[{"file_path":"a.rs","line_number":"ten"}]}"#.into(),
            parsed_arguments: None,
            parse_error: "invalid type".into(),
            result: None,
        };
        assert_eq!(argument_paths(&call), vec!["a.rs"]);
    }
}
