//! Line-range extraction.

use std::collections::HashMap;

use super::result_text::parse_result_refs;
use super::{normalize_path, EvidenceOptions, RangeCollector};
use crate::diff::diff_line_ranges;
use crate::models::{Case, FileLineRange, RangeSource, ToolCallSpec};
use crate::tool_args::ToolArgs;

/// Collect the line ranges a case changed or looked at.
///
/// Golden ranges are the merge diff's hunks (`golden_diff`), sorted by
/// path. Secondary ranges, in action order:
///
/// - each `read_file_lines` request yields `[n - w/2, n + w/2]` clamped at
///   line 1 (`tool_call_args`), where `w` is the call's own `window_size` or
///   [`EvidenceOptions::window_size`];
/// - result text yields `File:`/`Lines:` headers and single-line ripgrep
///   matches (`tool_call_result`).
pub fn extract_line_ranges(
    case: &Case,
    merge_diff: Option<&str>,
    tool_calls: &[ToolCallSpec],
    options: &EvidenceOptions,
) -> Vec<FileLineRange> {
    let mut collector = RangeCollector::new();

    if let Some(diff) = merge_diff {
        for (path, start, end) in diff_line_ranges(diff) {
            collector.add(path, start, end, RangeSource::GoldenDiff);
        }
    }

    let by_action: HashMap<&str, &ToolCallSpec> = tool_calls
        .iter()
        .map(|call| (call.action_id.as_str(), call))
        .collect();

    for action in &case.actions {
        let Some(call) = by_action.get(action.id.as_str()) else {
            continue;
        };

        if let Some(ToolArgs::ReadFileLines(args)) = &call.parsed_arguments {
            let window = args
                .window_size
                .filter(|w| *w > 0)
                .unwrap_or(options.window_size);
            for request in &args.file_lines {
                let Some(path) = normalize_path(&request.file_path, &options.strip_prefixes)
                else {
                    continue;
                };
                let (start, end) = window_around(request.line_number, window);
                collector.add(path, start, end, RangeSource::ToolCallArgs);
            }
        }

        if let Some(result) = &call.result {
            for r in parse_result_refs(result) {
                let Some((start, end)) = r.lines else {
                    continue;
                };
                if let Some(path) = normalize_path(&r.path, &options.strip_prefixes) {
                    collector.add(path, start, end, RangeSource::ToolCallResult);
                }
            }
        }
    }

    collector.into_items()
}

/// Inclusive window of `window` lines centred on `line`, clamped at 1.
pub fn window_around(line: u32, window: u32) -> (u32, u32) {
    let line = line.max(1);
    let half = window / 2;
    (line.saturating_sub(half).max(1), line.saturating_add(half))
}
