//! Case splitting.
//!
//! A flow's action log is partitioned into [`Case`]s, each ending at a
//! merge-approval action. The split is deterministic regardless of the
//! order actions were supplied in.
//!
//! # Algorithm
//!
//! 1. Sort actions by `(created, id)` ascending.
//! 2. Accumulate actions into a buffer.
//! 3. On a merge approval, close a case whose id is the approval's id and
//!    whose index is a running counter, then reset the buffer.
//! 4. Drop whatever remains after the final approval.

use crate::models::{Action, Case};

/// Split a flow's actions into cases.
///
/// Returns an empty vector when no merge approval is present.
pub fn split_cases(actions: &[Action]) -> Vec<Case> {
    let mut ordered: Vec<&Action> = actions.iter().collect();
    ordered.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));

    let mut cases = Vec::new();
    let mut buffer: Vec<Action> = Vec::new();

    for action in ordered {
        buffer.push(action.clone());
        if action.is_merge_approval() {
            cases.push(Case {
                id: action.id.clone(),
                index: cases.len(),
                flow_id: action.flow_id.clone(),
                actions: std::mem::take(&mut buffer),
            });
        }
    }

    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MERGE_APPROVAL_ACTION_TYPE;
    use chrono::{TimeZone, Utc};

    fn action(id: &str, action_type: &str, secs: i64) -> Action {
        Action {
            id: id.to_string(),
            workspace_id: "ws".to_string(),
            flow_id: "flow1".to_string(),
            action_type: action_type.to_string(),
            params: serde_json::Map::new(),
            result: String::new(),
            status: "complete".to_string(),
            created: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn ids(case: &Case) -> Vec<&str> {
        case.actions.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(split_cases(&[]).is_empty());
    }

    #[test]
    fn test_no_merge_approval() {
        let actions = vec![
            action("a1", "tool_call.read_file_lines", 1),
            action("a2", "tool_call.bulk_search_repository", 2),
        ];
        assert!(split_cases(&actions).is_empty());
    }

    #[test]
    fn test_trailing_actions_dropped() {
        let actions = vec![
            action("a1", "tool_call.read_file_lines", 0),
            action("m1", MERGE_APPROVAL_ACTION_TYPE, 0),
            action("a2", "tool_call.read_file_lines", 0),
        ];
        let cases = split_cases(&actions);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "m1");
        assert_eq!(cases[0].index, 0);
        assert_eq!(ids(&cases[0]), vec!["a1", "m1"]);
    }

    #[test]
    fn test_multiple_cases_indexed() {
        let actions = vec![
            action("a1", "tool_call.read_file_lines", 1),
            action("m1", MERGE_APPROVAL_ACTION_TYPE, 2),
            action("a2", "tool_call.read_file_lines", 3),
            action("a3", "user_request.feedback", 4),
            action("m2", MERGE_APPROVAL_ACTION_TYPE, 5),
        ];
        let cases = split_cases(&actions);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].id, "m2");
        assert_eq!(cases[1].index, 1);
        assert_eq!(cases[1].flow_id, "flow1");
        assert_eq!(ids(&cases[1]), vec!["a2", "a3", "m2"]);
    }

    #[test]
    fn test_every_case_ends_with_merge_approval() {
        let actions = vec![
            action("m0", MERGE_APPROVAL_ACTION_TYPE, 1),
            action("a1", "tool_call.read_file_lines", 2),
            action("m1", MERGE_APPROVAL_ACTION_TYPE, 3),
        ];
        let cases = split_cases(&actions);
        assert_eq!(cases.len(), 2);
        for case in &cases {
            assert!(!case.actions.is_empty());
            assert!(case.merge_approval().is_some());
        }
        assert_eq!(ids(&cases[0]), vec!["m0"]);
    }

    #[test]
    fn test_order_independent() {
        let actions = vec![
            action("b", "tool_call.read_file_lines", 5),
            action("a", "tool_call.read_file_lines", 5),
            action("m1", MERGE_APPROVAL_ACTION_TYPE, 6),
            action("c", "tool_call.retrieve_code_context", 7),
            action("m2", MERGE_APPROVAL_ACTION_TYPE, 8),
            action("z", "tool_call.read_file_lines", 1),
        ];
        let expected = split_cases(&actions);

        let mut reversed = actions.clone();
        reversed.reverse();
        assert_eq!(split_cases(&reversed), expected);

        let mut rotated = actions.clone();
        rotated.rotate_left(3);
        assert_eq!(split_cases(&rotated), expected);

        assert_eq!(ids(&expected[0]), vec!["z", "a", "b", "m1"]);
    }

    #[test]
    fn test_idempotent() {
        let actions = vec![
            action("a1", "tool_call.read_file_lines", 1),
            action("m1", MERGE_APPROVAL_ACTION_TYPE, 2),
        ];
        let first = split_cases(&actions);
        let flattened: Vec<Action> = first.iter().flat_map(|c| c.actions.clone()).collect();
        assert_eq!(split_cases(&flattened), first);
    }
}
