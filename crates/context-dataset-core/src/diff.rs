//! Unified-diff parsing.
//!
//! Turns `git diff` output into the set of edited paths and the per-file
//! hunks that changed. Parsing is line oriented and lenient: anything that
//! does not match the expected grammar is skipped rather than reported, since
//! diffs come from historical logs that are not guaranteed well formed.
//!
//! # Path policy
//!
//! | Change | Paths reported | Hunks routed to |
//! |--------|----------------|-----------------|
//! | rename | old and new | new |
//! | new file | `b/` side | `b/` side |
//! | deleted file | `a/` side | `a/` side |
//! | edit | `b/` side | `b/` side |
//!
//! `/dev/null` is never reported and a leading `./` is stripped.
//!
//! # Example
//!
//! ```rust
//! use context_dataset_core::diff::{parse_hunks, parse_paths, Hunk};
//!
//! let diff = "diff --git a/x.go b/x.go\n@@ -1,2 +1,3 @@\n a\n+b\n c";
//! assert_eq!(parse_paths(diff), vec!["x.go".to_string()]);
//! assert_eq!(
//!     parse_hunks(diff)["x.go"],
//!     vec![Hunk { old_start: 1, old_count: 2, new_start: 1, new_count: 3 }]
//! );
//! ```

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

const GIT_HEADER_PREFIX: &str = "diff --git ";

/// How far past a `diff --git` header to look for mode/rename markers.
const HEADER_LOOKAHEAD: usize = 10;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
});

/// One contiguous changed region of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChangeKind {
    Modified,
    Added,
    Deleted,
    Renamed {
        from: Option<String>,
        to: Option<String>,
    },
}

/// One `diff --git` section.
#[derive(Debug)]
struct FileSection {
    paths: Vec<String>,
    hunk_path: Option<String>,
    hunks: Vec<Hunk>,
}

/// Edited paths in first-seen order, without duplicates.
pub fn parse_paths(diff: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    for section in parse_sections(diff) {
        for path in section.paths {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Hunks per path. Hunks within a path keep first-seen order without
/// duplicates; the map itself iterates in path order.
pub fn parse_hunks(diff: &str) -> BTreeMap<String, Vec<Hunk>> {
    let mut by_path: BTreeMap<String, Vec<Hunk>> = BTreeMap::new();
    for section in parse_sections(diff) {
        let Some(path) = section.hunk_path else {
            continue;
        };
        if section.hunks.is_empty() {
            continue;
        }
        let entry = by_path.entry(path).or_default();
        for hunk in section.hunks {
            if !entry.contains(&hunk) {
                entry.push(hunk);
            }
        }
    }
    by_path
}

/// Inclusive line interval a hunk touches.
///
/// Uses the new side; a pure deletion (`new_count == 0`) falls back to the
/// old side so the location is still flagged.
pub fn hunk_line_range(hunk: &Hunk) -> (u32, u32) {
    if hunk.new_count > 0 {
        let start = hunk.new_start.max(1);
        (start, start.saturating_add(hunk.new_count - 1))
    } else if hunk.old_count > 0 {
        let start = hunk.old_start.max(1);
        (start, start.saturating_add(hunk.old_count - 1))
    } else {
        let start = hunk.new_start.max(1);
        (start, start)
    }
}

/// `(path, start, end)` for every hunk of `diff`, sorted by path.
pub fn diff_line_ranges(diff: &str) -> Vec<(String, u32, u32)> {
    let mut ranges = Vec::new();
    for (path, hunks) in parse_hunks(diff) {
        for hunk in &hunks {
            let (start, end) = hunk_line_range(hunk);
            ranges.push((path.clone(), start, end));
        }
    }
    ranges
}

/// Whether `text` contains at least one `diff --git` header.
pub fn contains_diff(text: &str) -> bool {
    text.lines().any(|line| line.starts_with(GIT_HEADER_PREFIX))
}

fn parse_sections(diff: &str) -> Vec<FileSection> {
    let lines: Vec<&str> = diff.lines().collect();
    let mut sections: Vec<FileSection> = Vec::new();
    // Index of the section hunks attach to; `None` after a rejected header.
    let mut current: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(rest) = line.strip_prefix(GIT_HEADER_PREFIX) {
            let following = &lines[i + 1..];
            let header = split_header_paths(rest).or_else(|| marker_paths(following));
            current = match header {
                Some((a_path, b_path)) => {
                    let kind = scan_change_kind(following);
                    sections.push(build_section(a_path, b_path, kind));
                    Some(sections.len() - 1)
                }
                None => None,
            };
        } else if line.starts_with("@@") {
            let Some(section) = current.and_then(|idx| sections.get_mut(idx)) else {
                continue;
            };
            if let Some(hunk) = parse_hunk_header(line) {
                section.hunks.push(hunk);
            }
        }
    }

    sections
}

/// Paths from the `---`/`+++` lines of a section whose header could not be
/// split, as produced by `git diff --no-prefix` with unusual names.
fn marker_paths(following: &[&str]) -> Option<(String, String)> {
    let mut old = None;
    let mut new = None;
    for line in following.iter().take(HEADER_LOOKAHEAD) {
        if line.starts_with(GIT_HEADER_PREFIX) || line.starts_with("@@") {
            break;
        }
        if let Some(p) = line.strip_prefix("--- ") {
            old = Some(strip_side(&unquote(marker_path(p)), "a/"));
        } else if let Some(p) = line.strip_prefix("+++ ") {
            new = Some(strip_side(&unquote(marker_path(p)), "b/"));
        }
    }
    match (old, new) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

/// Drop the tab-separated timestamp some tools append to `---`/`+++` lines.
fn marker_path(raw: &str) -> &str {
    raw.split('\t').next().unwrap_or(raw).trim_end()
}

fn scan_change_kind(following: &[&str]) -> ChangeKind {
    let mut kind = ChangeKind::Modified;
    let mut rename_from = None;
    let mut rename_to = None;

    for line in following.iter().take(HEADER_LOOKAHEAD) {
        if line.starts_with(GIT_HEADER_PREFIX) {
            break;
        }
        if line.starts_with("new file mode") {
            kind = ChangeKind::Added;
        } else if line.starts_with("deleted file mode") {
            kind = ChangeKind::Deleted;
        } else if let Some(p) = line.strip_prefix("rename from ") {
            rename_from = Some(unquote(p.trim_end()));
        } else if let Some(p) = line.strip_prefix("rename to ") {
            rename_to = Some(unquote(p.trim_end()));
        }
    }

    if rename_from.is_some() || rename_to.is_some() {
        ChangeKind::Renamed {
            from: rename_from,
            to: rename_to,
        }
    } else {
        kind
    }
}

fn build_section(a_path: String, b_path: String, kind: ChangeKind) -> FileSection {
    let a = normalize_diff_path(&a_path);
    let b = normalize_diff_path(&b_path);

    let (paths, hunk_path) = match kind {
        ChangeKind::Renamed { from, to } => {
            let from = from.as_deref().and_then(normalize_diff_path).or(a);
            let to = to.as_deref().and_then(normalize_diff_path).or(b);
            let mut paths = Vec::new();
            paths.extend(from);
            if let Some(ref t) = to {
                paths.push(t.clone());
            }
            (paths, to)
        }
        ChangeKind::Added => (b.iter().cloned().collect(), b),
        ChangeKind::Deleted => (a.iter().cloned().collect(), a),
        ChangeKind::Modified => {
            let path = b.or(a);
            (path.iter().cloned().collect(), path)
        }
    };

    FileSection {
        paths,
        hunk_path,
        hunks: Vec::new(),
    }
}

fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let caps = HUNK_HEADER.captures(line)?;
    let number = |idx: usize| -> Option<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(1),
        }
    };
    Some(Hunk {
        old_start: number(1)?,
        old_count: number(2)?,
        new_start: number(3)?,
        new_count: number(4)?,
    })
}

/// Split the `a/<A> b/<B>` tail of a `diff --git` header.
fn split_header_paths(rest: &str) -> Option<(String, String)> {
    let rest = rest.trim_end();

    if rest.starts_with('"') {
        let (first, remainder) = take_quoted(rest)?;
        let remainder = remainder.trim_start();
        let second = if remainder.starts_with('"') {
            take_quoted(remainder)?.0
        } else {
            remainder.to_string()
        };
        return Some((strip_side(&first, "a/"), strip_side(&second, "b/")));
    }

    let Some(after_a) = rest.strip_prefix("a/") else {
        return split_unprefixed(rest);
    };

    // Identical sides: "a/X b/X", which also covers paths containing " b/".
    let len = rest.len();
    if len >= 5 && (len - 5) % 2 == 0 {
        let n = (len - 5) / 2;
        if let (Some(a), Some(sep), Some(b)) =
            (rest.get(2..2 + n), rest.get(2 + n..5 + n), rest.get(5 + n..))
        {
            if sep == " b/" && a == b {
                return Some((a.to_string(), b.to_string()));
            }
        }
    }

    let idx = after_a.find(" b/")?;
    Some((after_a[..idx].to_string(), after_a[idx + 3..].to_string()))
}

/// `X X` with identical sides, as written by `git diff --no-prefix`.
fn split_unprefixed(rest: &str) -> Option<(String, String)> {
    let len = rest.len();
    if len < 3 || len % 2 == 0 {
        return None;
    }
    let n = (len - 1) / 2;
    let (a, sep, b) = (rest.get(..n)?, rest.get(n..n + 1)?, rest.get(n + 1..)?);
    if sep == " " && a == b {
        Some((a.to_string(), b.to_string()))
    } else {
        None
    }
}

fn strip_side(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

/// Read a leading C-style quoted token; returns it and the rest of the input.
///
/// Git quotes bytes outside printable ASCII as `\NNN` octal escapes, so the
/// token is rebuilt as bytes and decoded as UTF-8 afterwards.
fn take_quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut out: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let token = String::from_utf8_lossy(&out).into_owned();
                return Some((token, &body[i + 1..]));
            }
            b'\\' => {
                let next = *bytes.get(i + 1)?;
                if let Some(byte) = octal_escape(&bytes[i + 1..]) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
                out.push(match next {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'v' => 0x0b,
                    other => other,
                });
                i += 2;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    None
}

/// Value of a leading three-digit octal escape, if `digits` starts with one.
fn octal_escape(digits: &[u8]) -> Option<u8> {
    let triplet = digits.get(..3)?;
    if !triplet.iter().all(|d| (b'0'..=b'7').contains(d)) {
        return None;
    }
    let value = triplet
        .iter()
        .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
    u8::try_from(value).ok()
}

fn unquote(s: &str) -> String {
    if s.starts_with('"') {
        if let Some((inner, _)) = take_quoted(s) {
            return inner;
        }
    }
    s.to_string()
}

/// Drop `/dev/null` and empty paths; strip a leading `./`.
pub fn normalize_diff_path(path: &str) -> Option<String> {
    let mut p = path.trim();
    if p == "/dev/null" {
        return None;
    }
    while let Some(stripped) = p.strip_prefix("./") {
        p = stripped;
    }
    if p.is_empty() {
        None
    } else {
        Some(p.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "diff --git a/x.go b/x.go\n@@ -1,2 +1,3 @@\n a\n+b\n c";

    #[test]
    fn test_empty_diff() {
        assert!(parse_paths("").is_empty());
        assert!(parse_hunks("").is_empty());
        assert!(diff_line_ranges("").is_empty());
    }

    #[test]
    fn test_simple_edit() {
        assert_eq!(parse_paths(EXAMPLE), vec!["x.go"]);
        let hunks = parse_hunks(EXAMPLE);
        assert_eq!(hunks.len(), 1);
        assert_eq!(
            hunks["x.go"],
            vec![Hunk {
                old_start: 1,
                old_count: 2,
                new_start: 1,
                new_count: 3
            }]
        );
        assert_eq!(diff_line_ranges(EXAMPLE), vec![("x.go".to_string(), 1, 3)]);
    }

    #[test]
    fn test_rename_reports_both_paths() {
        let diff = "diff --git a/old/name.rs b/new/name.rs\n\
                    similarity index 90%\n\
                    rename from old/name.rs\n\
                    rename to new/name.rs\n\
                    index 1111111..2222222 100644\n\
                    --- a/old/name.rs\n\
                    +++ b/new/name.rs\n\
                    @@ -10,4 +10,5 @@ fn x() {\n \n+added\n";
        assert_eq!(parse_paths(diff), vec!["old/name.rs", "new/name.rs"]);
        let hunks = parse_hunks(diff);
        assert!(hunks.contains_key("new/name.rs"));
        assert!(!hunks.contains_key("old/name.rs"));
    }

    #[test]
    fn test_new_and_deleted_files() {
        let diff = "diff --git a/added.txt b/added.txt\n\
                    new file mode 100644\n\
                    index 0000000..e69de29\n\
                    --- /dev/null\n\
                    +++ b/added.txt\n\
                    @@ -0,0 +1,2 @@\n+one\n+two\n\
                    diff --git a/gone.txt b/gone.txt\n\
                    deleted file mode 100644\n\
                    index e69de29..0000000\n\
                    --- a/gone.txt\n\
                    +++ /dev/null\n\
                    @@ -1,3 +0,0 @@\n-x\n-y\n-z\n";
        assert_eq!(parse_paths(diff), vec!["added.txt", "gone.txt"]);
        assert_eq!(
            diff_line_ranges(diff),
            vec![
                ("added.txt".to_string(), 1, 2),
                ("gone.txt".to_string(), 1, 3)
            ]
        );
    }

    #[test]
    fn test_omitted_counts_default_to_one() {
        let diff = "diff --git a/a.rs b/a.rs\n@@ -7 +8 @@\n-x\n+y\n";
        let hunks = parse_hunks(diff);
        assert_eq!(
            hunks["a.rs"],
            vec![Hunk {
                old_start: 7,
                old_count: 1,
                new_start: 8,
                new_count: 1
            }]
        );
    }

    #[test]
    fn test_pure_deletion_uses_old_side() {
        let hunk = Hunk {
            old_start: 12,
            old_count: 3,
            new_start: 11,
            new_count: 0,
        };
        assert_eq!(hunk_line_range(&hunk), (12, 14));
    }

    #[test]
    fn test_ranges_sorted_by_path() {
        let diff = "diff --git a/z.rs b/z.rs\n@@ -1 +1 @@\n-a\n+b\n\
                    diff --git a/a.rs b/a.rs\n@@ -5,2 +5,2 @@\n-a\n+b\n";
        let ranges = diff_line_ranges(diff);
        assert_eq!(ranges[0].0, "a.rs");
        assert_eq!(ranges[1].0, "z.rs");
        assert_eq!(parse_paths(diff), vec!["z.rs", "a.rs"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let diff = format!("{}\n{}", EXAMPLE, EXAMPLE);
        assert_eq!(parse_paths(&diff), vec!["x.go"]);
        assert_eq!(parse_hunks(&diff)["x.go"].len(), 1);
    }

    #[test]
    fn test_path_count_bound() {
        let diff = "diff --git a/one b/one\n\
                    diff --git a/two b/three\nrename from two\nrename to three\n\
                    diff --git a/four b/four\n";
        let paths = parse_paths(diff);
        // 3 headers, 1 rename
        assert!(paths.len() <= 4);
        assert_eq!(paths, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_paths_with_spaces_and_quotes() {
        let diff = "diff --git a/dir b/file.txt b/dir b/file.txt\n@@ -1 +1 @@\n";
        assert_eq!(parse_paths(diff), vec!["dir b/file.txt"]);

        let quoted = "diff --git \"a/with space.md\" \"b/with space.md\"\n";
        assert_eq!(parse_paths(quoted), vec!["with space.md"]);
    }

    #[test]
    fn test_dot_slash_and_dev_null_normalized() {
        assert_eq!(normalize_diff_path("./src/lib.rs"), Some("src/lib.rs".into()));
        assert_eq!(normalize_diff_path("/dev/null"), None);
        assert_eq!(normalize_diff_path("  "), None);
    }

    #[test]
    fn test_malformed_input_is_lenient() {
        let diff = "@@ -1 +1 @@\nnot a diff\ndiff --git garbage\n@@ -x +y @@\n";
        assert!(parse_paths(diff).is_empty());
        assert!(parse_hunks(diff).is_empty());
    }

    #[test]
    fn test_rejected_header_does_not_inherit_hunks() {
        let diff = "diff --git a/one.rs b/one.rs\n@@ -1 +1 @@\n-a\n+b\n\
                    diff --git weird-header-without-prefixes\n@@ -500,3 +500,4 @@\n+x\n";
        let hunks = parse_hunks(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks["one.rs"].len(), 1);
        assert_eq!(diff_line_ranges(diff), vec![("one.rs".to_string(), 1, 1)]);
        assert_eq!(parse_paths(diff), vec!["one.rs"]);
    }

    #[test]
    fn test_no_prefix_diff() {
        let diff = "diff --git src/a.rs src/a.rs\nindex 1..2 100644\n--- src/a.rs\n+++ src/a.rs\n\
                    @@ -3,2 +3,3 @@\n x\n+y\n";
        assert_eq!(parse_paths(diff), vec!["src/a.rs"]);
        assert_eq!(diff_line_ranges(diff), vec![("src/a.rs".to_string(), 3, 5)]);

        let renamed = "diff --git old name.rs new name.rs\n--- old name.rs\n+++ new name.rs\n\
                       @@ -1 +1 @@\n-a\n+b\n";
        assert_eq!(parse_paths(renamed), vec!["new name.rs"]);
        assert!(parse_hunks(renamed).contains_key("new name.rs"));
    }

    #[test]
    fn test_octal_escaped_paths_decoded() {
        let diff = "diff --git \"a/caf\\303\\251.txt\" \"b/caf\\303\\251.txt\"\n@@ -1 +1 @@\n";
        assert_eq!(parse_paths(diff), vec!["café.txt"]);
        assert!(parse_hunks(diff).contains_key("café.txt"));

        let escapes = "diff --git \"a/q\\\"t\\\\s.md\" \"b/q\\\"t\\\\s.md\"\n";
        assert_eq!(parse_paths(escapes), vec!["q\"t\\s.md"]);
        assert_eq!(unquote("\"tab\\there\""), "tab\there");
    }

    #[test]
    fn test_lookahead_stops_at_next_header() {
        let diff = "diff --git a/a.rs b/a.rs\n\
                    diff --git a/b.rs b/b.rs\nnew file mode 100644\n";
        assert_eq!(parse_paths(diff), vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn test_contains_diff() {
        assert!(contains_diff(EXAMPLE));
        assert!(contains_diff("output:\ndiff --git a/q b/q\n"));
        assert!(!contains_diff("no diff here"));
    }
}
