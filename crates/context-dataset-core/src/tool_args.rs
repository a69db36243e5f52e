//! Typed arguments for the allow-listed context-retrieval tools.
//!
//! Action parameters arrive as an untyped JSON map. Each allow-listed tool
//! has a schema here; [`decode_tool_args`] attempts the typed decode and
//! reports failure as a plain string so extraction can record it and move on.

use serde::{Deserialize, Serialize};

pub const READ_FILE_LINES: &str = "read_file_lines";
pub const RETRIEVE_CODE_CONTEXT: &str = "retrieve_code_context";
pub const BULK_SEARCH_REPOSITORY: &str = "bulk_search_repository";

/// Tools whose invocations are extracted.
pub const ALLOWED_TOOLS: &[&str] = &[READ_FILE_LINES, RETRIEVE_CODE_CONTEXT, BULK_SEARCH_REPOSITORY];

pub fn is_allowed_tool(name: &str) -> bool {
    ALLOWED_TOOLS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLine {
    pub file_path: String,
    pub line_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileLinesArgs {
    pub file_lines: Vec<FileLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeContextRequest {
    pub file_path: String,
    #[serde(default)]
    pub symbol_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveCodeContextArgs {
    pub code_context_requests: Vec<CodeContextRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub search_term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_glob: Option<String>,
    #[serde(default)]
    pub fixed_strings: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSearchRepositoryArgs {
    pub searches: Vec<SearchRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_lines: Option<u32>,
}

/// Decoded arguments of an allow-listed tool.
///
/// Serialized untagged: each variant has a distinct required field, so
/// reading a dataset back resolves to the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArgs {
    ReadFileLines(ReadFileLinesArgs),
    RetrieveCodeContext(RetrieveCodeContextArgs),
    BulkSearchRepository(BulkSearchRepositoryArgs),
}

impl ToolArgs {
    /// Explicit file paths named by the arguments. Search globs are excluded.
    pub fn file_paths(&self) -> Vec<&str> {
        match self {
            ToolArgs::ReadFileLines(args) => {
                args.file_lines.iter().map(|fl| fl.file_path.as_str()).collect()
            }
            ToolArgs::RetrieveCodeContext(args) => args
                .code_context_requests
                .iter()
                .map(|r| r.file_path.as_str())
                .collect(),
            ToolArgs::BulkSearchRepository(_) => Vec::new(),
        }
    }

    /// Path globs of a bulk search.
    pub fn path_globs(&self) -> Vec<&str> {
        match self {
            ToolArgs::BulkSearchRepository(args) => args
                .searches
                .iter()
                .filter_map(|s| s.path_glob.as_deref())
                .filter(|g| !g.trim().is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Decode `raw` against the schema of `tool_name`.
pub fn decode_tool_args(tool_name: &str, raw: &serde_json::Value) -> Result<ToolArgs, String> {
    let decoded = match tool_name {
        READ_FILE_LINES => {
            serde_json::from_value::<ReadFileLinesArgs>(raw.clone()).map(ToolArgs::ReadFileLines)
        }
        RETRIEVE_CODE_CONTEXT => serde_json::from_value::<RetrieveCodeContextArgs>(raw.clone())
            .map(ToolArgs::RetrieveCodeContext),
        BULK_SEARCH_REPOSITORY => serde_json::from_value::<BulkSearchRepositoryArgs>(raw.clone())
            .map(ToolArgs::BulkSearchRepository),
        other => return Err(format!("no argument schema for tool '{}'", other)),
    };
    decoded.map_err(|e| e.to_string())
}
