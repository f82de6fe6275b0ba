use crate::query::params::QueryFlags;
use serde::Serialize;

/// One matching line within a file result.
#[derive(Debug, Clone, Serialize)]
pub struct LineMatch {
    pub line: u32,
    /// Occurrences of the needle's subtree tokens on this line.
    pub count: u32,
    /// Original line text, present only under QUOTE_LINE with a quote-capable
    /// index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One matching file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMatches {
    pub path: String,
    pub priority: i32,
    /// Total occurrences across the anchor's subtree.
    pub matches: u32,
    pub lines_in_file: u32,
    /// Ascending line numbers, truncated at max_lines; empty unless
    /// FILE_LINES is effective.
    pub lines: Vec<LineMatch>,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Full suggested token (needle plus completion).
    pub text: String,
    /// Occurrences terminating exactly at this suggestion.
    pub instances: u32,
    /// Occurrences across the suggestion's entire subtree.
    pub agg_instances: u32,
    /// This entry summarizes a subtree that was not enumerated because the
    /// remaining budget could not hold its members individually.
    pub elided: bool,
    pub has_children: bool,
}

/// Everything one query produced. Owned by the caller and released as a
/// unit when dropped; no result object is individually freed.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub files: Vec<FileMatches>,
    pub autocomplete: Vec<Suggestion>,
    /// Wall-clock span of the query.
    pub duration_ms: u32,
    /// The requested flags actually honored, given the index capabilities.
    pub effective_flags: QueryFlags,
}

impl SearchResult {
    /// A needle absent from the trie yields this: empty but valid.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.autocomplete.is_empty()
    }
}
