use serde::Serialize;

/// Query flag bitset. Flags whose build-time capability is missing are
/// dropped from `effective_flags` instead of failing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueryFlags(pub u32);

impl QueryFlags {
    pub const NONE: u32 = 0;
    /// Collect autocomplete suggestions below the anchor.
    pub const AUTOCOMPLETE: u32 = 1 << 0;
    /// Collect matching files.
    pub const FILES: u32 = 1 << 1;
    /// Per-file line numbers (requires line-number retention at build time).
    pub const FILE_LINES: u32 = 1 << 2;
    /// Original line text per line match (requires line-quote retention).
    pub const QUOTE_LINE: u32 = 1 << 3;

    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn autocomplete(&self) -> bool {
        self.0 & Self::AUTOCOMPLETE != 0
    }

    pub fn files(&self) -> bool {
        self.0 & Self::FILES != 0
    }

    pub fn file_lines(&self) -> bool {
        self.0 & Self::FILE_LINES != 0
    }

    pub fn quote_line(&self) -> bool {
        self.0 & Self::QUOTE_LINE != 0
    }
}

/// Parameters for one query.
///
/// The three limits are the sole bounding mechanism against unbounded work
/// on pathological needles (an empty needle anchors at the root and would
/// otherwise enumerate the whole corpus).
#[derive(Debug, Clone)]
pub struct SearchParams<'a> {
    pub needle: &'a str,
    /// If set, FILE results are restricted to this filepath only. A path
    /// absent from the file table yields an empty result, not an error.
    pub only_filepath: Option<&'a str>,
    pub flags: QueryFlags,
    pub max_autocomplete: usize,
    pub max_files: usize,
    pub max_lines: usize,
}

impl<'a> SearchParams<'a> {
    pub fn new(needle: &'a str) -> Self {
        Self {
            needle,
            only_filepath: None,
            flags: QueryFlags::new(QueryFlags::FILES),
            max_autocomplete: 10,
            max_files: 20,
            max_lines: 10,
        }
    }
}
