//! Incremental index builder.
//!
//! The builder owns the trie store, the file table and one streaming token
//! scanner per registered file. Content arrives through [`IndexBuilder::fill`]
//! in arbitrary chunks; nothing requires buffering a whole file. Builder
//! state is single-writer by contract, which `&mut self` enforces statically.

use crate::error::{Error, Result};
use crate::index::trie::TrieStore;
use crate::index::types::{BuilderOptions, FileIndex};
use crate::index::writer::{self, FileRecord};
use crate::utils::TokenScanner;
use rustc_hash::FxHashMap;
use std::io::Write;

/// Per-file build state. Becomes immutable once the session serializes.
struct FileEntry {
    path: String,
    priority: i32,
    scanner: TokenScanner,
    bytes_consumed: u64,
}

/// Builds a trie from streamed file content and serializes it to the sink
/// supplied at creation.
pub struct IndexBuilder<W: Write> {
    sink: W,
    options: BuilderOptions,
    trie: TrieStore,
    files: Vec<FileEntry>,
    path_to_index: FxHashMap<String, FileIndex>,
}

impl<W: Write> IndexBuilder<W> {
    /// An empty trie store bound to `sink`, with default retention options.
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, BuilderOptions::default())
    }

    pub fn with_options(sink: W, options: BuilderOptions) -> Self {
        Self {
            sink,
            options,
            trie: TrieStore::new(),
            files: Vec::new(),
            path_to_index: FxHashMap::default(),
        }
    }

    /// Register a new logical file. Indices are assigned sequentially from
    /// 0 and never reused within a session.
    pub fn index_file(&mut self, path: &str, priority: i32) -> Result<FileIndex> {
        if path.is_empty() {
            return Err(Error::InvalidArgument("empty filepath".into()));
        }
        if path.len() > u16::MAX as usize {
            // char-based prefix: a byte slice could split a UTF-8 sequence
            let prefix: String = path.chars().take(64).collect();
            return Err(Error::InvalidArgument(format!(
                "filepath longer than {} bytes: {prefix}…",
                u16::MAX
            )));
        }
        if self.path_to_index.contains_key(path) {
            return Err(Error::InvalidArgument(format!(
                "filepath already indexed: {path}"
            )));
        }

        let file_index = self.files.len() as FileIndex;
        self.files.push(FileEntry {
            path: path.to_string(),
            priority,
            scanner: TokenScanner::new(self.options.retain_line_text),
            bytes_consumed: 0,
        });
        self.path_to_index.insert(path.to_string(), file_index);
        Ok(file_index)
    }

    /// Append a chunk of `file_index`'s content, in order. Tokenizes
    /// incrementally (a token split across calls is carried over), inserts
    /// each token's byte path into the trie and records a posting at the
    /// terminal node. Fills for different files may interleave.
    pub fn fill(&mut self, file_index: FileIndex, bytes: &[u8]) -> Result<()> {
        let entry = self
            .files
            .get_mut(file_index as usize)
            .ok_or(Error::UnknownFileIndex(file_index))?;
        entry.bytes_consumed += bytes.len() as u64;

        let trie = &mut self.trie;
        let retain_lines = self.options.retain_line_numbers;
        entry.scanner.scan(bytes, |token, line| {
            let id = trie.insert(token);
            trie.record(id, file_index, if retain_lines { line } else { 0 });
        });
        Ok(())
    }

    /// Number of files registered so far.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.trie.len()
    }

    /// Flatten the trie into the sink and flush. One-shot terminal
    /// operation; the builder is consumed. A failure partway leaves a file
    /// without the end trailer, which open-time validation rejects.
    pub fn serialize(mut self) -> Result<()> {
        let trie = &mut self.trie;
        let retain_lines = self.options.retain_line_numbers;

        let mut records = Vec::with_capacity(self.files.len());
        for (i, entry) in self.files.iter_mut().enumerate() {
            let file_index = i as FileIndex;
            // A token running to end-of-file is still pending in the scanner.
            entry.scanner.flush(|token, line| {
                let id = trie.insert(token);
                trie.record(id, file_index, if retain_lines { line } else { 0 });
            });
            records.push(FileRecord {
                path: std::mem::take(&mut entry.path),
                priority: entry.priority,
                lines_seen: entry.scanner.lines_seen(),
                line_texts: entry.scanner.take_line_texts(),
            });
        }

        writer::write_index(&self.trie, &records, self.options.caps(), &mut self.sink)?;
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::trie::ROOT;

    #[test]
    fn test_index_file_sequential_indices() {
        let mut builder = IndexBuilder::new(Vec::new());
        assert_eq!(builder.index_file("a.txt", 0).unwrap(), 0);
        assert_eq!(builder.index_file("b.txt", 5).unwrap(), 1);
        assert_eq!(builder.file_count(), 2);
    }

    #[test]
    fn test_index_file_rejects_empty_and_duplicate() {
        let mut builder = IndexBuilder::new(Vec::new());
        assert!(matches!(
            builder.index_file("", 0),
            Err(Error::InvalidArgument(_))
        ));
        builder.index_file("a.txt", 0).unwrap();
        assert!(matches!(
            builder.index_file("a.txt", 0),
            Err(Error::InvalidArgument(_))
        ));
        // The failed calls did not burn an index
        assert_eq!(builder.index_file("b.txt", 0).unwrap(), 1);
    }

    #[test]
    fn test_index_file_rejects_overlong_path_at_char_boundary() {
        // Multi-byte char straddling byte 64 of the reported prefix
        let mut path = "x".repeat(63);
        path.push('é');
        path.push_str(&"y".repeat(70_000));
        let mut builder = IndexBuilder::new(Vec::new());
        assert!(matches!(
            builder.index_file(&path, 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fill_unknown_index() {
        let mut builder = IndexBuilder::new(Vec::new());
        assert!(matches!(
            builder.fill(7, b"anything"),
            Err(Error::UnknownFileIndex(7))
        ));
    }

    #[test]
    fn test_fill_builds_trie_paths() {
        let mut builder = IndexBuilder::new(Vec::new());
        let f = builder.index_file("a.txt", 0).unwrap();
        builder.fill(f, b"the quick\nfox").unwrap();
        // "fox" is complete only at end-of-stream, so it is still pending
        assert!(builder.trie.find(b"the").is_some());
        assert!(builder.trie.find(b"quick").is_some());
        let fox = builder.trie.find(b"fox");
        assert!(fox.is_none() || builder.trie.node(fox.unwrap()).postings.is_empty());
        assert!(builder.trie.node(ROOT).postings.is_empty());
    }

    #[test]
    fn test_fill_chunks_join_tokens() {
        let mut builder = IndexBuilder::new(Vec::new());
        let f = builder.index_file("a.txt", 0).unwrap();
        builder.fill(f, b"qui").unwrap();
        builder.fill(f, b"ck ").unwrap();
        let id = builder.trie.find(b"quick").unwrap();
        assert_eq!(builder.trie.node(id).postings.len(), 1);
        assert!(builder.trie.find(b"qui").map(|n| builder.trie.node(n).postings.is_empty()).unwrap_or(true));
    }
}
