//! Shared utilities.
//!
//! - [`encoding`] - Variable-length integer encoding and bounds-checked
//!   little-endian reads for the on-disk format
//! - [`tokenizer`] - Token policy and the streaming scanner

pub mod encoding;
pub mod tokenizer;

pub use encoding::*;
pub use tokenizer::*;

/// Heuristic binary-content check: a NUL byte in the first 8 KiB.
/// Used by the CLI indexer to skip files that would pollute the trie.
pub fn is_binary(content: &[u8]) -> bool {
    let window = &content[..content.len().min(8192)];
    memchr::memchr(0, window).is_some()
}
