//! # TRIX - Trie-Based Full-Text Index
//!
//! TRIX builds a compact on-disk trie from a corpus of text files and
//! answers prefix queries against it: autocomplete suggestions, per-file
//! match counts, and per-line match locations. The serialized index is
//! queried directly from a memory-mapped byte region - no deserialization,
//! no trie reconstruction - which keeps queries fast even on
//! resource-constrained consumers.
//!
//! ## Architecture
//!
//! - [`index`] - Building (trie store, streaming builder) and reading
//!   (mmap-backed [`index::IndexFile`]) of serialized indexes
//! - [`query`] - Query execution: needle descent, file collection,
//!   autocomplete with elision
//! - [`output`] - Result formatting (terminal and JSON)
//! - [`utils`] - Token policy, streaming scanner, byte codecs
//!
//! ## Quick Start
//!
//! ```no_run
//! use trix::index::{IndexBuilder, IndexFile};
//! use trix::query::{QueryFlags, SearchParams};
//! use std::fs::File;
//!
//! // Build and serialize
//! let sink = File::create("corpus.trix").unwrap();
//! let mut builder = IndexBuilder::new(sink);
//! let f = builder.index_file("a.txt", 0).unwrap();
//! builder.fill(f, b"the quick fox").unwrap();
//! builder.serialize().unwrap();
//!
//! // Open and query
//! let index = IndexFile::open("corpus.trix").unwrap();
//! let mut params = SearchParams::new("qu");
//! params.flags = QueryFlags::new(QueryFlags::FILES | QueryFlags::AUTOCOMPLETE);
//! let result = index.search(&params).unwrap();
//! for file in &result.files {
//!     println!("{}: {} matches", file.path, file.matches);
//! }
//! ```
//!
//! ## Concurrency
//!
//! The builder is single-writer (`&mut self`). An opened [`index::IndexFile`]
//! is immutable and `Send + Sync`; any number of threads may run `search`
//! against one handle concurrently with no coordination.

pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod utils;

pub use error::{Error, Result};
pub use index::{IndexBuilder, IndexFile};
pub use query::{QueryFlags, SearchParams, SearchResult};
