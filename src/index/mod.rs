pub mod builder;
pub mod reader;
pub mod trie;
pub mod types;
pub mod writer;

pub use builder::IndexBuilder;
pub use reader::IndexFile;
pub use types::*;
