use thiserror::Error;

/// Errors surfaced by the builder, serializer and query engine.
///
/// No-match conditions are not errors: a needle absent from the trie and an
/// `only_filepath` restriction naming an unknown path both produce a valid,
/// empty [`SearchResult`](crate::query::SearchResult).
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied argument is nonsensical (empty path, duplicate
    /// path, oversized limit).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `fill` was called with a file index never returned by `index_file`.
    /// Local to the failing call; previously inserted trie state is intact.
    #[error("unknown file index {0}")]
    UnknownFileIndex(u32),

    /// Sink write or source read failure. Surfaced, never retried here.
    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    /// Structural violation of the on-disk format: bad magic, version or
    /// trailer, an offset out of bounds or misaligned, or a traversal that
    /// exceeds its visit budget (cycle). Always fatal to the operation.
    #[error("corrupt index: {0}")]
    CorruptIndex(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt(what: &'static str) -> Self {
        Error::CorruptIndex(what)
    }
}
