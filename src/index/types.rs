use crate::error::{Error, Result};
use crate::utils::{read_u16_at, read_u32_at};
use std::io::Write;

/// Index of a file registered with the builder, assigned sequentially from 0.
pub type FileIndex = u32;

/// One occurrence record at a trie terminal: (file, line) plus how many
/// times the token hit that exact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub file_index: FileIndex,
    pub line: u32,
    pub count: u32,
}

/// Capabilities retained at build time, recorded in the header.
///
/// A query flag whose capability is missing is silently dropped from
/// `effective_flags` instead of failing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapFlags(pub u16);

impl CapFlags {
    pub const NONE: u16 = 0;
    /// Per-posting line numbers were retained.
    pub const LINE_NUMBERS: u16 = 1 << 0;
    /// Full line texts were retained (line quoting).
    pub const LINE_QUOTES: u16 = 1 << 1;

    pub fn new() -> Self {
        Self(Self::NONE)
    }

    pub fn has_line_numbers(&self) -> bool {
        self.0 & Self::LINE_NUMBERS != 0
    }

    pub fn has_line_quotes(&self) -> bool {
        self.0 & Self::LINE_QUOTES != 0
    }
}

/// Build-time options controlling what the serialized index retains.
#[derive(Debug, Clone, Copy)]
pub struct BuilderOptions {
    /// Record line numbers in postings (enables QUERY_FILE_LINES).
    pub retain_line_numbers: bool,
    /// Record full line texts (enables QUERY_QUOTE_LINE). Costly; off by
    /// default.
    pub retain_line_text: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            retain_line_numbers: true,
            retain_line_text: false,
        }
    }
}

impl BuilderOptions {
    pub fn caps(&self) -> CapFlags {
        let mut caps = CapFlags::new();
        if self.retain_line_numbers {
            caps.0 |= CapFlags::LINE_NUMBERS;
        }
        if self.retain_line_text {
            caps.0 |= CapFlags::LINE_QUOTES;
        }
        caps
    }
}

/// "TRIX" magic at offset 0.
pub const MAGIC: u32 = u32::from_le_bytes(*b"TRIX");

/// "XIRT" end marker; its presence distinguishes a complete index from a
/// truncated write.
pub const TRAILER: u32 = u32::from_le_bytes(*b"XIRT");

/// On-disk format version.
pub const VERSION: u16 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 40;

/// Fixed node-table record size in bytes: key u8, sibling u32, child u32,
/// postings u32.
pub const NODE_RECORD_SIZE: usize = 13;

/// Sentinel postings offset for a non-terminal node.
pub const NO_POSTINGS: u32 = u32::MAX;

/// Trailer size in bytes.
pub const TRAILER_SIZE: usize = 4;

/// Parsed index header. All offsets are absolute; all fields little-endian.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub caps: CapFlags,
    pub nodes_off: u32,
    pub node_count: u32,
    pub post_off: u32,
    pub post_len: u32,
    pub files_off: u32,
    pub file_count: u32,
    pub total_len: u32,
}

impl Header {
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&MAGIC.to_le_bytes())?;
        w.write_all(&VERSION.to_le_bytes())?;
        w.write_all(&self.caps.0.to_le_bytes())?;
        w.write_all(&self.nodes_off.to_le_bytes())?;
        w.write_all(&self.node_count.to_le_bytes())?;
        w.write_all(&self.post_off.to_le_bytes())?;
        w.write_all(&self.post_len.to_le_bytes())?;
        w.write_all(&self.files_off.to_le_bytes())?;
        w.write_all(&self.file_count.to_le_bytes())?;
        w.write_all(&self.total_len.to_le_bytes())?;
        w.write_all(&0u32.to_le_bytes())?; // reserved
        Ok(())
    }

    /// Parse and validate magic/version. Bounds validation against the
    /// actual byte length happens in the reader.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::corrupt("shorter than header"));
        }
        let magic = read_u32_at(buf, 0).ok_or_else(|| Error::corrupt("header"))?;
        if magic != MAGIC {
            return Err(Error::corrupt("bad magic"));
        }
        let version = read_u16_at(buf, 4).ok_or_else(|| Error::corrupt("header"))?;
        if version != VERSION {
            return Err(Error::corrupt("unsupported version"));
        }
        let caps = CapFlags(read_u16_at(buf, 6).ok_or_else(|| Error::corrupt("header"))?);
        let field = |off| read_u32_at(buf, off).ok_or_else(|| Error::corrupt("header"));
        Ok(Self {
            caps,
            nodes_off: field(8)?,
            node_count: field(12)?,
            post_off: field(16)?,
            post_len: field(20)?,
            files_off: field(24)?,
            file_count: field(28)?,
            total_len: field(32)?,
        })
    }
}
