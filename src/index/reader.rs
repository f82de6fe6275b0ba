//! Read side: an opened serialized index.
//!
//! The query engine walks the node table directly in the mapped bytes; the
//! trie is never reconstructed. The file is untrusted input: the header and
//! file table are validated eagerly at open (fail fast, before any query),
//! and every node or posting access re-checks alignment and bounds so a
//! hostile file cannot push traversal outside its own regions.

use crate::error::{Error, Result};
use crate::index::types::{
    CapFlags, FileIndex, Header, HEADER_SIZE, NODE_RECORD_SIZE, NO_POSTINGS, TRAILER, TRAILER_SIZE,
};
use crate::utils::{decode_varint, read_i32_at, read_u16_at, read_u32_at};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

enum Data {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Data {
    fn bytes(&self) -> &[u8] {
        match self {
            Data::Mapped(m) => m,
            Data::Owned(v) => v,
        }
    }
}

/// Fixed-size node record, decoded on access.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeRec {
    pub key: u8,
    /// Absolute offset of the next sibling record, 0 if none.
    pub sibling: u32,
    /// Absolute offset of the first child record, 0 if none.
    pub child: u32,
    /// Absolute offset into the posting region, NO_POSTINGS if non-terminal.
    pub postings: u32,
}

/// Decoded posting list for one file at one terminal node.
#[derive(Debug, Clone)]
pub(crate) struct FilePostings {
    pub file_index: FileIndex,
    pub total: u32,
    /// (line, count) pairs, ascending by line. Empty if the index was built
    /// without line-number retention.
    pub lines: Vec<(u32, u32)>,
}

/// One file-table entry.
#[derive(Debug, Clone)]
pub struct FileTableEntry {
    pub path: String,
    pub priority: i32,
    pub lines_seen: u32,
    /// Byte range of the retained line-text blob, empty when quoting was
    /// not enabled at build time.
    quotes: (usize, usize),
}

/// A serialized index opened read-only. Queries take `&self`; the handle is
/// `Send + Sync` and safely shared across threads. Dropping it releases the
/// mapping, and the borrow checker keeps that from racing in-flight queries.
pub struct IndexFile {
    data: Data,
    header: Header,
    files: Vec<FileTableEntry>,
}

impl IndexFile {
    /// Open and validate an index file by path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::adopt(File::open(path)?)
    }

    /// Take ownership of an already-opened descriptor and validate it.
    pub fn adopt(file: File) -> Result<Self> {
        let mmap = unsafe { Mmap::map(&file)? };
        Self::validate(Data::Mapped(mmap))
    }

    /// Open an index held in an owned buffer (tests, fuzzing, embedded use).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::validate(Data::Owned(bytes))
    }

    fn validate(data: Data) -> Result<Self> {
        let buf = data.bytes();
        let header = Header::parse(buf)?;

        if header.total_len as usize != buf.len() {
            return Err(Error::corrupt("length mismatch"));
        }
        if header.nodes_off as usize != HEADER_SIZE || header.node_count == 0 {
            return Err(Error::corrupt("bad node table offset"));
        }
        let post_off =
            header.nodes_off as u64 + header.node_count as u64 * NODE_RECORD_SIZE as u64;
        if post_off != header.post_off as u64 {
            return Err(Error::corrupt("node table size mismatch"));
        }
        if header.post_off as u64 + header.post_len as u64 != header.files_off as u64 {
            return Err(Error::corrupt("posting region size mismatch"));
        }
        if header.files_off as u64 + TRAILER_SIZE as u64 > header.total_len as u64 {
            return Err(Error::corrupt("file table out of bounds"));
        }
        let trailer_off = buf.len() - TRAILER_SIZE;
        if read_u32_at(buf, trailer_off) != Some(TRAILER) {
            return Err(Error::corrupt("missing end marker (truncated write?)"));
        }

        let files = decode_file_table(buf, &header, trailer_off)?;

        Ok(Self { data, header, files })
    }

    pub fn caps(&self) -> CapFlags {
        self.header.caps
    }

    pub fn node_count(&self) -> u32 {
        self.header.node_count
    }

    pub fn size_bytes(&self) -> usize {
        self.data.bytes().len()
    }

    pub fn files(&self) -> &[FileTableEntry] {
        &self.files
    }

    pub fn file_entry(&self, index: FileIndex) -> Option<&FileTableEntry> {
        self.files.get(index as usize)
    }

    /// Resolve a filepath to its index, for `only_filepath` restrictions.
    pub fn file_index_of(&self, path: &str) -> Option<FileIndex> {
        self.files
            .iter()
            .position(|f| f.path == path)
            .map(|i| i as FileIndex)
    }

    /// Retained text of a 1-based line, if the index carries line quotes.
    pub fn quote_line(&self, file_index: FileIndex, line: u32) -> Option<String> {
        let entry = self.files.get(file_index as usize)?;
        let (start, end) = entry.quotes;
        let blob = self.data.bytes().get(start..end)?;
        let mut pos = 0;
        let mut current = 1u32;
        while pos < blob.len() {
            let (len, consumed) = decode_varint(&blob[pos..])?;
            pos += consumed;
            let text = blob.get(pos..pos + len as usize)?;
            if current == line {
                return Some(String::from_utf8_lossy(text).into_owned());
            }
            pos += len as usize;
            current += 1;
        }
        None
    }

    pub(crate) fn root_offset(&self) -> u32 {
        self.header.nodes_off
    }

    /// Decode the node record at `offset`, rejecting anything outside or
    /// misaligned within the node table.
    pub(crate) fn node_at(&self, offset: u32) -> Result<NodeRec> {
        let buf = self.data.bytes();
        let rel = offset
            .checked_sub(self.header.nodes_off)
            .ok_or_else(|| Error::corrupt("node offset before table"))?;
        if rel % NODE_RECORD_SIZE as u32 != 0 {
            return Err(Error::corrupt("misaligned node offset"));
        }
        let off = offset as usize;
        if off + NODE_RECORD_SIZE > self.header.post_off as usize {
            return Err(Error::corrupt("node offset out of bounds"));
        }
        Ok(NodeRec {
            key: buf[off],
            sibling: read_u32_at(buf, off + 1).ok_or_else(|| Error::corrupt("node record"))?,
            child: read_u32_at(buf, off + 5).ok_or_else(|| Error::corrupt("node record"))?,
            postings: read_u32_at(buf, off + 9).ok_or_else(|| Error::corrupt("node record"))?,
        })
    }

    /// Decode the posting list at `offset` (a node's `postings` field that
    /// is not NO_POSTINGS). All varints are bounded by the posting region.
    pub(crate) fn postings_at(&self, offset: u32) -> Result<Vec<FilePostings>> {
        if offset == NO_POSTINGS {
            return Ok(Vec::new());
        }
        if offset < self.header.post_off || offset >= self.header.files_off {
            return Err(Error::corrupt("posting offset out of bounds"));
        }
        let buf = self.data.bytes();
        let region = &buf[..self.header.files_off as usize];
        let mut pos = offset as usize;

        let varint = |pos: &mut usize| -> Result<u32> {
            let (v, consumed) =
                decode_varint(&region[*pos..]).ok_or_else(|| Error::corrupt("posting list"))?;
            *pos += consumed;
            Ok(v)
        };

        let file_count = varint(&mut pos)?;
        if file_count as usize > self.files.len() {
            return Err(Error::corrupt("posting list file count"));
        }
        let mut out = Vec::new();
        for _ in 0..file_count {
            let file_index = varint(&mut pos)?;
            if file_index as usize >= self.files.len() {
                return Err(Error::corrupt("posting file index out of range"));
            }
            let total = varint(&mut pos)?;
            let entry_count = varint(&mut pos)?;
            let mut lines = Vec::new();
            let mut prev = 0u32;
            for _ in 0..entry_count {
                let delta = varint(&mut pos)?;
                let count = varint(&mut pos)?;
                prev = prev
                    .checked_add(delta)
                    .ok_or_else(|| Error::corrupt("posting line overflow"))?;
                lines.push((prev, count));
            }
            out.push(FilePostings {
                file_index,
                total,
                lines,
            });
        }
        Ok(out)
    }
}

fn decode_file_table(buf: &[u8], header: &Header, trailer_off: usize) -> Result<Vec<FileTableEntry>> {
    let corrupt = |what| Error::CorruptIndex(what);
    let mut pos = header.files_off as usize;
    let mut files = Vec::new();
    for _ in 0..header.file_count {
        let path_len = read_u16_at(buf, pos).ok_or(corrupt("file table"))? as usize;
        pos += 2;
        if pos + path_len > trailer_off {
            return Err(corrupt("file path out of bounds"));
        }
        let path = String::from_utf8_lossy(&buf[pos..pos + path_len]).into_owned();
        pos += path_len;
        let priority = read_i32_at(buf, pos).ok_or(corrupt("file table"))?;
        pos += 4;
        let lines_seen = read_u32_at(buf, pos).ok_or(corrupt("file table"))?;
        pos += 4;
        let quotes_len = read_u32_at(buf, pos).ok_or(corrupt("file table"))? as usize;
        pos += 4;
        if pos + quotes_len > trailer_off {
            return Err(corrupt("line quotes out of bounds"));
        }
        let quotes = (pos, pos + quotes_len);
        pos += quotes_len;
        files.push(FileTableEntry {
            path,
            priority,
            lines_seen,
            quotes,
        });
    }
    if pos != trailer_off {
        return Err(corrupt("file table trailing garbage"));
    }
    Ok(files)
}
