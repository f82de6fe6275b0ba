//! Serializer: flattens the trie store into the on-disk layout.
//!
//! Two passes. Pass 1 prunes garbage nodes, assigns every surviving node an
//! absolute output offset via a pre-order depth-first traversal (children in
//! ascending key order — fixed, because sibling/child pointers are baked
//! into the stream), and encodes the posting and file regions. Pass 2 emits
//! header, node table, postings, file table and trailer in that order.
//!
//! The trailer is written last: a sink failure partway leaves a file that
//! open-time validation rejects instead of one that silently truncates
//! results.

use crate::error::{Error, Result};
use crate::index::trie::{NodeId, TrieStore, ROOT};
use crate::index::types::{
    CapFlags, Header, Posting, HEADER_SIZE, NODE_RECORD_SIZE, NO_POSTINGS, TRAILER, TRAILER_SIZE,
};
use crate::utils::encode_varint;
use std::collections::BTreeMap;
use std::io::Write;

/// Finalized per-file data handed over by the builder.
pub(crate) struct FileRecord {
    pub path: String,
    pub priority: i32,
    pub lines_seen: u32,
    pub line_texts: Option<Vec<String>>,
}

pub(crate) fn write_index<W: Write>(
    trie: &TrieStore,
    files: &[FileRecord],
    caps: CapFlags,
    sink: &mut W,
) -> Result<()> {
    // Prune: a node is live if its subtree carries postings. The builder
    // only creates nodes on insert paths that end in a posting, so this is
    // a safety pass, not a space optimization.
    let live = mark_live(trie);

    // Pre-order ranks over live nodes; the root is always rank 0.
    let mut order: Vec<NodeId> = Vec::with_capacity(trie.len());
    let mut rank: Vec<u32> = vec![u32::MAX; trie.len()];
    let mut stack = vec![ROOT];
    while let Some(id) = stack.pop() {
        rank[id as usize] = order.len() as u32;
        order.push(id);
        for &c in trie.node(id).children.iter().rev() {
            if live[c as usize] {
                stack.push(c);
            }
        }
    }

    let nodes_off = HEADER_SIZE as u64;
    let post_off = nodes_off + order.len() as u64 * NODE_RECORD_SIZE as u64;

    // Posting region, offsets recorded per rank.
    let mut postings_buf = Vec::new();
    let mut posting_off: Vec<u32> = vec![NO_POSTINGS; order.len()];
    for (r, &id) in order.iter().enumerate() {
        let postings = &trie.node(id).postings;
        if postings.is_empty() {
            continue;
        }
        let off = post_off + postings_buf.len() as u64;
        posting_off[r] = checked_u32(off)?;
        encode_postings(postings, caps, &mut postings_buf);
    }

    let files_off = post_off + postings_buf.len() as u64;
    let file_buf = encode_file_table(files, caps);
    let total_len = checked_u32(files_off + file_buf.len() as u64 + TRAILER_SIZE as u64)?;

    // Sibling and first-child offsets, resolved through the rank map.
    let node_offset =
        |r: u32| -> u32 { (nodes_off as u32) + r * NODE_RECORD_SIZE as u32 };
    let mut sibling: Vec<u32> = vec![0; order.len()];
    let mut child: Vec<u32> = vec![0; order.len()];
    for &id in &order {
        let r = rank[id as usize] as usize;
        let kids: Vec<NodeId> = trie
            .node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| live[c as usize])
            .collect();
        if let Some(&first) = kids.first() {
            child[r] = node_offset(rank[first as usize]);
        }
        for pair in kids.windows(2) {
            sibling[rank[pair[0] as usize] as usize] = node_offset(rank[pair[1] as usize]);
        }
    }

    let header = Header {
        caps,
        nodes_off: nodes_off as u32,
        node_count: order.len() as u32,
        post_off: checked_u32(post_off)?,
        post_len: postings_buf.len() as u32,
        files_off: checked_u32(files_off)?,
        file_count: files.len() as u32,
        total_len,
    };

    header.write_to(sink)?;
    for (r, &id) in order.iter().enumerate() {
        sink.write_all(&[trie.node(id).key])?;
        sink.write_all(&sibling[r].to_le_bytes())?;
        sink.write_all(&child[r].to_le_bytes())?;
        sink.write_all(&posting_off[r].to_le_bytes())?;
    }
    sink.write_all(&postings_buf)?;
    sink.write_all(&file_buf)?;
    sink.write_all(&TRAILER.to_le_bytes())?;
    Ok(())
}

/// Live = subtree carries at least one posting. Children always have higher
/// arena ids than their parent, so one reverse sweep settles everything.
fn mark_live(trie: &TrieStore) -> Vec<bool> {
    let mut live = vec![false; trie.len()];
    for id in (0..trie.len() as NodeId).rev() {
        let node = trie.node(id);
        live[id as usize] = !node.postings.is_empty()
            || node.children.iter().any(|&c| live[c as usize]);
    }
    live[ROOT as usize] = true;
    live
}

/// Per terminal node: file_count, then per file in ascending file_index:
/// file_index, instance_total, line_entry_count, (line delta, count) pairs.
fn encode_postings(postings: &[Posting], caps: CapFlags, buf: &mut Vec<u8>) {
    let mut by_file: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
    for p in postings {
        by_file.entry(p.file_index).or_default().push((p.line, p.count));
    }

    encode_varint(by_file.len() as u32, buf);
    for (file_index, entries) in by_file {
        let total: u32 = entries.iter().map(|&(_, c)| c).sum();
        encode_varint(file_index, buf);
        encode_varint(total, buf);
        if caps.has_line_numbers() {
            encode_varint(entries.len() as u32, buf);
            let mut prev = 0u32;
            for (line, count) in entries {
                encode_varint(line - prev, buf);
                encode_varint(count, buf);
                prev = line;
            }
        } else {
            encode_varint(0, buf);
        }
    }
}

fn encode_file_table(files: &[FileRecord], caps: CapFlags) -> Vec<u8> {
    let mut buf = Vec::new();
    for file in files {
        buf.extend_from_slice(&(file.path.len() as u16).to_le_bytes());
        buf.extend_from_slice(file.path.as_bytes());
        buf.extend_from_slice(&file.priority.to_le_bytes());
        buf.extend_from_slice(&file.lines_seen.to_le_bytes());

        let mut quotes = Vec::new();
        if caps.has_line_quotes() {
            if let Some(texts) = &file.line_texts {
                for text in texts {
                    encode_varint(text.len() as u32, &mut quotes);
                    quotes.extend_from_slice(text.as_bytes());
                }
            }
        }
        buf.extend_from_slice(&(quotes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&quotes);
    }
    buf
}

fn checked_u32(value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidArgument("index exceeds the 4 GiB format limit".into()))
}
