//! Build-time trie store.
//!
//! Nodes live in a `Vec` and reference children by index, so the serializer
//! is a pure index-to-offset relabeling pass over the same arena. Each node
//! represents one byte position along some token path; shared prefixes share
//! nodes across tokens and across files, which is the entire space rationale
//! of the format.

use crate::index::types::{FileIndex, Posting};

/// Arena index of a trie node.
pub type NodeId = u32;

/// The root node, present from creation, never carries a key or postings.
pub const ROOT: NodeId = 0;

pub struct TrieNode {
    /// Byte key of the edge leading into this node (0 for the root).
    pub key: u8,
    /// Child node ids, kept sorted by the child's key.
    pub children: Vec<NodeId>,
    /// Postings if a token terminates here. Within one file, lines only
    /// advance, so per-file runs are ascending by construction.
    pub postings: Vec<Posting>,
}

pub struct TrieStore {
    nodes: Vec<TrieNode>,
}

impl TrieStore {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode {
                key: 0,
                children: Vec::new(),
                postings: Vec::new(),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id as usize]
    }

    /// Walk `token` from the root, creating missing nodes one per byte.
    /// Returns the terminal node for the token.
    pub fn insert(&mut self, token: &[u8]) -> NodeId {
        let mut cur = ROOT;
        for &byte in token {
            cur = match self.child(cur, byte) {
                Some(id) => id,
                None => self.add_child(cur, byte),
            };
        }
        cur
    }

    /// Append a posting `(file_index, line)` at `id`, or bump the count if
    /// the same pair repeats. The latest posting for a file is the only
    /// possible match since lines within a file only advance.
    pub fn record(&mut self, id: NodeId, file_index: FileIndex, line: u32) {
        let postings = &mut self.nodes[id as usize].postings;
        for posting in postings.iter_mut().rev() {
            if posting.file_index == file_index {
                if posting.line == line {
                    posting.count += 1;
                    return;
                }
                break;
            }
        }
        postings.push(Posting {
            file_index,
            line,
            count: 1,
        });
    }

    /// Follow `path` from the root without creating anything.
    pub fn find(&self, path: &[u8]) -> Option<NodeId> {
        let mut cur = ROOT;
        for &byte in path {
            cur = self.child(cur, byte)?;
        }
        Some(cur)
    }

    fn child(&self, id: NodeId, key: u8) -> Option<NodeId> {
        let node = &self.nodes[id as usize];
        node.children
            .binary_search_by_key(&key, |&c| self.nodes[c as usize].key)
            .ok()
            .map(|i| node.children[i])
    }

    fn add_child(&mut self, parent: NodeId, key: u8) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(TrieNode {
            key,
            children: Vec::new(),
            postings: Vec::new(),
        });
        let pos = self.nodes[parent as usize]
            .children
            .binary_search_by_key(&key, |&c| self.nodes[c as usize].key)
            .unwrap_err();
        self.nodes[parent as usize].children.insert(pos, id);
        id
    }
}
