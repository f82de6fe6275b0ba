//! Query engine: walks the serialized node table directly.
//!
//! Per query: `Start → DescendNeedle → {Exhausted | NeedleMatched} →
//! CollectFiles? → CollectAutocomplete? → Done`. Matching is prefix-mode:
//! the needle anchors a trie node and every token in the anchor's subtree
//! counts as a match. Exhaustion (no anchor) and an unknown `only_filepath`
//! produce a valid, empty result.
//!
//! Traversal is defensive: every phase carries a visit budget derived from
//! the header's node count, so a corrupt file encoding a cycle fails with
//! `CorruptIndex` instead of looping.

use crate::error::{Error, Result};
use crate::index::reader::{IndexFile, NodeRec};
use crate::index::types::{FileIndex, NO_POSTINGS};
use crate::query::params::{QueryFlags, SearchParams};
use crate::query::results::{FileMatches, LineMatch, SearchResult, Suggestion};
use crate::utils::{normalize_needle, MAX_TOKEN_LENGTH};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::time::Instant;

/// Query executor over one opened index. Read-only; independent queries
/// against the same index are safe to run concurrently.
pub struct QueryExecutor<'a> {
    index: &'a IndexFile,
}

#[derive(Default)]
struct FileAgg {
    count: u32,
    lines: BTreeMap<u32, u32>,
}

impl IndexFile {
    /// Run one query. Equivalent to `QueryExecutor::new(self).execute(params)`.
    pub fn search(&self, params: &SearchParams<'_>) -> Result<SearchResult> {
        QueryExecutor::new(self).execute(params)
    }
}

impl<'a> QueryExecutor<'a> {
    pub fn new(index: &'a IndexFile) -> Self {
        Self { index }
    }

    pub fn execute(&self, params: &SearchParams<'_>) -> Result<SearchResult> {
        let started = Instant::now();

        let caps = self.index.caps();
        let mut eff = params.flags.0;
        if !caps.has_line_numbers() {
            eff &= !QueryFlags::FILE_LINES;
        }
        if !caps.has_line_quotes() {
            eff &= !QueryFlags::QUOTE_LINE;
        }
        // Quoting rides on line results
        if eff & QueryFlags::FILE_LINES == 0 {
            eff &= !QueryFlags::QUOTE_LINE;
        }
        let effective = QueryFlags::new(eff);

        let done = |files, autocomplete| SearchResult {
            files,
            autocomplete,
            duration_ms: started.elapsed().as_millis() as u32,
            effective_flags: effective,
        };

        let only = match params.only_filepath {
            Some(path) => match self.index.file_index_of(path) {
                Some(i) => Some(i),
                // Unknown filter: empty result, not an error
                None => return Ok(done(Vec::new(), Vec::new())),
            },
            None => None,
        };

        let needle = normalize_needle(params.needle);
        let anchor = match self.descend(&needle)? {
            Some(off) => off,
            // Exhausted: the needle has no anchor in the trie
            None => return Ok(done(Vec::new(), Vec::new())),
        };

        let files = if effective.files() {
            self.collect_files(anchor, only, effective, params)?
        } else {
            Vec::new()
        };
        let autocomplete = if effective.autocomplete() {
            self.collect_autocomplete(anchor, &needle, params.max_autocomplete)?
        } else {
            Vec::new()
        };

        Ok(done(files, autocomplete))
    }

    /// Follow the needle byte-by-byte from the root. None = no anchor.
    fn descend(&self, needle: &[u8]) -> Result<Option<u32>> {
        let mut cur_off = self.index.root_offset();
        let mut cur = self.index.node_at(cur_off)?;
        for &byte in needle {
            let mut off = cur.child;
            let mut steps = 0u32;
            let mut found = None;
            while off != 0 {
                steps += 1;
                if steps > self.index.node_count() {
                    return Err(Error::corrupt("sibling chain cycle"));
                }
                let node = self.index.node_at(off)?;
                if node.key == byte {
                    found = Some((off, node));
                    break;
                }
                off = node.sibling;
            }
            match found {
                Some((off, node)) => {
                    cur_off = off;
                    cur = node;
                }
                None => return Ok(None),
            }
        }
        Ok(Some(cur_off))
    }

    /// Visit every node of the subtree rooted at `anchor` exactly once.
    fn walk_subtree(
        &self,
        anchor: u32,
        mut visit: impl FnMut(&NodeRec) -> Result<()>,
    ) -> Result<()> {
        let root = self.index.node_at(anchor)?;
        visit(&root)?;

        let mut visits = 0u32;
        let mut stack = Vec::new();
        if root.child != 0 {
            stack.push(root.child);
        }
        while let Some(off) = stack.pop() {
            visits += 1;
            if visits > self.index.node_count() {
                return Err(Error::corrupt("subtree visit budget exceeded (cycle?)"));
            }
            let node = self.index.node_at(off)?;
            visit(&node)?;
            // Siblings stay inside the subtree because only the anchor's
            // child chain seeds the stack, never the anchor's own sibling.
            if node.sibling != 0 {
                stack.push(node.sibling);
            }
            if node.child != 0 {
                stack.push(node.child);
            }
        }
        Ok(())
    }

    fn collect_files(
        &self,
        anchor: u32,
        only: Option<FileIndex>,
        effective: QueryFlags,
        params: &SearchParams<'_>,
    ) -> Result<Vec<FileMatches>> {
        let mut agg: FxHashMap<FileIndex, FileAgg> = FxHashMap::default();

        self.walk_subtree(anchor, |node| {
            if node.postings == NO_POSTINGS {
                return Ok(());
            }
            for fp in self.index.postings_at(node.postings)? {
                if only.is_some_and(|o| o != fp.file_index) {
                    continue;
                }
                let entry = agg.entry(fp.file_index).or_default();
                // Totals come off disk; saturate rather than trust them
                entry.count = entry.count.saturating_add(fp.total);
                if effective.file_lines() {
                    for (line, count) in fp.lines {
                        let slot = entry.lines.entry(line).or_insert(0);
                        *slot = slot.saturating_add(count);
                    }
                }
            }
            Ok(())
        })?;

        // Descending match count, ties by ascending file index, then cut.
        let mut ranked: Vec<(FileIndex, FileAgg)> = agg.into_iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));
        ranked.truncate(params.max_files);

        let mut files = Vec::with_capacity(ranked.len());
        for (file_index, agg) in ranked {
            let entry = self
                .index
                .file_entry(file_index)
                .ok_or_else(|| Error::corrupt("posting names unknown file"))?;
            let lines = agg
                .lines
                .into_iter()
                .take(params.max_lines)
                .map(|(line, count)| LineMatch {
                    line,
                    count,
                    text: if effective.quote_line() {
                        self.index.quote_line(file_index, line)
                    } else {
                        None
                    },
                })
                .collect();
            files.push(FileMatches {
                path: entry.path.clone(),
                priority: entry.priority,
                matches: agg.count,
                lines_in_file: entry.lines_seen,
                lines,
            });
        }
        Ok(files)
    }

    fn collect_autocomplete(
        &self,
        anchor: u32,
        needle: &[u8],
        max: usize,
    ) -> Result<Vec<Suggestion>> {
        let mut out = Vec::new();
        if max == 0 {
            return Ok(out);
        }

        let anchor_node = self.index.node_at(anchor)?;

        // The anchor itself, when terminal, is a candidate: its suggestion
        // text equals the needle.
        if anchor_node.postings != NO_POSTINGS && !needle.is_empty() {
            let (agg, _) = self.subtree_stats(anchor)?;
            out.push(Suggestion {
                text: String::from_utf8_lossy(needle).into_owned(),
                instances: self.direct_instances(&anchor_node)?,
                agg_instances: agg,
                elided: false,
                has_children: anchor_node.child != 0,
            });
        }

        let mut text = needle.to_vec();
        self.emit_children(&anchor_node, &mut text, max, &mut out, 0)?;

        // Descending aggregate, ties lexicographic by suggestion text.
        out.sort_by(|a, b| b.agg_instances.cmp(&a.agg_instances).then(a.text.cmp(&b.text)));
        out.truncate(max);
        Ok(out)
    }

    /// Candidate enumeration, depth-first in key order. A child whose
    /// subtree holds more completions than the remaining budget is emitted
    /// as one elided summary instead of being recursed into.
    fn emit_children(
        &self,
        node: &NodeRec,
        text: &mut Vec<u8>,
        max: usize,
        out: &mut Vec<Suggestion>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_TOKEN_LENGTH {
            return Err(Error::corrupt("trie deeper than the longest token"));
        }

        let mut off = node.child;
        let mut steps = 0u32;
        while off != 0 {
            steps += 1;
            if steps > self.index.node_count() {
                return Err(Error::corrupt("sibling chain cycle"));
            }
            if out.len() >= max {
                break;
            }

            let child = self.index.node_at(off)?;
            let (agg, completions) = self.subtree_stats(off)?;
            let remaining = max - out.len();

            text.push(child.key);
            if completions as usize > remaining {
                out.push(Suggestion {
                    text: String::from_utf8_lossy(text).into_owned(),
                    instances: self.direct_instances(&child)?,
                    agg_instances: agg,
                    elided: true,
                    has_children: child.child != 0,
                });
            } else {
                if child.postings != NO_POSTINGS {
                    out.push(Suggestion {
                        text: String::from_utf8_lossy(text).into_owned(),
                        instances: self.direct_instances(&child)?,
                        agg_instances: agg,
                        elided: false,
                        has_children: child.child != 0,
                    });
                }
                self.emit_children(&child, text, max, out, depth + 1)?;
            }
            text.pop();

            off = child.sibling;
        }
        Ok(())
    }

    /// (aggregate instances, completion count) over a node's subtree, the
    /// node itself included.
    fn subtree_stats(&self, anchor: u32) -> Result<(u32, u32)> {
        let mut agg = 0u32;
        let mut completions = 0u32;
        self.walk_subtree(anchor, |node| {
            if node.postings != NO_POSTINGS {
                completions += 1;
                for fp in self.index.postings_at(node.postings)? {
                    agg = agg.saturating_add(fp.total);
                }
            }
            Ok(())
        })?;
        Ok((agg, completions))
    }

    fn direct_instances(&self, node: &NodeRec) -> Result<u32> {
        if node.postings == NO_POSTINGS {
            return Ok(0);
        }
        let mut total = 0u32;
        for fp in self.index.postings_at(node.postings)? {
            total = total.saturating_add(fp.total);
        }
        Ok(total)
    }
}
