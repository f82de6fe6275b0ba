//! Token policy and the streaming scanner used by the builder.
//!
//! A token is a maximal run of ASCII alphanumeric or underscore bytes,
//! lowercased. Runs shorter than [`MIN_TOKEN_LENGTH`] are skipped; runs
//! longer than [`MAX_TOKEN_LENGTH`] are dropped entirely (base64 blobs, hex
//! dumps and similar non-searchable content). Query needles are normalized
//! with the same policy so prefix descent lines up with what was indexed.

/// Minimum token length to store in the index.
pub const MIN_TOKEN_LENGTH: usize = 2;

/// Maximum token length to store in the index.
/// Longer runs are likely base64, hex dumps, or other non-searchable content.
pub const MAX_TOKEN_LENGTH: usize = 64;

/// Whether a byte continues a token.
#[inline]
pub fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Normalize a query needle: lowercase the leading token bytes.
///
/// Everything from the first non-token byte on is ignored, so a needle like
/// `"quick "` anchors the same place as `"quick"`. An empty result anchors
/// at the trie root (matches every token, bounded only by the query limits).
pub fn normalize_needle(needle: &str) -> Vec<u8> {
    needle
        .bytes()
        .take_while(|&b| is_token_byte(b))
        .take(MAX_TOKEN_LENGTH)
        .map(|b| b.to_ascii_lowercase())
        .collect()
}

/// Incremental tokenizer state for one file's content stream.
///
/// `fill` may deliver a file in arbitrary chunks; a token split across two
/// chunks is carried in `pending` and emitted once its run ends. The line
/// counter advances on every `\n` observed. Call [`TokenScanner::flush`]
/// once the stream is complete to emit a token that runs to end-of-file.
pub struct TokenScanner {
    pending: Vec<u8>,
    /// Current run exceeded MAX_TOKEN_LENGTH; swallow the rest of it.
    overlong: bool,
    line: u32,
    line_has_content: bool,
    /// Completed line texts, retained only when line quoting is enabled.
    line_texts: Option<Vec<String>>,
    current_line: Vec<u8>,
}

impl TokenScanner {
    pub fn new(retain_line_text: bool) -> Self {
        Self {
            pending: Vec::new(),
            overlong: false,
            line: 1,
            line_has_content: false,
            line_texts: retain_line_text.then(Vec::new),
            current_line: Vec::new(),
        }
    }

    /// Current 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Total lines observed so far. A trailing line without a newline
    /// counts; a trailing newline does not open a new line.
    pub fn lines_seen(&self) -> u32 {
        self.line - 1 + self.line_has_content as u32
    }

    /// Scan a chunk of the stream, emitting `(token_bytes, line)` for every
    /// completed token. The token is reported on the line it started on.
    pub fn scan(&mut self, bytes: &[u8], mut emit: impl FnMut(&[u8], u32)) {
        for &byte in bytes {
            // Line text retains every raw byte, including runs the token
            // policy drops.
            if byte != b'\n' {
                self.line_has_content = true;
                if self.line_texts.is_some() {
                    self.current_line.push(byte);
                }
            }
            if is_token_byte(byte) {
                if self.overlong {
                    continue;
                }
                if self.pending.len() == MAX_TOKEN_LENGTH {
                    self.pending.clear();
                    self.overlong = true;
                    continue;
                }
                self.pending.push(byte.to_ascii_lowercase());
            } else {
                self.emit_pending(&mut emit);
                if byte == b'\n' {
                    self.end_line();
                }
            }
        }
    }

    /// End of stream: emit a token that ran to EOF and close the last line.
    pub fn flush(&mut self, mut emit: impl FnMut(&[u8], u32)) {
        self.emit_pending(&mut emit);
        if self.line_texts.is_some() && !self.current_line.is_empty() {
            self.end_line();
        }
    }

    /// Retained line texts, in order, if quoting was enabled.
    pub fn take_line_texts(&mut self) -> Option<Vec<String>> {
        self.line_texts.take()
    }

    fn emit_pending(&mut self, emit: &mut impl FnMut(&[u8], u32)) {
        if self.pending.len() >= MIN_TOKEN_LENGTH {
            emit(&self.pending, self.line);
        }
        self.pending.clear();
        self.overlong = false;
    }

    fn end_line(&mut self) {
        if let Some(texts) = &mut self.line_texts {
            texts.push(String::from_utf8_lossy(&self.current_line).into_owned());
            self.current_line.clear();
        }
        self.line += 1;
        self.line_has_content = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(chunks: &[&[u8]]) -> Vec<(String, u32)> {
        let mut scanner = TokenScanner::new(false);
        let mut out = Vec::new();
        for chunk in chunks {
            scanner.scan(chunk, |tok, line| {
                out.push((String::from_utf8(tok.to_vec()).unwrap(), line));
            });
        }
        scanner.flush(|tok, line| {
            out.push((String::from_utf8(tok.to_vec()).unwrap(), line));
        });
        out
    }

    #[test]
    fn test_basic_tokens() {
        let toks = scan_all(&[b"the quick Fox"]);
        assert_eq!(
            toks,
            vec![
                ("the".to_string(), 1),
                ("quick".to_string(), 1),
                ("fox".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let toks = scan_all(&[b"one\ntwo\nthree"]);
        assert_eq!(
            toks,
            vec![
                ("one".to_string(), 1),
                ("two".to_string(), 2),
                ("three".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_token_split_across_chunks() {
        // "quick" split mid-token must come out whole, on the right line
        let toks = scan_all(&[b"first\nqui", b"ck end"]);
        assert_eq!(
            toks,
            vec![
                ("first".to_string(), 1),
                ("quick".to_string(), 2),
                ("end".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_short_tokens_skipped() {
        let toks = scan_all(&[b"a bc d ef"]);
        assert_eq!(toks, vec![("bc".to_string(), 1), ("ef".to_string(), 1)]);
    }

    #[test]
    fn test_overlong_run_dropped() {
        let long = vec![b'x'; MAX_TOKEN_LENGTH + 1];
        let mut input = long.clone();
        input.extend_from_slice(b" tail");
        let toks = scan_all(&[&input]);
        assert_eq!(toks, vec![("tail".to_string(), 1)]);
    }

    #[test]
    fn test_overlong_run_split_across_chunks() {
        let half = vec![b'y'; MAX_TOKEN_LENGTH];
        let toks = scan_all(&[&half, b"yy ok"]);
        assert_eq!(toks, vec![("ok".to_string(), 1)]);
    }

    #[test]
    fn test_retained_line_text() {
        let mut scanner = TokenScanner::new(true);
        scanner.scan(b"the quick fox\nsecond line\n", |_, _| {});
        scanner.flush(|_, _| {});
        let lines = scanner.take_line_texts().unwrap();
        assert_eq!(lines, vec!["the quick fox", "second line"]);
    }

    #[test]
    fn test_retained_line_text_keeps_overlong_runs() {
        let mut input = b"start ".to_vec();
        input.extend(vec![b'x'; MAX_TOKEN_LENGTH + 6]);
        input.extend_from_slice(b" end\nnext\n");

        let mut scanner = TokenScanner::new(true);
        let mut tokens = Vec::new();
        scanner.scan(&input, |tok, _| tokens.push(tok.to_vec()));
        scanner.flush(|tok, _| tokens.push(tok.to_vec()));

        // The run is still dropped from the token stream
        assert_eq!(tokens, vec![b"start".to_vec(), b"end".to_vec(), b"next".to_vec()]);
        // but the retained line text is byte-for-byte the original
        let lines = scanner.take_line_texts().unwrap();
        let expected = String::from_utf8(input[..input.len() - "\nnext\n".len()].to_vec()).unwrap();
        assert_eq!(lines, vec![expected, "next".to_string()]);
    }

    #[test]
    fn test_lines_seen() {
        let mut scanner = TokenScanner::new(false);
        assert_eq!(scanner.lines_seen(), 0);
        scanner.scan(b"one\ntwo\n", |_, _| {});
        assert_eq!(scanner.lines_seen(), 2);
        scanner.scan(b"three", |_, _| {});
        scanner.flush(|_, _| {});
        assert_eq!(scanner.lines_seen(), 3);
    }

    #[test]
    fn test_normalize_needle() {
        assert_eq!(normalize_needle("Quick"), b"quick".to_vec());
        assert_eq!(normalize_needle("qu ick"), b"qu".to_vec());
        assert_eq!(normalize_needle(""), Vec::<u8>::new());
    }
}
