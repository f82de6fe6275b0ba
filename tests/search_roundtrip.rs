//! End-to-end tests over the full build / serialize / open / search cycle.
//!
//! Everything here goes through the public API only: bytes in through the
//! builder, an index file out, queries against the opened file.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use trix::index::BuilderOptions;
use trix::{IndexBuilder, IndexFile, QueryFlags, SearchParams};

const CORPUS: &[(&str, &str)] = &[
    (
        "src/lexer.rs",
        "fn next_token(input: &str) -> Token {\n    let mut chars = input.chars();\n    // token boundaries follow identifier rules\n    loop {\n        let token = chars.next();\n    }\n}\n",
    ),
    (
        "src/parser.rs",
        "fn parse(tokens: &[Token]) -> Ast {\n    let token = tokens.first();\n    parse_expr(token)\n}\n",
    ),
    (
        "README.md",
        "A tokenizer and parser playground.\nTokens are produced by the lexer.\n",
    ),
];

fn build_corpus(options: BuilderOptions) -> Vec<u8> {
    let mut sink = Vec::new();
    let mut builder = IndexBuilder::with_options(&mut sink, options);
    for &(path, text) in CORPUS {
        let f = builder.index_file(path, 0).unwrap();
        // Feed in small chunks so tokens split across fill calls
        for chunk in text.as_bytes().chunks(7) {
            builder.fill(f, chunk).unwrap();
        }
    }
    builder.serialize().unwrap();
    sink
}

/// The token policy, restated independently of the crate internals.
fn extract_tokens(text: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            current.push(c.to_ascii_lowercase());
        } else if !current.is_empty() {
            if current.len() >= 2 && current.len() <= 64 {
                out.insert(std::mem::take(&mut current));
            }
            current.clear();
        }
    }
    if current.len() >= 2 && current.len() <= 64 {
        out.insert(current);
    }
    out
}

#[test]
fn every_indexed_token_is_findable() {
    let index = IndexFile::from_bytes(build_corpus(BuilderOptions::default())).unwrap();
    for &(_, text) in CORPUS {
        for token in extract_tokens(text) {
            let params = SearchParams::new(&token);
            let result = index.search(&params).unwrap();
            assert!(
                !result.files.is_empty(),
                "token {token:?} indexed but not found"
            );
            let total: u32 = result.files.iter().map(|f| f.matches).sum();
            assert!(total >= 1);
        }
    }
}

#[test]
fn absent_needle_yields_empty_result() {
    let index = IndexFile::from_bytes(build_corpus(BuilderOptions::default())).unwrap();
    let result = index.search(&SearchParams::new("zzyzzy")).unwrap();
    assert!(result.files.is_empty());
    assert!(result.autocomplete.is_empty());
}

#[test]
fn open_from_disk_and_search() {
    let dir = std::env::temp_dir().join(format!("trix_test_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path: PathBuf = dir.join("roundtrip.trix");
    fs::write(&path, build_corpus(BuilderOptions::default())).unwrap();

    let index = IndexFile::open(&path).unwrap();
    let result = index.search(&SearchParams::new("token")).unwrap();
    assert_eq!(result.files.len(), 3);

    drop(index);
    let _ = fs::remove_file(&path);
}

#[test]
fn repeated_fill_accumulates_counts() {
    let body = b"alpha beta alpha\n";
    let build = |repeats: usize| {
        let mut sink = Vec::new();
        let mut builder = IndexBuilder::new(&mut sink);
        let f = builder.index_file("a.txt", 0).unwrap();
        for _ in 0..repeats {
            builder.fill(f, body).unwrap();
        }
        builder.serialize().unwrap();
        sink
    };

    let count_alpha = |bytes: Vec<u8>| {
        let index = IndexFile::from_bytes(bytes).unwrap();
        let result = index.search(&SearchParams::new("alpha")).unwrap();
        result.files.iter().map(|f| f.matches).sum::<u32>()
    };

    assert_eq!(count_alpha(build(1)), 2);
    assert_eq!(count_alpha(build(3)), 6);
}

#[test]
fn prefix_counts_are_monotone() {
    let index = IndexFile::from_bytes(build_corpus(BuilderOptions::default())).unwrap();
    let total = |needle: &str| {
        let result = index.search(&SearchParams::new(needle)).unwrap();
        result.files.iter().map(|f| f.matches).sum::<u32>()
    };
    // Shortening the needle can only widen the match set
    assert!(total("to") >= total("tok"));
    assert!(total("tok") >= total("token"));
    assert!(total("token") >= total("tokens"));
    assert!(total("tokens") >= 1);
}

#[test]
fn limits_are_respected() {
    let mut sink = Vec::new();
    let mut builder = IndexBuilder::new(&mut sink);
    for i in 0..50 {
        let f = builder.index_file(&format!("file_{i:02}.txt"), 0).unwrap();
        let mut body = String::new();
        for line in 0..30 {
            body.push_str(&format!("needle on line {line}\n"));
        }
        builder.fill(f, body.as_bytes()).unwrap();
    }
    builder.serialize().unwrap();

    let index = IndexFile::from_bytes(sink).unwrap();
    let mut params = SearchParams::new("needle");
    params.flags = QueryFlags::new(QueryFlags::FILES | QueryFlags::FILE_LINES);
    params.max_files = 5;
    params.max_lines = 4;
    let result = index.search(&params).unwrap();
    assert_eq!(result.files.len(), 5);
    for file in &result.files {
        assert_eq!(file.lines.len(), 4);
        // Full per-file total survives line truncation
        assert_eq!(file.matches, 30);
        assert_eq!(file.lines_in_file, 30);
    }
}

#[test]
fn two_file_scenario() {
    let mut sink = Vec::new();
    let mut builder = IndexBuilder::new(&mut sink);
    let a = builder.index_file("a.txt", 0).unwrap();
    let b = builder.index_file("b.txt", 0).unwrap();
    builder.fill(a, b"the quick brown fox\nthe lazy dog\n").unwrap();
    builder.fill(b, b"the quiet queue\n").unwrap();
    builder.serialize().unwrap();
    let index = IndexFile::from_bytes(sink).unwrap();

    let mut params = SearchParams::new("the");
    params.flags = QueryFlags::new(QueryFlags::FILES | QueryFlags::FILE_LINES);
    let result = index.search(&params).unwrap();
    assert_eq!(result.files.len(), 2);
    // a.txt has two instances of "the", so it ranks first
    assert_eq!(result.files[0].path, "a.txt");
    assert_eq!(result.files[0].matches, 2);
    assert_eq!(result.files[0].lines.len(), 2);
    assert_eq!(result.files[1].path, "b.txt");
    assert_eq!(result.files[1].matches, 1);

    let mut params = SearchParams::new("qu");
    params.flags = QueryFlags::new(QueryFlags::AUTOCOMPLETE);
    params.max_autocomplete = 10;
    let result = index.search(&params).unwrap();
    let texts: Vec<&str> = result.autocomplete.iter().map(|s| s.text.as_str()).collect();
    assert!(texts.contains(&"quick"));
    assert!(texts.contains(&"quiet"));
    assert!(texts.contains(&"queue"));
}

#[test]
fn only_filepath_restricts_results() {
    let index = IndexFile::from_bytes(build_corpus(BuilderOptions::default())).unwrap();

    let mut params = SearchParams::new("token");
    params.only_filepath = Some("src/parser.rs");
    let result = index.search(&params).unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].path, "src/parser.rs");

    params.only_filepath = Some("no/such/file.rs");
    let result = index.search(&params).unwrap();
    assert!(result.files.is_empty());
}

#[test]
fn quote_lines_flow_through_search() {
    let options = BuilderOptions {
        retain_line_numbers: true,
        retain_line_text: true,
    };
    let index = IndexFile::from_bytes(build_corpus(options)).unwrap();

    let mut params = SearchParams::new("playground");
    params.flags = QueryFlags::new(
        QueryFlags::FILES | QueryFlags::FILE_LINES | QueryFlags::QUOTE_LINE,
    );
    let result = index.search(&params).unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(
        result.files[0].lines[0].text.as_deref(),
        Some("A tokenizer and parser playground.")
    );
}

#[test]
fn quoted_line_preserves_long_runs() {
    // Runs past the token length cap are dropped from the trie but must
    // survive verbatim in the quoted line
    let body = format!("start {} end\n", "x".repeat(70));
    let mut sink = Vec::new();
    let options = BuilderOptions {
        retain_line_numbers: true,
        retain_line_text: true,
    };
    let mut builder = IndexBuilder::with_options(&mut sink, options);
    let f = builder.index_file("a.txt", 0).unwrap();
    builder.fill(f, body.as_bytes()).unwrap();
    builder.serialize().unwrap();

    let index = IndexFile::from_bytes(sink).unwrap();
    let mut params = SearchParams::new("start");
    params.flags = QueryFlags::new(
        QueryFlags::FILES | QueryFlags::FILE_LINES | QueryFlags::QUOTE_LINE,
    );
    let result = index.search(&params).unwrap();
    assert_eq!(
        result.files[0].lines[0].text.as_deref(),
        Some(body.trim_end())
    );
}

#[test]
fn quote_flag_degrades_without_capability() {
    // Default options retain line numbers but not line text
    let index = IndexFile::from_bytes(build_corpus(BuilderOptions::default())).unwrap();
    let mut params = SearchParams::new("playground");
    params.flags = QueryFlags::new(
        QueryFlags::FILES | QueryFlags::FILE_LINES | QueryFlags::QUOTE_LINE,
    );
    let result = index.search(&params).unwrap();
    assert!(!result.effective_flags.quote_line());
    assert!(result.effective_flags.file_lines());
    assert!(result.files[0].lines[0].text.is_none());
}

#[test]
fn corrupted_bytes_never_panic() {
    let clean = build_corpus(BuilderOptions::default());

    // Truncation loses the end marker
    let mut truncated = clean.clone();
    truncated.truncate(truncated.len() / 2);
    assert!(IndexFile::from_bytes(truncated).is_err());

    // Flip every byte position in turn; each variant must either fail to
    // open or answer queries with Ok/Err, never panic or hang
    for pos in 0..clean.len() {
        let mut mutated = clean.clone();
        mutated[pos] ^= 0xFF;
        if let Ok(index) = IndexFile::from_bytes(mutated) {
            let mut params = SearchParams::new("token");
            params.flags = QueryFlags::new(
                QueryFlags::AUTOCOMPLETE | QueryFlags::FILES | QueryFlags::FILE_LINES,
            );
            let _ = index.search(&params);
        }
    }
}

#[test]
fn concurrent_searches_share_one_handle() {
    let index = IndexFile::from_bytes(build_corpus(BuilderOptions::default())).unwrap();
    let index = &index;

    std::thread::scope(|scope| {
        for needle in ["token", "parse", "lexer", "to", "zz"] {
            scope.spawn(move || {
                for _ in 0..50 {
                    let mut params = SearchParams::new(needle);
                    params.flags =
                        QueryFlags::new(QueryFlags::AUTOCOMPLETE | QueryFlags::FILES);
                    let result = index.search(&params).unwrap();
                    if needle == "token" {
                        assert!(!result.files.is_empty());
                    }
                }
            });
        }
    });
}
