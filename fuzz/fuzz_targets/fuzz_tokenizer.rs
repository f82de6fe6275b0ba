#![no_main]

use libfuzzer_sys::fuzz_target;
use trix::utils::{is_binary, normalize_needle, TokenScanner, MAX_TOKEN_LENGTH, MIN_TOKEN_LENGTH};

// Scan arbitrary bytes in arbitrary chunkings; the chunking must not change
// the emitted token stream.
fuzz_target!(|data: &[u8]| {
    let _ = is_binary(data);
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = normalize_needle(s);
    }

    let scan = |chunks: &[&[u8]]| {
        let mut scanner = TokenScanner::new(true);
        let mut tokens = Vec::new();
        for chunk in chunks {
            scanner.scan(chunk, |tok, line| {
                assert!(tok.len() >= MIN_TOKEN_LENGTH && tok.len() <= MAX_TOKEN_LENGTH);
                tokens.push((tok.to_vec(), line));
            });
        }
        scanner.flush(|tok, line| tokens.push((tok.to_vec(), line)));
        tokens
    };

    let whole = scan(&[data]);
    let split = data.len() / 2;
    let halves = scan(&[&data[..split], &data[split..]]);
    assert_eq!(whole, halves);
});
