#![no_main]

use libfuzzer_sys::fuzz_target;
use trix::{IndexFile, QueryFlags, SearchParams};

// Arbitrary bytes must never panic, loop or read out of bounds, whether
// they fail validation at open or reach query traversal.
fuzz_target!(|data: &[u8]| {
    let Ok(index) = IndexFile::from_bytes(data.to_vec()) else {
        return;
    };
    for needle in ["", "a", "th", "token"] {
        let mut params = SearchParams::new(needle);
        params.flags = QueryFlags::new(
            QueryFlags::AUTOCOMPLETE | QueryFlags::FILES | QueryFlags::FILE_LINES
                | QueryFlags::QUOTE_LINE,
        );
        params.max_autocomplete = 8;
        params.max_files = 8;
        params.max_lines = 8;
        let _ = index.search(&params);
    }
});
