//! Fuzz target for path normalization and parsing.
//!
//! Normalization must be total and idempotent, and any path that parses
//! must print back as its normalized input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vss_path_adapter::{normalize, Path, TranslationTable};

fuzz_target!(|raw: &str| {
    let once = normalize(raw);
    assert_eq!(normalize(&once), once);

    if let Ok(path) = Path::parse(raw) {
        assert_eq!(path.to_canonical(), once);
        assert!(path.segments().iter().all(|s| !s.is_empty()));
    }

    // Lookups on arbitrary input should never panic
    if let Ok(table) = TranslationTable::builtin() {
        let _ = table.translate(raw);
    }
});
