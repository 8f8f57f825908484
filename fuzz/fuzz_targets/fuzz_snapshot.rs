//! Fuzz target for the snapshot pipeline.
//!
//! Arbitrary bytes that decode as JSON go through flatten and translate.
//! Neither may panic, and a produced patch must never translate again.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vss_path_adapter::{flatten, translate_snapshot, Document, TranslationTable};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let snapshot = Document::from(value);
    let _ = flatten(&snapshot);

    let Ok(table) = TranslationTable::builtin() else {
        return;
    };
    if let Ok(Some(patch)) = translate_snapshot(&table, &snapshot) {
        assert!(matches!(translate_snapshot(&table, &patch), Ok(None)));
    }
});
