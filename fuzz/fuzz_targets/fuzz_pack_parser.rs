//! Fuzz target for pack file parsing.
//!
//! Tests that the pack parser handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mygit_storage::ObjectStore;
use mygit_transport::PackParser;

fuzz_target!(|data: &[u8]| {
    // A fresh store for each fuzz iteration.
    let Ok(dir) = tempfile::TempDir::new() else {
        return;
    };
    let store = ObjectStore::new(dir.path().join("objects"));

    let _ = PackParser::new(data).parse(&store);
});
