//! Fuzz target for commit payload parsing.
//!
//! Tests that the parser handles arbitrary payloads without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mygit_storage::{parse_tree, Commit};

fuzz_target!(|data: &[u8]| {
    let _ = Commit::parse(data);
    let _ = parse_tree(data);
});
