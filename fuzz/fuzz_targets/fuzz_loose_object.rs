//! Fuzz target for the loose-object codec.
//!
//! Tests that decompression handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mygit_storage::GitObject;

fuzz_target!(|data: &[u8]| {
    let _ = GitObject::decompress(data);
});
