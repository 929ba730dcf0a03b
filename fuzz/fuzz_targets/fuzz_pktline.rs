//! Fuzz target for pkt-line framing.
//!
//! Tests that the reader handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mygit_transport::PktLineReader;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = PktLineReader::new(Cursor::new(data));
    while let Ok(Some(_)) = reader.read() {}
});
