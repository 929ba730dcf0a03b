//! # mygit-transport
//!
//! The wire side of the clone pipeline: pkt-line framing, smart HTTP ref
//! discovery and want-list negotiation, packfile parsing, and REF_DELTA
//! resolution.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod delta;
mod error;
mod pack;
mod pktline;
mod protocol;

pub use delta::{apply_delta, DeltaResolver};
pub use error::{Result, TransportError};
pub use pack::{PackParser, ParsedPack, RefDelta};
pub use pktline::{to_pkt_line, PktLine, PktLineReader};
pub use protocol::{
    discover_refs, fetch_pack, negotiation_request, parse_advertisement, read_pack_response,
    sanitize_url, RemoteRef, RemoteRefs,
};
