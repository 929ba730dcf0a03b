//! Pkt-line framing.
//!
//! Each line is prefixed with a 4-hex-digit length that counts the prefix
//! itself; `0000` is the flush sentinel that terminates a section.

use crate::{Result, TransportError};
use std::io::Read;

/// A pkt-line packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (0000).
    Flush,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Data(data) => {
                let len = data.len() + 4;
                let mut result = format!("{len:04x}").into_bytes();
                result.extend_from_slice(data);
                result
            }
            Self::Flush => b"0000".to_vec(),
        }
    }

    /// Returns the data content, or None for the flush packet.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            Self::Flush => None,
        }
    }
}

/// Encodes a string as a single pkt-line.
pub fn to_pkt_line(s: &str) -> Vec<u8> {
    PktLine::from_string(s).encode()
}

/// Reader for pkt-line framed streams.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next packet. Returns `None` at end of stream.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len_str = std::str::from_utf8(&len_buf)
            .map_err(|_| TransportError::InvalidPktLine("length prefix is not hex".to_string()))?;
        let len = usize::from_str_radix(len_str, 16)
            .map_err(|_| TransportError::InvalidPktLine(format!("bad length prefix: {len_str}")))?;

        match len {
            0 => Ok(Some(PktLine::Flush)),
            1..=3 => Err(TransportError::InvalidPktLine(format!(
                "length {len} shorter than its own prefix"
            ))),
            _ => {
                let mut data = vec![0u8; len - 4];
                self.reader.read_exact(&mut data)?;
                Ok(Some(PktLine::Data(data)))
            }
        }
    }

    /// Reads the next packet, requiring the stream not to end.
    pub fn read_required(&mut self) -> Result<PktLine> {
        self.read()?
            .ok_or_else(|| TransportError::InvalidPktLine("unexpected end of stream".to_string()))
    }

    /// Returns a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}
