//! Smart HTTP client: ref discovery and want-list negotiation.
//!
//! Implements the client half of the git smart HTTP protocol, v1 transport
//! without side-band framing.
//! See: https://git-scm.com/docs/http-protocol

use crate::pktline::{to_pkt_line, PktLine, PktLineReader};
use crate::{Result, TransportError};
use mygit_storage::ObjectId;
use std::io::{Read, Write};

const REF_DISCOVERY_PATH: &str = "/info/refs?service=git-upload-pack";
const UPLOAD_PACK_PATH: &str = "/git-upload-pack";
const UPLOAD_PACK_SERVICE: &str = "# service=git-upload-pack\n";
const UPLOAD_PACK_CONTENT_TYPE: &str = "application/x-git-upload-pack-request";

/// A reference advertised by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Object id the ref points to.
    pub id: ObjectId,
    /// Reference name, e.g. `HEAD` or `refs/heads/main`.
    pub name: String,
}

/// The remote's ref advertisement.
#[derive(Debug, Clone, Default)]
pub struct RemoteRefs {
    /// Advertised refs, in advertisement order.
    pub refs: Vec<RemoteRef>,
    /// Capability string from the first advertised ref. Recorded, not
    /// acted on.
    pub capabilities: String,
}

/// Trims the trailing slash some remotes are written with.
pub fn sanitize_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Fetches and parses the remote's ref advertisement.
pub fn discover_refs(url: &str) -> Result<RemoteRefs> {
    let url = sanitize_url(url);
    tracing::debug!(url, "discovering remote refs");

    let response = reqwest::blocking::Client::new()
        .get(format!("{url}{REF_DISCOVERY_PATH}"))
        .send()?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(TransportError::Protocol(format!(
            "GET {REF_DISCOVERY_PATH}: HTTP {status}"
        )));
    }

    parse_advertisement(response)
}

/// Parses a `git-upload-pack` advertisement from a raw response body.
///
/// Expects the service header pkt-line, a flush, then one
/// `<oid> <name>[\0<capabilities>]\n` pkt-line per ref, terminated by a
/// flush.
pub fn parse_advertisement(reader: impl Read) -> Result<RemoteRefs> {
    let mut pkt_reader = PktLineReader::new(reader);

    match pkt_reader.read_required()? {
        PktLine::Data(data) if data == UPLOAD_PACK_SERVICE.as_bytes() => {}
        PktLine::Data(data) => {
            return Err(TransportError::Protocol(format!(
                "bad service header: {:?}",
                String::from_utf8_lossy(&data)
            )));
        }
        PktLine::Flush => {
            return Err(TransportError::Protocol(
                "flush in place of service header".to_string(),
            ));
        }
    }

    match pkt_reader.read_required()? {
        PktLine::Flush => {}
        PktLine::Data(_) => {
            return Err(TransportError::Protocol(
                "missing flush after service header".to_string(),
            ));
        }
    }

    let mut remote = RemoteRefs::default();
    loop {
        match pkt_reader.read_required()? {
            PktLine::Flush => break,
            PktLine::Data(data) => {
                let (reference, caps) = parse_ref_line(&data)?;
                if let Some(caps) = caps {
                    remote.capabilities = caps;
                }
                remote.refs.push(reference);
            }
        }
    }

    tracing::debug!(refs = remote.refs.len(), "ref discovery complete");
    Ok(remote)
}

/// Parses `<oid> <name>[\0<capabilities>]\n`.
fn parse_ref_line(data: &[u8]) -> Result<(RemoteRef, Option<String>)> {
    let line = std::str::from_utf8(data)
        .map_err(|_| TransportError::Protocol("ref line is not UTF-8".to_string()))?;
    let line = line.trim_end_matches('\n');

    let (oid_hex, rest) = line
        .split_once(' ')
        .ok_or_else(|| TransportError::Protocol(format!("malformed ref line: {line}")))?;
    let id = ObjectId::from_hex(oid_hex)
        .map_err(|_| TransportError::Protocol(format!("malformed ref id: {oid_hex}")))?;

    let (name, caps) = match rest.split_once('\0') {
        Some((name, caps)) => (name, Some(caps.to_string())),
        None => (rest, None),
    };
    if name.is_empty() {
        return Err(TransportError::Protocol("empty ref name".to_string()));
    }

    Ok((
        RemoteRef {
            id,
            name: name.to_string(),
        },
        caps,
    ))
}

/// Builds the want-list request body for the advertised refs.
///
/// One `want` pkt-line per unique object id, a flush, then `done`.
pub fn negotiation_request(refs: &[RemoteRef]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut wanted: Vec<ObjectId> = Vec::new();

    for reference in refs {
        if !wanted.contains(&reference.id) {
            wanted.push(reference.id);
        }
    }

    // The first want line carries the capability list, empty here, so it
    // keeps the separator space before the newline.
    for (i, id) in wanted.iter().enumerate() {
        let line = if i == 0 {
            format!("want {} \n", id.to_hex())
        } else {
            format!("want {}\n", id.to_hex())
        };
        body.extend_from_slice(&to_pkt_line(&line));
    }

    body.extend_from_slice(&PktLine::Flush.encode());
    body.extend_from_slice(&to_pkt_line("done\n"));
    body
}

/// Negotiates a want-list and streams the resulting packfile into `out`.
///
/// Returns the number of packfile bytes written.
pub fn fetch_pack(url: &str, refs: &[RemoteRef], out: &mut impl Write) -> Result<u64> {
    let url = sanitize_url(url);
    let body = negotiation_request(refs);

    let response = reqwest::blocking::Client::new()
        .post(format!("{url}{UPLOAD_PACK_PATH}"))
        .header(reqwest::header::CONTENT_TYPE, UPLOAD_PACK_CONTENT_TYPE)
        .body(body)
        .send()?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(TransportError::Protocol(format!(
            "POST {UPLOAD_PACK_PATH}: HTTP {status}"
        )));
    }

    read_pack_response(response, out)
}

/// Consumes the `NAK` pkt-line and copies the raw packfile into `out`.
///
/// Without side-band the body is exactly one `0008NAK\n` pkt-line followed
/// by the packfile. The NAK is read with a full-read primitive: a short
/// first chunk from the network must not be mistaken for a bad response.
pub fn read_pack_response(mut reader: impl Read, out: &mut impl Write) -> Result<u64> {
    let mut nak = [0u8; 8];
    reader.read_exact(&mut nak)?;
    if &nak != b"0008NAK\n" {
        return Err(TransportError::Protocol(format!(
            "expected NAK, got {:?}",
            String::from_utf8_lossy(&nak)
        )));
    }

    let written = std::io::copy(&mut reader, out)?;
    tracing::debug!(bytes = written, "packfile received");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const OID_A: &str = "8c25759f3c2b14e9eab301079c8b505b59b3e1ef";
    const OID_B: &str = "4574b4c7bb073b6b661abd0558a639f7a32b3f8f";

    fn advertisement(lines: &[&str]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&to_pkt_line("# service=git-upload-pack\n"));
        body.extend_from_slice(b"0000");
        for line in lines {
            body.extend_from_slice(&to_pkt_line(line));
        }
        body.extend_from_slice(b"0000");
        body
    }

    #[test]
    fn parse_advertisement_with_capabilities() {
        let body = advertisement(&[
            &format!("{OID_A} HEAD\0multi_ack thin-pack agent=git/2.40\n"),
            &format!("{OID_A} refs/heads/main\n"),
            &format!("{OID_B} refs/tags/v1.0\n"),
        ]);

        let remote = parse_advertisement(Cursor::new(body)).unwrap();
        assert_eq!(remote.refs.len(), 3);
        assert_eq!(remote.refs[0].name, "HEAD");
        assert_eq!(remote.refs[0].id.to_hex(), OID_A);
        assert_eq!(remote.refs[2].name, "refs/tags/v1.0");
        assert_eq!(remote.capabilities, "multi_ack thin-pack agent=git/2.40");
    }

    #[test]
    fn advertisement_requires_service_header() {
        let mut body = Vec::new();
        body.extend_from_slice(&to_pkt_line("# service=git-receive-pack\n"));
        body.extend_from_slice(b"0000");

        let err = parse_advertisement(Cursor::new(body)).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn advertisement_requires_flush_after_header() {
        let mut body = Vec::new();
        body.extend_from_slice(&to_pkt_line("# service=git-upload-pack\n"));
        body.extend_from_slice(&to_pkt_line(&format!("{OID_A} HEAD\n")));

        let err = parse_advertisement(Cursor::new(body)).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn negotiation_request_layout() {
        let refs = vec![
            RemoteRef {
                id: ObjectId::from_hex(OID_A).unwrap(),
                name: "HEAD".to_string(),
            },
            RemoteRef {
                id: ObjectId::from_hex(OID_A).unwrap(),
                name: "refs/heads/main".to_string(),
            },
            RemoteRef {
                id: ObjectId::from_hex(OID_B).unwrap(),
                name: "refs/tags/v1.0".to_string(),
            },
        ];

        let body = negotiation_request(&refs);
        let expected = format!("0033want {OID_A} \n0032want {OID_B}\n00000009done\n");
        assert_eq!(body, expected.as_bytes());
    }

    #[test]
    fn pack_response_skips_nak() {
        let mut body = b"0008NAK\n".to_vec();
        body.extend_from_slice(b"PACKDATA");

        let mut out = Vec::new();
        let n = read_pack_response(Cursor::new(body), &mut out).unwrap();
        assert_eq!(n, 8);
        assert_eq!(out, b"PACKDATA");
    }

    #[test]
    fn pack_response_requires_nak() {
        let body = b"0007ACK\nPACK".to_vec();
        let mut out = Vec::new();

        let err = read_pack_response(Cursor::new(body), &mut out).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn sanitize_trims_trailing_slash() {
        assert_eq!(sanitize_url("http://host/repo/"), "http://host/repo");
        assert_eq!(sanitize_url("http://host/repo"), "http://host/repo");
    }
}
