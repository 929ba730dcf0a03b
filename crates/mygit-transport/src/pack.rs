//! Packfile parsing.
//!
//! A pack is `PACK` + version + object count, a sequence of entries, and a
//! trailing SHA-1 over everything preceding it.
//! See: https://git-scm.com/docs/pack-format

use crate::{Result, TransportError};
use flate2::read::ZlibDecoder;
use mygit_storage::{GitObject, ObjectId, ObjectKind, ObjectStore};
use sha1::{Digest, Sha1};
use std::io::Read;

/// Magic bytes at the start of a pack file.
const PACK_SIGNATURE: &[u8; 4] = b"PACK";

/// Pack entry type code for OFS_DELTA.
const TYPE_OFS_DELTA: u8 = 6;
/// Pack entry type code for REF_DELTA.
const TYPE_REF_DELTA: u8 = 7;

/// A deferred REF_DELTA entry: inflated delta bytes plus the base id.
#[derive(Debug, Clone)]
pub struct RefDelta {
    /// Id of the base object the delta applies to.
    pub base: ObjectId,
    /// Inflated delta instruction stream.
    pub data: Vec<u8>,
}

/// The outcome of parsing a pack.
#[derive(Debug)]
pub struct ParsedPack {
    /// Ids of undeltified objects written to the store, in pack order.
    pub stored: Vec<ObjectId>,
    /// REF_DELTA entries deferred for resolution.
    pub deltas: Vec<RefDelta>,
    /// Object count declared in the pack header.
    pub object_count: u32,
}

/// Parses a pack file and stores its undeltified objects.
pub struct PackParser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackParser<'a> {
    /// Creates a parser over a complete in-memory pack.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Parses the pack, writing concrete objects to `store` and deferring
    /// REF_DELTA entries.
    ///
    /// The trailing checksum is verified before any entry is parsed, so a
    /// truncated or corrupted download never reaches the store.
    pub fn parse(&mut self, store: &ObjectStore) -> Result<ParsedPack> {
        let object_count = self.parse_header()?;
        self.verify_checksum()?;

        let mut stored = Vec::new();
        let mut deltas = Vec::new();

        for _ in 0..object_count {
            let (type_code, declared_size) = self.read_entry_header()?;

            match type_code {
                TYPE_OFS_DELTA => {
                    return Err(TransportError::UnsupportedDelta(
                        "OFS_DELTA entries are not supported".to_string(),
                    ));
                }
                TYPE_REF_DELTA => {
                    let base = self.read_base_id()?;
                    let data = self.inflate_entry(declared_size)?;
                    deltas.push(RefDelta { base, data });
                }
                _ => {
                    let kind = ObjectKind::from_pack_code(type_code)?;
                    let payload = self.inflate_entry(declared_size)?;
                    let object = GitObject::new(kind, payload);
                    store.put(&object)?;
                    stored.push(object.id);
                }
            }
        }

        tracing::debug!(
            objects = stored.len(),
            deltas = deltas.len(),
            "pack entries parsed"
        );

        Ok(ParsedPack {
            stored,
            deltas,
            object_count,
        })
    }

    /// Parses the 12-byte header, returning the object count.
    fn parse_header(&mut self) -> Result<u32> {
        if self.data.len() < 32 {
            return Err(TransportError::InvalidPack("pack too small".to_string()));
        }

        if &self.data[0..4] != PACK_SIGNATURE {
            return Err(TransportError::InvalidPack("bad signature".to_string()));
        }

        let version = u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]]);
        if version != 2 && version != 3 {
            return Err(TransportError::UnsupportedVersion(version));
        }

        let count =
            u32::from_be_bytes([self.data[8], self.data[9], self.data[10], self.data[11]]);
        self.pos = 12;
        Ok(count)
    }

    /// Verifies the trailing SHA-1 over everything before it.
    fn verify_checksum(&self) -> Result<()> {
        let trailer_start = self.data.len() - 20;
        let mut hasher = Sha1::new();
        hasher.update(&self.data[..trailer_start]);

        if hasher.finalize().as_slice() != &self.data[trailer_start..] {
            return Err(TransportError::BadChecksum);
        }
        Ok(())
    }

    fn next_byte(&mut self) -> Result<u8> {
        if self.pos >= self.data.len() - 20 {
            return Err(TransportError::InvalidPack(
                "unexpected end of pack".to_string(),
            ));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Reads an entry header: 3-bit type plus variable-length size.
    ///
    /// The first byte holds the type and the low 4 size bits; continuation
    /// bytes contribute 7 bits each at shifts 4, 11, 18, ...
    fn read_entry_header(&mut self) -> Result<(u8, usize)> {
        let first = self.next_byte()?;
        let type_code = (first >> 4) & 0x07;
        let mut size = (first & 0x0f) as usize;
        let mut shift = 4;

        let mut more = first & 0x80 != 0;
        while more {
            let byte = self.next_byte()?;
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
            more = byte & 0x80 != 0;
        }

        Ok((type_code, size))
    }

    /// Reads the 20 raw base-id bytes preceding a REF_DELTA's zlib stream.
    fn read_base_id(&mut self) -> Result<ObjectId> {
        let end = self.pos + 20;
        if end > self.data.len() - 20 {
            return Err(TransportError::InvalidPack(
                "truncated REF_DELTA base id".to_string(),
            ));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(ObjectId::from_bytes(bytes))
    }

    /// Inflates the zlib stream at the cursor and advances past it.
    fn inflate_entry(&mut self, declared_size: usize) -> Result<Vec<u8>> {
        let remaining = &self.data[self.pos..self.data.len() - 20];
        let mut decoder = ZlibDecoder::new(remaining);
        let mut inflated = Vec::with_capacity(declared_size);
        decoder
            .read_to_end(&mut inflated)
            .map_err(|e| TransportError::InvalidPack(format!("inflate failed: {e}")))?;

        if inflated.len() != declared_size {
            return Err(TransportError::InvalidPack(format!(
                "entry size mismatch: declared {declared_size}, inflated {}",
                inflated.len()
            )));
        }

        self.pos += decoder.total_in() as usize;
        Ok(inflated)
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::build_pack;
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn parses_undeltified_objects() {
        let (_dir, store) = store();
        let blob1 = GitObject::blob(b"Hello, World!".to_vec());
        let blob2 = GitObject::blob(b"Goodbye, World!".to_vec());

        let pack = build_pack(
            2,
            &[
                (3, Vec::new(), blob1.data.to_vec()),
                (3, Vec::new(), blob2.data.to_vec()),
            ],
        );

        let parsed = PackParser::new(&pack).parse(&store).unwrap();
        assert_eq!(parsed.object_count, 2);
        assert_eq!(parsed.stored, vec![blob1.id, blob2.id]);
        assert!(parsed.deltas.is_empty());

        assert_eq!(store.get(&blob1.id).unwrap().data.as_ref(), b"Hello, World!");
    }

    #[test]
    fn version_3_accepted() {
        let (_dir, store) = store();
        let blob = GitObject::blob(b"v3".to_vec());
        let pack = build_pack(3, &[(3, Vec::new(), blob.data.to_vec())]);

        assert!(PackParser::new(&pack).parse(&store).is_ok());
    }

    #[test]
    fn unknown_version_rejected() {
        let (_dir, store) = store();
        let pack = build_pack(4, &[]);

        let err = PackParser::new(&pack).parse(&store).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedVersion(4)));
    }

    #[test]
    fn checksum_verified_before_entries() {
        let (_dir, store) = store();
        let blob = GitObject::blob(b"data".to_vec());
        let mut pack = build_pack(2, &[(3, Vec::new(), blob.data.to_vec())]);
        let len = pack.len();
        pack[len - 1] ^= 0xff;

        let err = PackParser::new(&pack).parse(&store).unwrap_err();
        assert!(matches!(err, TransportError::BadChecksum));
        // Nothing may have been written.
        assert!(!store.contains(&blob.id));
    }

    #[test]
    fn large_size_varint() {
        let (_dir, store) = store();
        // > 4 KiB forces multi-byte size encoding in the entry header.
        let payload = vec![0x42u8; 5000];
        let blob = GitObject::blob(payload.clone());
        let pack = build_pack(2, &[(3, Vec::new(), payload)]);

        let parsed = PackParser::new(&pack).parse(&store).unwrap();
        assert_eq!(parsed.stored, vec![blob.id]);
        assert_eq!(store.get(&blob.id).unwrap().size(), 5000);
    }

    #[test]
    fn size_mismatch_rejected() {
        let (_dir, store) = store();
        // Header declares 3 bytes, stream inflates to 4.
        let mut pack = Vec::new();
        pack.extend_from_slice(b"PACK");
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&1u32.to_be_bytes());
        super::testutil::push_entry(&mut pack, 3, &[], b"abcd");
        pack[12] = (3 << 4) | 3; // rewrite the declared size
        let mut hasher = Sha1::new();
        hasher.update(&pack);
        let checksum = hasher.finalize();
        pack.extend_from_slice(&checksum);

        let err = PackParser::new(&pack).parse(&store).unwrap_err();
        assert!(matches!(err, TransportError::InvalidPack(_)));
    }

    #[test]
    fn ref_delta_deferred() {
        let (_dir, store) = store();
        let base = GitObject::blob(b"base payload".to_vec());
        let delta_bytes = vec![0x0c, 0x05, 0x05, b'h', b'e', b'l', b'l', b'o'];

        let mut prefix = Vec::new();
        prefix.extend_from_slice(base.id.as_bytes());
        let pack = build_pack(
            2,
            &[
                (3, Vec::new(), base.data.to_vec()),
                (7, prefix, delta_bytes.clone()),
            ],
        );

        let parsed = PackParser::new(&pack).parse(&store).unwrap();
        assert_eq!(parsed.stored, vec![base.id]);
        assert_eq!(parsed.deltas.len(), 1);
        assert_eq!(parsed.deltas[0].base, base.id);
        assert_eq!(parsed.deltas[0].data, delta_bytes);
    }

    #[test]
    fn ofs_delta_unsupported() {
        let (_dir, store) = store();
        // Offset byte 0x01 stands in for the varint back-offset.
        let pack = build_pack(2, &[(6, vec![0x01], b"xx".to_vec())]);

        let err = PackParser::new(&pack).parse(&store).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedDelta(_)));
    }

    #[test]
    fn truncated_pack_rejected() {
        let (_dir, store) = store();
        let err = PackParser::new(b"PACK").parse(&store).unwrap_err();
        assert!(matches!(err, TransportError::InvalidPack(_)));
    }
}
