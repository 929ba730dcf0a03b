//! REF_DELTA application and resolution.
//!
//! A delta stream is two variable-length sizes (base, target) followed by
//! COPY and INSERT instructions. Deltas may arrive in a pack before their
//! bases; the resolver is a worklist keyed by the missing base id, so each
//! newly stored object wakes exactly the deltas waiting on it.

use crate::pack::RefDelta;
use crate::{Result, TransportError};
use mygit_storage::{GitObject, ObjectId, ObjectStore};
use std::collections::HashMap;

/// Applies a delta to its base, producing the reconstructed object.
///
/// The result inherits the base's kind. Both the base length and the
/// reconstructed length are validated against the sizes declared in the
/// delta header.
pub fn apply_delta(base: &GitObject, delta: &[u8]) -> Result<GitObject> {
    let mut cursor = DeltaCursor::new(delta);

    let base_size = cursor.read_size()?;
    if base_size != base.data.len() {
        return Err(TransportError::BadDelta(format!(
            "base size mismatch: declared {base_size}, actual {}",
            base.data.len()
        )));
    }

    let target_size = cursor.read_size()?;
    let mut out = Vec::with_capacity(target_size);

    while !cursor.is_empty() {
        let op = cursor.next_byte()?;

        if op & 0x80 != 0 {
            // COPY: the low 7 bits gate which offset and size bytes follow,
            // each contributing one little-endian byte.
            let mut offset = 0usize;
            for bit in 0..4 {
                if op & (1 << bit) != 0 {
                    offset |= (cursor.next_byte()? as usize) << (bit * 8);
                }
            }
            let mut size = 0usize;
            for bit in 0..3 {
                if op & (1 << (bit + 4)) != 0 {
                    size |= (cursor.next_byte()? as usize) << (bit * 8);
                }
            }
            if size == 0 {
                size = 0x10000;
            }

            let end = offset
                .checked_add(size)
                .filter(|&end| end <= base.data.len())
                .ok_or_else(|| {
                    TransportError::BadDelta(format!(
                        "copy range {offset}+{size} outside base of {}",
                        base.data.len()
                    ))
                })?;
            out.extend_from_slice(&base.data[offset..end]);
        } else if op != 0 {
            // INSERT: the low 7 bits are a literal length.
            let len = (op & 0x7f) as usize;
            out.extend_from_slice(cursor.take(len)?);
        } else {
            return Err(TransportError::BadDelta("reserved opcode 0".to_string()));
        }
    }

    if out.len() != target_size {
        return Err(TransportError::BadDelta(format!(
            "target size mismatch: declared {target_size}, reconstructed {}",
            out.len()
        )));
    }

    Ok(GitObject::new(base.kind, out))
}

struct DeltaCursor<'a> {
    data: &'a [u8],
}

impl<'a> DeltaCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn next_byte(&mut self) -> Result<u8> {
        let (&byte, rest) = self
            .data
            .split_first()
            .ok_or_else(|| TransportError::BadDelta("unexpected end of delta".to_string()))?;
        self.data = rest;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.data.len() < len {
            return Err(TransportError::BadDelta(
                "truncated insert literal".to_string(),
            ));
        }
        let (taken, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(taken)
    }

    /// Reads a size as little-endian 7-bit groups with MSB continuation.
    fn read_size(&mut self) -> Result<usize> {
        let mut size = 0usize;
        let mut shift = 0;
        loop {
            let byte = self.next_byte()?;
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok(size);
            }
        }
    }
}

/// Resolves deferred deltas against the store until none can make progress.
pub struct DeltaResolver {
    pending: HashMap<ObjectId, Vec<RefDelta>>,
}

impl DeltaResolver {
    /// Queues deltas, grouped by the base id each one waits on.
    pub fn new(deltas: Vec<RefDelta>) -> Self {
        let mut pending: HashMap<ObjectId, Vec<RefDelta>> = HashMap::new();
        for delta in deltas {
            pending.entry(delta.base).or_default().push(delta);
        }
        Self { pending }
    }

    /// Applies every resolvable delta, returning the ids written.
    ///
    /// Bases already in the store seed the worklist; each reconstructed
    /// object is stored and then wakes the deltas queued under its id. The
    /// pack may list a delta before its base, including chains of deltas on
    /// deltas; anything still pending once the worklist drains has a base
    /// that is neither in the pack nor in the store.
    pub fn resolve(mut self, store: &ObjectStore) -> Result<Vec<ObjectId>> {
        let mut ready: Vec<ObjectId> = self
            .pending
            .keys()
            .filter(|base| store.contains(base))
            .copied()
            .collect();

        let mut written = Vec::new();
        while let Some(base_id) = ready.pop() {
            let Some(deltas) = self.pending.remove(&base_id) else {
                continue;
            };
            let base = store.get(&base_id)?;

            for delta in deltas {
                let object = apply_delta(&base, &delta.data)?;
                store.put(&object)?;
                tracing::trace!(base = %base_id, id = %object.id, "delta resolved");
                written.push(object.id);
                ready.push(object.id);
            }
        }

        if !self.pending.is_empty() {
            let stranded = self.pending.values().map(Vec::len).sum();
            return Err(TransportError::UnresolvableDeltas(stranded));
        }

        Ok(written)
    }
}
