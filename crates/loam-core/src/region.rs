//! The [`Region`] descriptor: a named, owned span of zero-initialised bytes.
//!
//! A region is the unit of storage that overlay views share. It owns its
//! bytes (there are no raw pointers anywhere in Loam — views re-derive byte
//! offsets from [`Region::bytes`] on every call, so a resize can never leave
//! a dangling reference), carries an authoritative byte length, a
//! [`RegionKind`] tag recording which view kind has claimed it, and two
//! opaque scratch words reserved for the claiming view's bookkeeping.

use std::fmt;

use crate::error::OverlayError;

/// Which view kind has claimed a region.
///
/// A region starts [`RegionKind::Raw`] and is stamped exactly once, at the
/// first [`Region::claim`]. Stamping again with the same kind is a no-op;
/// stamping with a different kind fails. This tag is the system's only
/// defence against two view types aliasing one region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Unclaimed: no view has initialised this region yet.
    Raw,
    /// Claimed by an array view.
    Array,
    /// Claimed by a ring view.
    Ring,
    /// Claimed by a stream view.
    Stream,
    /// Claimed by a hash table view.
    HashTable,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Raw => "raw",
            Self::Array => "array",
            Self::Ring => "ring",
            Self::Stream => "stream",
            Self::HashTable => "hash table",
        };
        write!(f, "{name}")
    }
}

/// Number of bytes in one backing word.
pub(crate) const WORD_BYTES: usize = std::mem::size_of::<u64>();

/// A named, contiguous span of zero-initialised memory plus two scratch words.
///
/// Storage is a `Vec<u64>` rather than `Vec<u8>` so that [`Region::bytes`]
/// is always 8-byte aligned, which makes `bytemuck::cast_slice` infallible
/// for every element type with alignment ≤ 8. The byte length is tracked
/// separately from the word count and is the authoritative capacity.
///
/// Regions are created by the registry (or directly for detached use) and
/// mutated in place by views. Bytes past the live length are kept zeroed so
/// that growth always exposes zero-filled memory.
#[derive(Clone, Debug)]
pub struct Region {
    name: String,
    words: Vec<u64>,
    len: usize,
    kind: RegionKind,
    slot1: u64,
    slot2: u64,
}

impl Region {
    /// Create a zero-filled, unclaimed region of `size_bytes` bytes.
    pub fn new(name: impl Into<String>, size_bytes: usize) -> Self {
        Self {
            name: name.into(),
            words: vec![0; size_bytes.div_ceil(WORD_BYTES)],
            len: size_bytes,
            kind: RegionKind::Raw,
            slot1: 0,
            slot2: 0,
        }
    }

    /// The region's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authoritative size in bytes.
    pub fn size(&self) -> usize {
        self.len
    }

    /// The view kind currently stamped on this region.
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Shared view of the region's bytes. Always 8-byte aligned.
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    /// Mutable view of the region's bytes. Always 8-byte aligned.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }

    /// First scratch word. Meaning is defined by the claiming view.
    pub fn slot1(&self) -> u64 {
        self.slot1
    }

    /// Overwrite the first scratch word.
    pub fn set_slot1(&mut self, value: u64) {
        self.slot1 = value;
    }

    /// Second scratch word. Meaning is defined by the claiming view.
    pub fn slot2(&self) -> u64 {
        self.slot2
    }

    /// Overwrite the second scratch word.
    pub fn set_slot2(&mut self, value: u64) {
        self.slot2 = value;
    }

    /// Stamp the region with a view kind.
    ///
    /// Succeeds (idempotently) when the region is unclaimed or already
    /// claimed as `kind`; fails with [`OverlayError::KindMismatch`] when a
    /// different view kind has claimed it.
    pub fn claim(&mut self, kind: RegionKind) -> Result<(), OverlayError> {
        if self.kind == RegionKind::Raw || self.kind == kind {
            self.kind = kind;
            Ok(())
        } else {
            Err(OverlayError::KindMismatch {
                region: self.name.clone(),
                current: self.kind,
                requested: kind,
            })
        }
    }

    /// Change the byte length, preserving leading bytes.
    ///
    /// Growth exposes zeroed bytes; shrinking truncates and re-zeroes the
    /// dropped tail so a later growth exposes zeroes again.
    pub fn set_size(&mut self, size_bytes: usize) {
        if size_bytes > self.len {
            self.words.resize(size_bytes.div_ceil(WORD_BYTES), 0);
            // A previous shrink may have left stale bytes in the last
            // retained word; the tail must read as zero after growth.
            let old_len = self.len;
            self.len = size_bytes;
            self.bytes_mut()[old_len..].fill(0);
        } else {
            self.len = size_bytes;
            self.words.truncate(size_bytes.div_ceil(WORD_BYTES));
            // Zero the dead bytes of a partially-occupied final word.
            let tail = self.words.len() * WORD_BYTES;
            if tail > size_bytes {
                let last = self.words.len() - 1;
                let keep = size_bytes % WORD_BYTES;
                let mut word = self.words[last].to_le_bytes();
                word[keep..].fill(0);
                self.words[last] = u64::from_le_bytes(word);
            }
        }
    }
}
