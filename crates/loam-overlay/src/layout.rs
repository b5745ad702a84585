//! Byte-layout helpers shared by the views.
//!
//! Regions guarantee 8-byte-aligned storage, so any `Pod` element with
//! alignment ≤ 8 can be overlaid with an infallible `cast_slice`. Headers
//! (for streams and tables) are `Pod` structs at offset 0, with the element
//! sections that follow kept 8-byte aligned by explicit padding. Everything
//! here recomputes offsets from the region's current bytes — nothing is
//! cached across a resize.

use bytemuck::{Pod, Zeroable};
use loam_core::{OverlayError, Region};

/// Round a byte offset up to the next 8-byte boundary.
pub(crate) fn align_up(offset: usize) -> usize {
    offset.div_ceil(8) * 8
}

/// Reject element types the region storage cannot host.
pub(crate) fn check_element<T: Pod>() -> Result<(), OverlayError> {
    if std::mem::size_of::<T>() == 0 {
        return Err(OverlayError::Unimplemented {
            what: "zero-sized element types",
        });
    }
    let align = std::mem::align_of::<T>();
    if align > 8 {
        return Err(OverlayError::MisalignedElement {
            type_name: std::any::type_name::<T>(),
            align,
        });
    }
    Ok(())
}

/// The region's bytes as whole elements of `T` (any partial trailing
/// element is excluded).
pub(crate) fn elems<T: Pod>(region: &Region) -> &[T] {
    let bytes = region.bytes();
    let whole = bytes.len() / std::mem::size_of::<T>() * std::mem::size_of::<T>();
    bytemuck::cast_slice(&bytes[..whole])
}

/// Mutable variant of [`elems`].
pub(crate) fn elems_mut<T: Pod>(region: &mut Region) -> &mut [T] {
    let bytes = region.bytes_mut();
    let whole = bytes.len() / std::mem::size_of::<T>() * std::mem::size_of::<T>();
    bytemuck::cast_slice_mut(&mut bytes[..whole])
}

/// Metadata embedded at the front of a stream region.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub(crate) struct StreamHeader {
    /// Element capacity, fixed at initialisation.
    pub capacity: u64,
    /// Live element count, ≤ `capacity`.
    pub count: u64,
    /// Next write position.
    pub write_head: u64,
    /// Oldest live position.
    pub read_head: u64,
}

/// Byte size of [`StreamHeader`].
pub(crate) const STREAM_HEADER_BYTES: usize = std::mem::size_of::<StreamHeader>();

/// Split a stream region into its header and element section.
pub(crate) fn stream_parts<T: Pod>(region: &Region) -> (&StreamHeader, &[T]) {
    let bytes = region.bytes();
    let (header, rest) = bytes.split_at(STREAM_HEADER_BYTES);
    let header: &StreamHeader = bytemuck::from_bytes(header);
    let len = header.capacity as usize * std::mem::size_of::<T>();
    (header, bytemuck::cast_slice(&rest[..len]))
}

/// Mutable variant of [`stream_parts`].
pub(crate) fn stream_parts_mut<T: Pod>(region: &mut Region) -> (&mut StreamHeader, &mut [T]) {
    let bytes = region.bytes_mut();
    let (header, rest) = bytes.split_at_mut(STREAM_HEADER_BYTES);
    let header: &mut StreamHeader = bytemuck::from_bytes_mut(header);
    let len = header.capacity as usize * std::mem::size_of::<T>();
    (header, bytemuck::cast_slice_mut(&mut rest[..len]))
}

/// Metadata embedded at the front of a hash table region.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub(crate) struct TableHeader {
    /// Slot capacity, fixed until a rehash.
    pub capacity: u64,
    /// Live (non-tombstone) entry count.
    pub count: u64,
    /// Probe-window length before an insert demands growth.
    pub tolerance: u64,
}

/// Byte size of [`TableHeader`].
pub(crate) const TABLE_HEADER_BYTES: usize = std::mem::size_of::<TableHeader>();

/// Slot states for the table's parallel `states` array.
pub(crate) const SLOT_EMPTY: u8 = 0;
pub(crate) const SLOT_USED: u8 = 1;
pub(crate) const SLOT_TOMBSTONE: u8 = 2;

/// Section offsets for a table of `capacity` slots.
///
/// Layout: header, then `[K; capacity]`, then `[V; capacity]`, then
/// `[u8; capacity]` states, each section 8-byte aligned. Parallel arrays
/// rather than a cell struct keep every section independently `Pod` with
/// no padding concerns.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TableLayout {
    pub keys: usize,
    pub values: usize,
    pub states: usize,
    pub total: usize,
}

impl TableLayout {
    pub(crate) fn for_capacity<K: Pod, V: Pod>(capacity: usize) -> Self {
        let keys = TABLE_HEADER_BYTES;
        let values = align_up(keys + capacity * std::mem::size_of::<K>());
        let states = align_up(values + capacity * std::mem::size_of::<V>());
        let total = states + capacity;
        Self {
            keys,
            values,
            states,
            total,
        }
    }

    /// Largest capacity whose layout fits in `size_bytes`.
    pub(crate) fn max_capacity<K: Pod, V: Pod>(size_bytes: usize) -> usize {
        if size_bytes < TABLE_HEADER_BYTES {
            return 0;
        }
        // Each slot costs at least size_of::<K> + size_of::<V> + 1 bytes;
        // start from that bound and walk down past the alignment padding.
        let per_slot = std::mem::size_of::<K>() + std::mem::size_of::<V>() + 1;
        let mut capacity = (size_bytes - TABLE_HEADER_BYTES) / per_slot + 1;
        while capacity > 0 && Self::for_capacity::<K, V>(capacity).total > size_bytes {
            capacity -= 1;
        }
        capacity
    }
}

/// Split a table region into header, keys, values, and states.
pub(crate) fn table_parts<K: Pod, V: Pod>(region: &Region) -> (&TableHeader, &[K], &[V], &[u8]) {
    let bytes = region.bytes();
    let header: &TableHeader = bytemuck::from_bytes(&bytes[..TABLE_HEADER_BYTES]);
    let capacity = header.capacity as usize;
    let layout = TableLayout::for_capacity::<K, V>(capacity);
    let keys = bytemuck::cast_slice(&bytes[layout.keys..layout.keys + capacity * std::mem::size_of::<K>()]);
    let values = bytemuck::cast_slice(&bytes[layout.values..layout.values + capacity * std::mem::size_of::<V>()]);
    let states = &bytes[layout.states..layout.states + capacity];
    (header, keys, values, states)
}

/// Mutable variant of [`table_parts`]: disjoint mutable sections.
pub(crate) fn table_parts_mut<K: Pod, V: Pod>(
    region: &mut Region,
) -> (&mut TableHeader, &mut [K], &mut [V], &mut [u8]) {
    let bytes = region.bytes_mut();
    let (header_bytes, rest) = bytes.split_at_mut(TABLE_HEADER_BYTES);
    let header: &mut TableHeader = bytemuck::from_bytes_mut(header_bytes);
    let capacity = header.capacity as usize;
    let layout = TableLayout::for_capacity::<K, V>(capacity);

    let (key_section, rest) = rest.split_at_mut(layout.values - layout.keys);
    let (value_section, rest) = rest.split_at_mut(layout.states - layout.values);
    let keys = bytemuck::cast_slice_mut(&mut key_section[..capacity * std::mem::size_of::<K>()]);
    let values =
        bytemuck::cast_slice_mut(&mut value_section[..capacity * std::mem::size_of::<V>()]);
    let states = &mut rest[..capacity];
    (header, keys, values, states)
}

/// FNV-1a over the key's bytes. Deterministic within a build, which is all
/// the in-process layout contract requires.
pub(crate) fn hash_key<K: Pod>(key: &K) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &byte in bytemuck::bytes_of(key) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
