//! Circular buffer with a used/unused split, over a region.
//!
//! Unlike a ring, a stream knows how much of its capacity is populated: a
//! metadata header embedded at the front of the region tracks `capacity`,
//! `count`, `write_head`, and `read_head`. Indexing and iteration expose
//! exactly `count()` elements, oldest first; slots that were never pushed
//! are unreachable. When full, a push evicts the oldest element.
//!
//! The element capacity is fixed when the region is first initialised.
//! `resize` and multi-slot `consume` are deliberate stubs returning
//! [`OverlayError::Unimplemented`] — see DESIGN.md.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use bytemuck::Pod;
use loam_core::{OverlayError, Region, RegionKind};
use loam_registry::{RegionId, RegionRegistry};

use crate::backing::Backing;
use crate::layout::{check_element, stream_parts, stream_parts_mut, StreamHeader, STREAM_HEADER_BYTES};

/// A non-owning bounded FIFO overlaid on a region.
#[derive(Debug)]
pub struct StreamView<'a, T: Pod> {
    backing: Backing<'a>,
    _elem: PhantomData<T>,
}

impl<'a, T: Pod> StreamView<'a, T> {
    /// Bytes required for the header plus `capacity` elements.
    pub fn precompute_size(capacity: usize) -> usize {
        STREAM_HEADER_BYTES + capacity * std::mem::size_of::<T>()
    }

    /// Stamp `region` as a stream and write the header on first use.
    ///
    /// The capacity recorded in the header is however many whole elements
    /// fit after the header at initialisation time; it never changes
    /// afterwards, even if the region is resized externally. The region
    /// must hold the header plus at least one element.
    pub fn initialize_buffer(region: &mut Region) -> Result<(), OverlayError> {
        if region.size() < Self::precompute_size(1) {
            return Err(OverlayError::InsufficientMemory {
                region: region.name().to_string(),
                required: Self::precompute_size(1),
                actual: region.size(),
            });
        }
        region.claim(RegionKind::Stream)?;
        let capacity = (region.size() - STREAM_HEADER_BYTES) / std::mem::size_of::<T>();
        let (header, _) = stream_parts_mut::<T>(region);
        if header.capacity == 0 {
            *header = StreamHeader {
                capacity: capacity as u64,
                count: 0,
                write_head: 0,
                read_head: 0,
            };
        }
        Ok(())
    }

    /// Overlay a detached region.
    pub fn over(region: &'a mut Region) -> Result<Self, OverlayError> {
        check_element::<T>()?;
        Self::initialize_buffer(region)?;
        Ok(Self {
            backing: Backing::Detached(region),
            _elem: PhantomData,
        })
    }

    /// Overlay the region registered under `id`.
    pub fn registered(
        registry: &'a mut RegionRegistry,
        id: RegionId,
    ) -> Result<Self, OverlayError> {
        check_element::<T>()?;
        Self::initialize_buffer(registry.region_mut(id))?;
        Ok(Self {
            backing: Backing::Registered { registry, id },
            _elem: PhantomData,
        })
    }

    /// Overlay the named region, creating it with room for at least
    /// `min_capacity` elements (minimum 1).
    ///
    /// Unlike arrays, an existing stream that is smaller than requested
    /// cannot be grown — stream resize is unimplemented — so the minimum
    /// only shapes fresh allocations.
    pub fn named(
        registry: &'a mut RegionRegistry,
        name: &str,
        min_capacity: usize,
    ) -> Result<Self, OverlayError> {
        let id =
            registry.find_or_allocate(name, Self::precompute_size(min_capacity.max(1)))?;
        Self::registered(registry, id)
    }

    fn header(&self) -> StreamHeader {
        *stream_parts::<T>(self.backing.region()).0
    }

    /// Live element count, ≤ [`StreamView::capacity`].
    pub fn count(&self) -> usize {
        self.header().count as usize
    }

    /// Fixed element capacity recorded at initialisation.
    pub fn capacity(&self) -> usize {
        self.header().capacity as usize
    }

    /// Whether no elements are live.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the next push will evict the oldest element.
    pub fn is_full(&self) -> bool {
        let header = self.header();
        header.count == header.capacity
    }

    /// Append one element; when full, the oldest element is evicted.
    pub fn push(&mut self, value: T) -> &mut T {
        let (header, slice) = stream_parts_mut::<T>(self.backing.region_mut());
        let capacity = header.capacity as usize;
        let write = header.write_head as usize;
        slice[write] = value;
        header.write_head = ((write + 1) % capacity) as u64;
        if header.count as usize == capacity {
            header.read_head = ((header.read_head as usize + 1) % capacity) as u64;
        } else {
            header.count += 1;
        }
        &mut slice[write]
    }

    /// Reserve `n` slots for the caller to fill.
    ///
    /// Only `n == 1` is supported (the slot is zeroed and returned); any
    /// other count is a deliberate stub, like [`StreamView::resize`].
    pub fn consume(&mut self, n: usize) -> Result<&mut [T], OverlayError> {
        if n != 1 {
            return Err(OverlayError::Unimplemented {
                what: "stream consume of more than one slot",
            });
        }
        let slot = self.push(T::zeroed());
        Ok(std::slice::from_mut(slot))
    }

    /// Deliberate stub: a stream's capacity is fixed at initialisation.
    pub fn resize(&mut self, _new_capacity: usize) -> Result<(), OverlayError> {
        Err(OverlayError::Unimplemented {
            what: "stream resize",
        })
    }

    /// Checked element access; index 0 is the oldest live element.
    pub fn get(&self, index: usize) -> Option<&T> {
        let (header, slice) = stream_parts::<T>(self.backing.region());
        if index >= header.count as usize {
            return None;
        }
        let physical = (header.read_head as usize + index) % header.capacity as usize;
        Some(&slice[physical])
    }

    /// Checked mutable element access.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let (header, slice) = stream_parts_mut::<T>(self.backing.region_mut());
        if index >= header.count as usize {
            return None;
        }
        let physical = (header.read_head as usize + index) % header.capacity as usize;
        Some(&mut slice[physical])
    }

    /// Checked element access with an error payload.
    pub fn at(&self, index: usize) -> Result<&T, OverlayError> {
        let len = self.count();
        self.get(index)
            .ok_or(OverlayError::OutOfBounds { index, len })
    }

    /// Iterate over the live elements, oldest first. Yields exactly
    /// [`StreamView::count`] items, never `capacity()` unless full.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (header, slice) = stream_parts::<T>(self.backing.region());
        let capacity = header.capacity as usize;
        let read = header.read_head as usize;
        (0..header.count as usize).map(move |i| &slice[(read + i) % capacity])
    }

    /// Forget all elements. No bytes are touched; unreachable slots are
    /// never exposed.
    pub fn clear(&mut self) {
        let (header, _) = stream_parts_mut::<T>(self.backing.region_mut());
        header.count = 0;
        header.write_head = 0;
        header.read_head = 0;
    }
}

impl<T: Pod> Index<usize> for StreamView<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("index {index} out of bounds for {} elements", self.count()),
        }
    }
}

impl<T: Pod> IndexMut<usize> for StreamView<'_, T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let count = self.count();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("index {index} out of bounds for {count} elements"),
        }
    }
}
