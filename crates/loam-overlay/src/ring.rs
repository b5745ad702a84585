//! Fixed-count circular buffer over a region.
//!
//! A ring always holds exactly `capacity()` logical elements — slots that
//! were never written read as zero. The first scratch word holds the write
//! head; logical index 0 is the slot *at* the write head (the oldest live
//! element, about to be overwritten next) and index −1 is the most recently
//! pushed element. Indices wrap via Euclidean modulo, so any signed index
//! is valid.
//!
//! A capacity change on a wrapped structure must decide how to redistribute
//! the two physical runs (the oldest run `[head, capacity)` and the newest
//! run `[0, head)`), so resizing is never implicit: callers pick one of
//! three explicit algorithms.
//!
//! - [`RingView::resize_shift_left`] anchors content at the logical start:
//!   indices `[0, old)` keep their values on upsize, the newest elements
//!   fall off on downsize.
//! - [`RingView::resize_shift_right`] anchors content at the logical end:
//!   old content lands at `[new − old, new)` on upsize, the oldest elements
//!   fall off on downsize.
//! - [`RingView::resize_after_dropping`] discards all content and
//!   zero-fills, for callers who don't pay for preservation.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use bytemuck::Pod;
use loam_core::{OverlayError, Region, RegionKind};
use loam_registry::{RegionId, RegionRegistry};

use crate::backing::Backing;
use crate::layout::{check_element, elems, elems_mut};

/// A non-owning circular buffer overlaid on a region.
///
/// Never grows on its own: [`RingView::push`] always succeeds by
/// overwriting the oldest slot. The region must hold at least one element.
#[derive(Debug)]
pub struct RingView<'a, T: Pod> {
    backing: Backing<'a>,
    _elem: PhantomData<T>,
}

impl<'a, T: Pod> RingView<'a, T> {
    /// Bytes required for `capacity` elements.
    pub fn precompute_size(capacity: usize) -> usize {
        capacity * std::mem::size_of::<T>()
    }

    /// Stamp `region` as a ring and verify it holds at least one element.
    pub fn initialize_buffer(region: &mut Region) -> Result<(), OverlayError> {
        if region.size() < std::mem::size_of::<T>() {
            return Err(OverlayError::InsufficientMemory {
                region: region.name().to_string(),
                required: std::mem::size_of::<T>(),
                actual: region.size(),
            });
        }
        region.claim(RegionKind::Ring)
    }

    /// Overlay a detached region. Resizes that change the byte size fail.
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

    /// Overlay the named region, creating it (or growing it, shift-left)
    /// to hold at least `min_capacity` elements.
    pub fn named(
        registry: &'a mut RegionRegistry,
        name: &str,
        min_capacity: usize,
    ) -> Result<Self, OverlayError> {
        let id =
            registry.find_or_allocate(name, Self::precompute_size(min_capacity.max(1)))?;
        let mut view = Self::registered(registry, id)?;
        if view.capacity() < min_capacity {
            view.resize_shift_left(min_capacity)?;
        }
        Ok(view)
    }

    /// Logical element count. Always equal to [`RingView::capacity`]: a
    /// ring has no notion of partial fullness.
    pub fn count(&self) -> usize {
        self.capacity()
    }

    /// Elements the region holds.
    pub fn capacity(&self) -> usize {
        self.backing.region().size() / std::mem::size_of::<T>()
    }

    fn head(&self) -> usize {
        self.backing.region().slot1() as usize % self.capacity()
    }

    /// Overwrite the oldest slot and advance the write head.
    pub fn push(&mut self, value: T) -> &mut T {
        let capacity = self.capacity();
        let region = self.backing.region_mut();
        let head = region.slot1() as usize % capacity;
        region.set_slot1(((head + 1) % capacity) as u64);
        let slot = &mut elems_mut::<T>(region)[head];
        *slot = value;
        slot
    }

    fn resolve(&self, index: i64) -> usize {
        let capacity = self.capacity() as i64;
        (self.head() as i64 + index).rem_euclid(capacity) as usize
    }

    /// Element at signed logical `index`: 0 is the oldest slot, −1 the most
    /// recently pushed. Every signed index resolves to a valid slot.
    pub fn get(&self, index: i64) -> &T {
        &elems::<T>(self.backing.region())[self.resolve(index)]
    }

    /// Mutable variant of [`RingView::get`].
    pub fn get_mut(&mut self, index: i64) -> &mut T {
        let physical = self.resolve(index);
        &mut elems_mut::<T>(self.backing.region_mut())[physical]
    }

    /// Iterate over all `capacity()` elements, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let slice = elems::<T>(self.backing.region());
        let head = self.head();
        slice[head..].iter().chain(slice[..head].iter())
    }

    /// Resize keeping content anchored at the logical start.
    ///
    /// The live elements are rotated into logical order in the old buffer
    /// (all staged moves happen before the backing store changes), then the
    /// region is resized: an upsize exposes zeroed slots at logical indices
    /// `[old, new)`, a downsize drops the newest elements. The write head
    /// resets to 0.
    pub fn resize_shift_left(&mut self, new_capacity: usize) -> Result<(), OverlayError> {
        self.require_capacity(new_capacity)?;
        let old_capacity = self.capacity();
        {
            let region = self.backing.region_mut();
            let head = region.slot1() as usize % old_capacity;
            elems_mut::<T>(region)[..old_capacity].rotate_left(head);
            region.set_slot1(0);
        }
        if new_capacity != old_capacity {
            self.backing.resize(Self::precompute_size(new_capacity))?;
        }
        if new_capacity < old_capacity {
            self.zero_tail(new_capacity);
        }
        Ok(())
    }

    /// Resize keeping content anchored at the logical end.
    ///
    /// On upsize the backing store grows first (growth may relocate it, so
    /// the element slice is re-derived afterwards), then the old content is
    /// moved to logical `[new − old, new)` with zeroes in front. On
    /// downsize the oldest elements are dropped and the newest
    /// `new_capacity` survive. The write head resets to 0.
    pub fn resize_shift_right(&mut self, new_capacity: usize) -> Result<(), OverlayError> {
        self.require_capacity(new_capacity)?;
        let old_capacity = self.capacity();
        if new_capacity > old_capacity {
            self.backing.resize(Self::precompute_size(new_capacity))?;
            let region = self.backing.region_mut();
            let capacity = region.size() / std::mem::size_of::<T>();
            let head = region.slot1() as usize % old_capacity;
            let slice = elems_mut::<T>(region);
            slice[..old_capacity].rotate_left(head);
            slice[..capacity].rotate_right(capacity - old_capacity);
            region.set_slot1(0);
        } else {
            {
                let region = self.backing.region_mut();
                let head = region.slot1() as usize % old_capacity;
                let slice = elems_mut::<T>(region);
                slice[..old_capacity].rotate_left(head);
                slice.copy_within(old_capacity - new_capacity..old_capacity, 0);
                region.set_slot1(0);
            }
            if new_capacity != old_capacity {
                self.backing.resize(Self::precompute_size(new_capacity))?;
            }
            // Quantum rounding can grant more slots than requested; the
            // kept run belongs at the logical end, zeroes in front.
            let region = self.backing.region_mut();
            let capacity = region.size() / std::mem::size_of::<T>();
            let slice = elems_mut::<T>(region);
            slice[..capacity].rotate_right(capacity - new_capacity);
            for slot in slice[..capacity - new_capacity].iter_mut() {
                *slot = T::zeroed();
            }
        }
        Ok(())
    }

    /// Resize discarding all content: the region is zero-filled and both
    /// scratch words reset, at O(1) data-movement cost beyond the fill.
    pub fn resize_after_dropping(&mut self, new_capacity: usize) -> Result<(), OverlayError> {
        self.require_capacity(new_capacity)?;
        if Self::precompute_size(new_capacity) != self.backing.region().size() {
            self.backing.resize(Self::precompute_size(new_capacity))?;
        }
        let region = self.backing.region_mut();
        region.bytes_mut().fill(0);
        region.set_slot1(0);
        region.set_slot2(0);
        Ok(())
    }

    fn require_capacity(&self, new_capacity: usize) -> Result<(), OverlayError> {
        if new_capacity == 0 {
            return Err(OverlayError::InsufficientMemory {
                region: self.backing.region().name().to_string(),
                required: std::mem::size_of::<T>(),
                actual: 0,
            });
        }
        Ok(())
    }

    /// Registry rounding can leave slots past `kept`; they must read as
    /// zero, not as stale copies left behind by the compaction moves.
    fn zero_tail(&mut self, kept: usize) {
        let region = self.backing.region_mut();
        for slot in elems_mut::<T>(region)[kept..].iter_mut() {
            *slot = T::zeroed();
        }
    }
}

impl<T: Pod> Index<i64> for RingView<'_, T> {
    type Output = T;

    fn index(&self, index: i64) -> &T {
        self.get(index)
    }
}

impl<T: Pod> IndexMut<i64> for RingView<'_, T> {
    fn index_mut(&mut self, index: i64) -> &mut T {
        self.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of<'a>(
        registry: &'a mut RegionRegistry,
        name: &str,
        capacity: usize,
    ) -> RingView<'a, u64> {
        RingView::named(registry, name, capacity).unwrap()
    }

    #[test]
    fn fresh_ring_reads_zero_everywhere() {
        let mut registry = RegionRegistry::new();
        let ring = ring_of(&mut registry, "r", 8);
        assert_eq!(ring.count(), 8);
        for i in 0..8 {
            assert_eq!(ring[i as i64], 0);
        }
    }

    #[test]
    fn capacity_two_scenario() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 2);
        ring.push(1);
        ring.push(2);
        ring.push(3);
        assert_eq!(ring[-1], 3);
        assert_eq!(ring[-2], 2);
        assert_eq!(ring[0], 2);
        assert_eq!(ring[1], 3);
    }

    #[test]
    fn count_always_equals_capacity() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 4);
        for i in 0..11 {
            ring.push(i);
            assert_eq!(ring.count(), ring.capacity());
        }
    }

    #[test]
    fn window_holds_the_last_capacity_pushes_in_order() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 4);
        for i in 0..23u64 {
            ring.push(i);
        }
        let window: Vec<u64> = ring.iter().copied().collect();
        assert_eq!(window, vec![19, 20, 21, 22]);
        assert_eq!(ring[-1], 22);
        assert_eq!(ring[0], 19);
    }

    #[test]
    fn negative_indices_wrap_many_times() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 3);
        ring.push(10);
        ring.push(20);
        ring.push(30);
        assert_eq!(ring[-1], 30);
        assert_eq!(ring[-4], 30);
        assert_eq!(ring[5], 30);
        assert_eq!(ring[-7], 30);
    }

    #[test]
    fn shift_left_upsize_keeps_logical_indices_and_zeroes_the_tail() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 4);
        for i in 1..=6u64 {
            ring.push(i); // live window: 3, 4, 5, 6
        }
        ring.resize_shift_left(7).unwrap();
        assert_eq!(ring.capacity(), 7);
        let window: Vec<u64> = ring.iter().copied().collect();
        assert_eq!(window, vec![3, 4, 5, 6, 0, 0, 0]);
        assert_eq!(ring[-1], 0);
    }

    #[test]
    fn shift_left_downsize_keeps_the_oldest() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 5);
        for i in 1..=7u64 {
            ring.push(i); // live window: 3, 4, 5, 6, 7
        }
        ring.resize_shift_left(2).unwrap();
        assert_eq!(ring.capacity(), 2);
        let window: Vec<u64> = ring.iter().copied().collect();
        assert_eq!(window, vec![3, 4]);
    }

    #[test]
    fn shift_right_upsize_moves_content_to_the_logical_end() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 4);
        for i in 1..=6u64 {
            ring.push(i); // live window: 3, 4, 5, 6
        }
        ring.resize_shift_right(7).unwrap();
        assert_eq!(ring.capacity(), 7);
        let window: Vec<u64> = ring.iter().copied().collect();
        assert_eq!(window, vec![0, 0, 0, 3, 4, 5, 6]);
        assert_eq!(ring[-1], 6);
        assert_eq!(ring[0], 0);
    }

    #[test]
    fn shift_right_downsize_keeps_the_newest() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 5);
        for i in 1..=7u64 {
            ring.push(i); // live window: 3, 4, 5, 6, 7
        }
        ring.resize_shift_right(2).unwrap();
        assert_eq!(ring.capacity(), 2);
        let window: Vec<u64> = ring.iter().copied().collect();
        assert_eq!(window, vec![6, 7]);
        assert_eq!(ring[-1], 7);
    }

    #[test]
    fn shift_right_downsize_with_rounded_capacity_zeroes_the_front() {
        let mut registry = RegionRegistry::new();
        let mut ring = RingView::<u32>::named(&mut registry, "r", 4).unwrap();
        for i in 1..=4u32 {
            ring.push(i);
        }
        ring.resize_shift_right(3).unwrap();
        // 12 bytes rounds back up to 16, so the actual capacity stays 4;
        // the three kept elements still sit at the logical end.
        assert_eq!(ring.capacity(), 4);
        let window: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(window, vec![0, 2, 3, 4]);
        assert_eq!(ring[-1], 4);
        assert_eq!(ring[0], 0);
    }

    #[test]
    fn shift_left_downsize_with_rounded_capacity_zeroes_the_tail() {
        let mut registry = RegionRegistry::new();
        let mut ring = RingView::<u32>::named(&mut registry, "r", 4).unwrap();
        for i in 1..=4u32 {
            ring.push(i);
        }
        ring.resize_shift_left(3).unwrap();
        assert_eq!(ring.capacity(), 4);
        let window: Vec<u32> = ring.iter().copied().collect();
        assert_eq!(window, vec![1, 2, 3, 0]);
    }

    #[test]
    fn after_dropping_zeroes_everything() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 4);
        for i in 1..=9u64 {
            ring.push(i);
        }
        ring.resize_after_dropping(6).unwrap();
        assert_eq!(ring.capacity(), 6);
        assert!(ring.iter().all(|&v| v == 0));
        assert_eq!(ring[-1], 0);
    }

    #[test]
    fn resize_to_same_capacity_rotates_into_logical_order() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 4);
        for i in 1..=6u64 {
            ring.push(i);
        }
        ring.resize_shift_left(4).unwrap();
        let window: Vec<u64> = ring.iter().copied().collect();
        assert_eq!(window, vec![3, 4, 5, 6]);
        assert_eq!(ring[-1], 6);
    }

    #[test]
    fn zero_capacity_resize_is_rejected() {
        let mut registry = RegionRegistry::new();
        let mut ring = ring_of(&mut registry, "r", 4);
        assert!(matches!(
            ring.resize_shift_left(0),
            Err(OverlayError::InsufficientMemory { .. })
        ));
        assert!(matches!(
            ring.resize_shift_right(0),
            Err(OverlayError::InsufficientMemory { .. })
        ));
        assert!(matches!(
            ring.resize_after_dropping(0),
            Err(OverlayError::InsufficientMemory { .. })
        ));
    }

    #[test]
    fn undersized_region_is_rejected_at_construction() {
        let mut region = Region::new("tiny", 4);
        let err = RingView::<u64>::over(&mut region).unwrap_err();
        assert!(matches!(err, OverlayError::InsufficientMemory { .. }));
    }

    #[test]
    fn detached_ring_can_push_but_not_grow() {
        let mut region = Region::new("bare", RingView::<u64>::precompute_size(3));
        let mut ring = RingView::<u64>::over(&mut region).unwrap();
        ring.push(5);
        assert_eq!(ring[-1], 5);
        let err = ring.resize_shift_left(8).unwrap_err();
        assert!(matches!(err, OverlayError::ResizeUnavailable { .. }));
    }

    #[test]
    fn reinterpreting_as_ring_fails_on_a_stream_region() {
        let mut registry = RegionRegistry::new();
        let id = registry.allocate("s", 64).unwrap();
        registry.region_mut(id).claim(RegionKind::Stream).unwrap();
        let err = RingView::<u64>::registered(&mut registry, id).unwrap_err();
        assert!(matches!(err, OverlayError::KindMismatch { .. }));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use std::collections::VecDeque;

        use proptest::prelude::*;

        proptest! {
            #[test]
            fn window_matches_a_model_deque(
                capacity in 1usize..16,
                values in proptest::collection::vec(any::<u64>(), 1..64),
            ) {
                let mut registry = RegionRegistry::new();
                let mut ring = RingView::<u64>::named(&mut registry, "p", capacity).unwrap();
                let capacity = ring.capacity();
                let mut model: VecDeque<u64> = VecDeque::from(vec![0; capacity]);
                for v in values {
                    ring.push(v);
                    model.pop_front();
                    model.push_back(v);
                    let window: Vec<u64> = ring.iter().copied().collect();
                    let expect: Vec<u64> = model.iter().copied().collect();
                    prop_assert_eq!(&window, &expect);
                    prop_assert_eq!(ring[-1], *model.back().unwrap());
                    prop_assert_eq!(ring[0], *model.front().unwrap());
                }
            }

            #[test]
            fn shift_left_preserves_a_prefix(
                capacity in 1usize..12,
                new_capacity in 1usize..12,
                pushes in 0usize..40,
            ) {
                let mut registry = RegionRegistry::new();
                let mut ring = RingView::<u64>::named(&mut registry, "p", capacity).unwrap();
                let capacity = ring.capacity();
                for i in 0..pushes {
                    ring.push(i as u64 + 1);
                }
                let before: Vec<u64> = ring.iter().copied().collect();
                ring.resize_shift_left(new_capacity).unwrap();
                let after: Vec<u64> = ring.iter().copied().collect();
                let kept = capacity.min(new_capacity);
                prop_assert_eq!(&after[..kept], &before[..kept]);
                prop_assert!(after[kept..].iter().all(|&v| v == 0));
            }

            #[test]
            fn shift_right_preserves_a_suffix(
                capacity in 1usize..12,
                new_capacity in 1usize..12,
                pushes in 0usize..40,
            ) {
                let mut registry = RegionRegistry::new();
                let mut ring = RingView::<u64>::named(&mut registry, "p", capacity).unwrap();
                let capacity = ring.capacity();
                for i in 0..pushes {
                    ring.push(i as u64 + 1);
                }
                let before: Vec<u64> = ring.iter().copied().collect();
                ring.resize_shift_right(new_capacity).unwrap();
                let after: Vec<u64> = ring.iter().copied().collect();
                let new_capacity = ring.capacity();
                let kept = capacity.min(new_capacity);
                prop_assert_eq!(&after[new_capacity - kept..], &before[capacity - kept..]);
                prop_assert!(after[..new_capacity - kept].iter().all(|&v| v == 0));
            }

            // Sub-word elements make the registry's quantum rounding grant
            // more slots than requested, so the kept run and the zero run
            // must be placed against the actual capacity.
            #[test]
            fn shift_right_handles_sub_word_elements(
                capacity in 1usize..12,
                requested in 1usize..12,
                pushes in 0usize..40,
            ) {
                let mut registry = RegionRegistry::new();
                let mut ring = RingView::<u32>::named(&mut registry, "p", capacity).unwrap();
                let capacity = ring.capacity();
                for i in 0..pushes {
                    ring.push(i as u32 + 1);
                }
                let before: Vec<u32> = ring.iter().copied().collect();
                ring.resize_shift_right(requested).unwrap();
                let after: Vec<u32> = ring.iter().copied().collect();
                let actual = ring.capacity();
                let kept = capacity.min(requested);
                prop_assert_eq!(&after[actual - kept..], &before[capacity - kept..]);
                prop_assert!(after[..actual - kept].iter().all(|&v| v == 0));
            }
        }
    }
}
