//! Linear growable sequence over a region.
//!
//! State lives entirely in the region: the first scratch word holds the
//! write index (= element count); capacity is derived from the region's
//! byte size on every call. Growth goes through the backing registry and
//! pads requests by 20% so a run of pushes does not resize every time.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use bytemuck::Pod;
use loam_core::{OverlayError, Region, RegionKind};
use loam_registry::{RegionId, RegionRegistry};

use crate::backing::Backing;
use crate::layout::{check_element, elems, elems_mut};

/// A non-owning growable array overlaid on a region.
///
/// Elements `[0, count)` are live; `[count, capacity)` is reserved but
/// unwritten. Pushing past capacity grows the region through the registry;
/// a detached view (constructed with [`ArrayView::over`]) fails with
/// [`OverlayError::ResizeUnavailable`] instead.
#[derive(Debug)]
pub struct ArrayView<'a, T: Pod> {
    backing: Backing<'a>,
    _elem: PhantomData<T>,
}

impl<'a, T: Pod> ArrayView<'a, T> {
    /// Bytes required for `capacity` elements.
    pub fn precompute_size(capacity: usize) -> usize {
        capacity * std::mem::size_of::<T>()
    }

    /// Stamp `region` as an array. Idempotent on an array-tagged region,
    /// fatal on any other tag.
    pub fn initialize_buffer(region: &mut Region) -> Result<(), OverlayError> {
        region.claim(RegionKind::Array)
    }

    /// Overlay a detached region. The view cannot grow.
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

    /// Overlay the named region, creating it (or growing it) to hold at
    /// least `min_capacity` elements.
    pub fn named(
        registry: &'a mut RegionRegistry,
        name: &str,
        min_capacity: usize,
    ) -> Result<Self, OverlayError> {
        let id = registry.find_or_allocate(name, Self::precompute_size(min_capacity))?;
        let mut view = Self::registered(registry, id)?;
        if view.capacity() < min_capacity {
            view.resize(min_capacity)?;
        }
        Ok(view)
    }

    /// Live element count.
    pub fn count(&self) -> usize {
        let region = self.backing.region();
        (region.slot1() as usize).min(region.size() / std::mem::size_of::<T>())
    }

    /// Elements the region can hold without growing.
    pub fn capacity(&self) -> usize {
        self.backing.region().size() / std::mem::size_of::<T>()
    }

    /// Whether no elements are live.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Append one element, growing first if the region is full.
    pub fn push(&mut self, value: T) -> Result<&mut T, OverlayError> {
        let count = self.count();
        if count + 1 > self.capacity() {
            self.grow(count + 1)?;
        }
        let region = self.backing.region_mut();
        region.set_slot1((count + 1) as u64);
        let slot = &mut elems_mut::<T>(region)[count];
        *slot = value;
        Ok(slot)
    }

    /// Reserve `n` contiguous slots and return them for the caller to fill.
    ///
    /// Slots hold whatever bytes the region already held there (zero if
    /// never written). Growth pads the request: the new capacity is
    /// `max(ceil(1.2 × needed), needed + 1)` elements, so even tiny arrays
    /// get strictly positive headroom.
    pub fn consume(&mut self, n: usize) -> Result<&mut [T], OverlayError> {
        let count = self.count();
        let needed = count + n;
        if needed > self.capacity() {
            self.grow(needed)?;
        }
        let region = self.backing.region_mut();
        region.set_slot1(needed as u64);
        Ok(&mut elems_mut::<T>(region)[count..needed])
    }

    fn grow(&mut self, needed: usize) -> Result<(), OverlayError> {
        let padded = (needed * 6).div_ceil(5);
        let target = padded.max(needed + 1);
        self.backing.resize(Self::precompute_size(target))?;
        Ok(())
    }

    /// Checked element access.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.count() {
            Some(&elems::<T>(self.backing.region())[index])
        } else {
            None
        }
    }

    /// Checked mutable element access.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.count() {
            Some(&mut elems_mut::<T>(self.backing.region_mut())[index])
        } else {
            None
        }
    }

    /// Checked element access with an error payload.
    pub fn at(&self, index: usize) -> Result<&T, OverlayError> {
        let len = self.count();
        self.get(index)
            .ok_or(OverlayError::OutOfBounds { index, len })
    }

    /// Remove the half-open range `[begin, end)`, shifting trailing
    /// elements left. `begin == end` is a no-op.
    pub fn erase(&mut self, begin: usize, end: usize) -> Result<(), OverlayError> {
        let count = self.count();
        if begin > end || end > count {
            return Err(OverlayError::OutOfBounds { index: end, len: count });
        }
        let region = self.backing.region_mut();
        elems_mut::<T>(region).copy_within(end..count, begin);
        region.set_slot1((count - (end - begin)) as u64);
        Ok(())
    }

    /// Remove the single element at `index`.
    pub fn erase_at(&mut self, index: usize) -> Result<(), OverlayError> {
        self.erase(index, index + 1)
    }

    /// Reset the write index to zero. Bytes remain until overwritten.
    pub fn clear(&mut self) {
        self.backing.region_mut().set_slot1(0);
    }

    /// Resize the backing region to hold `new_capacity` elements, returning
    /// the actual element capacity. Shrinking truncates the live count.
    pub fn resize(&mut self, new_capacity: usize) -> Result<usize, OverlayError> {
        let actual_bytes = self.backing.resize(Self::precompute_size(new_capacity))?;
        let actual = actual_bytes / std::mem::size_of::<T>();
        let region = self.backing.region_mut();
        if region.slot1() as usize > actual {
            region.set_slot1(actual as u64);
        }
        Ok(actual)
    }

    /// The live elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &elems::<T>(self.backing.region())[..self.count()]
    }

    /// The live elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let count = self.count();
        &mut elems_mut::<T>(self.backing.region_mut())[..count]
    }

    /// Iterate over the live elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.as_slice().iter()
    }
}

impl<T: Pod> Index<usize> for ArrayView<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("index {index} out of bounds for {} elements", self.count()),
        }
    }
}

impl<T: Pod> IndexMut<usize> for ArrayView<'_, T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let count = self.count();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("index {index} out of bounds for {count} elements"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(name: &str, capacity: usize) -> RegionRegistry {
        let mut registry = RegionRegistry::new();
        registry
            .allocate(name, ArrayView::<u64>::precompute_size(capacity))
            .unwrap();
        registry
    }

    #[test]
    fn push_within_capacity_never_resizes() {
        let mut registry = registry_with("a", 16);
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 16).unwrap();
        let before = arr.capacity();
        for i in 0..16 {
            arr.push(i).unwrap();
        }
        assert_eq!(arr.count(), 16);
        assert_eq!(arr.capacity(), before);
    }

    #[test]
    fn push_past_capacity_grows_and_preserves_values() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 5).unwrap();
        for i in 0..60u64 {
            arr.push(i).unwrap();
        }
        assert_eq!(arr.count(), 60);
        assert!(arr.capacity() > 60);
        for i in 0..60usize {
            assert_eq!(arr[i], i as u64);
        }
        assert_eq!(arr[59], 59);
    }

    #[test]
    fn consume_reserves_a_contiguous_run() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u32>::named(&mut registry, "a", 4).unwrap();
        arr.push(1).unwrap();
        let run = arr.consume(3).unwrap();
        assert_eq!(run.len(), 3);
        run.copy_from_slice(&[7, 8, 9]);
        assert_eq!(arr.count(), 4);
        assert_eq!(arr.as_slice(), &[1, 7, 8, 9]);
    }

    #[test]
    fn consume_growth_leaves_positive_headroom() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 1).unwrap();
        let capacity = arr.capacity();
        arr.consume(capacity + 1).unwrap();
        assert!(arr.capacity() > arr.count());
    }

    #[test]
    fn erase_compacts_without_gaps() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 8).unwrap();
        for i in 0..8u64 {
            arr.push(i).unwrap();
        }
        arr.erase(2, 5).unwrap();
        assert_eq!(arr.count(), 5);
        assert_eq!(arr.as_slice(), &[0, 1, 5, 6, 7]);
    }

    #[test]
    fn erase_at_removes_one_element() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 4).unwrap();
        for i in 0..4u64 {
            arr.push(i * 10).unwrap();
        }
        arr.erase_at(1).unwrap();
        assert_eq!(arr.as_slice(), &[0, 20, 30]);
    }

    #[test]
    fn erase_rejects_bad_ranges() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 4).unwrap();
        arr.push(1).unwrap();
        assert!(matches!(
            arr.erase(0, 2),
            Err(OverlayError::OutOfBounds { .. })
        ));
        assert!(matches!(
            arr.erase(1, 0),
            Err(OverlayError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn clear_resets_count_but_not_bytes() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 4).unwrap();
        arr.push(99).unwrap();
        arr.clear();
        assert_eq!(arr.count(), 0);
        // The old value is still in the region until overwritten.
        let id = registry.find("a").unwrap();
        assert_eq!(crate::layout::elems::<u64>(registry.region(id))[0], 99);
    }

    #[test]
    fn shrink_truncates_live_elements() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 8).unwrap();
        for i in 0..8u64 {
            arr.push(i).unwrap();
        }
        arr.resize(3).unwrap();
        assert_eq!(arr.count(), 3);
        assert_eq!(arr.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn detached_view_cannot_grow() {
        let mut region = Region::new("bare", ArrayView::<u64>::precompute_size(2));
        let mut arr = ArrayView::<u64>::over(&mut region).unwrap();
        arr.push(1).unwrap();
        arr.push(2).unwrap();
        let err = arr.push(3).unwrap_err();
        assert!(matches!(err, OverlayError::ResizeUnavailable { .. }));
    }

    #[test]
    fn at_reports_out_of_bounds() {
        let mut registry = RegionRegistry::new();
        let mut arr = ArrayView::<u64>::named(&mut registry, "a", 4).unwrap();
        arr.push(5).unwrap();
        assert_eq!(*arr.at(0).unwrap(), 5);
        assert!(matches!(
            arr.at(1),
            Err(OverlayError::OutOfBounds { index: 1, len: 1 })
        ));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_panics_past_count() {
        let mut registry = RegionRegistry::new();
        let arr = ArrayView::<u64>::named(&mut registry, "a", 4).unwrap();
        let _ = arr[0];
    }

    #[test]
    fn two_views_share_state_through_the_region() {
        let mut registry = RegionRegistry::new();
        {
            let mut arr = ArrayView::<u64>::named(&mut registry, "shared", 4).unwrap();
            arr.push(11).unwrap();
            arr.push(22).unwrap();
        }
        let arr = ArrayView::<u64>::named(&mut registry, "shared", 0).unwrap();
        assert_eq!(arr.as_slice(), &[11, 22]);
    }

    #[test]
    fn reinterpreting_as_array_fails_on_a_ring_region() {
        let mut registry = RegionRegistry::new();
        let id = registry.allocate("frames", 64).unwrap();
        registry.region_mut(id).claim(RegionKind::Ring).unwrap();
        let err = ArrayView::<u64>::named(&mut registry, "frames", 0).unwrap_err();
        assert!(matches!(err, OverlayError::KindMismatch { .. }));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Push(u64),
            EraseAt(usize),
            Clear,
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => any::<u64>().prop_map(Op::Push),
                2 => (0usize..64).prop_map(Op::EraseAt),
                1 => Just(Op::Clear),
            ]
        }

        proptest! {
            #[test]
            fn tracks_a_model_vec(ops in proptest::collection::vec(arb_op(), 1..80)) {
                let mut registry = RegionRegistry::new();
                let mut arr = ArrayView::<u64>::named(&mut registry, "m", 2).unwrap();
                let mut model: Vec<u64> = Vec::new();
                for op in ops {
                    match op {
                        Op::Push(v) => {
                            arr.push(v).unwrap();
                            model.push(v);
                        }
                        Op::EraseAt(i) => {
                            if i < model.len() {
                                arr.erase_at(i).unwrap();
                                model.remove(i);
                            }
                        }
                        Op::Clear => {
                            arr.clear();
                            model.clear();
                        }
                    }
                    prop_assert_eq!(arr.as_slice(), model.as_slice());
                }
            }
        }
    }
}
