//! Open-addressed hash table over a region.
//!
//! Layout: a header (`capacity`, `count`, `tolerance`) followed by three
//! parallel arrays — keys, values, and one state byte per slot (empty /
//! used / tombstone). Probing is linear and bounded by the **miss
//! tolerance**: an insert that cannot place the key within `tolerance`
//! probes grows the table and rehashes instead of scanning further.
//! Erasure leaves a tombstone so probe chains passing through the slot
//! stay intact; lookups terminate at the first empty slot.
//!
//! Keys hash via FNV-1a over their bytes — deterministic within a build,
//! which is all the in-process layout contract requires.

use std::marker::PhantomData;

use bytemuck::Pod;
use loam_core::{OverlayError, Region, RegionKind};
use loam_registry::{RegionId, RegionRegistry};

use crate::backing::Backing;
use crate::layout::{
    check_element, hash_key, table_parts, table_parts_mut, TableHeader, TableLayout,
    SLOT_EMPTY, SLOT_TOMBSTONE, SLOT_USED,
};

/// One slot of the backing array, borrowed. Yielded by
/// [`TableView::cells`], including slots that hold no live entry.
#[derive(Debug)]
pub struct Cell<'t, K, V> {
    /// The slot's key bytes. Meaningless unless `used`.
    pub key: &'t K,
    /// The slot's value bytes. Meaningless unless `used`.
    pub value: &'t V,
    /// Whether the slot holds a live entry.
    pub used: bool,
}

/// One slot of the backing array with a mutable value, yielded by
/// [`TableView::cells_mut`]. Edits through `value` land in the region, so
/// they are visible to later lookups when the slot is live.
#[derive(Debug)]
pub struct CellMut<'t, K, V> {
    /// The slot's key bytes. Meaningless unless `used`.
    pub key: &'t K,
    /// The slot's value bytes. Meaningless unless `used`.
    pub value: &'t mut V,
    /// Whether the slot holds a live entry.
    pub used: bool,
}

/// Where a probe for an insert landed.
enum Probe {
    /// The key is already present at this slot.
    Found(usize),
    /// The key is absent; insert at this slot (first tombstone in the
    /// window, or the terminating empty slot).
    Vacant(usize),
    /// The window held neither the key nor an insertable slot.
    Exhausted,
}

/// A non-owning hash table overlaid on a region.
///
/// Keys and values are `Pod`; keys additionally compare with `PartialEq`.
#[derive(Debug)]
pub struct TableView<'a, K: Pod + PartialEq, V: Pod> {
    backing: Backing<'a>,
    _entry: PhantomData<(K, V)>,
}

impl<'a, K: Pod + PartialEq, V: Pod> TableView<'a, K, V> {
    /// Default probe-window length for freshly initialised tables.
    pub const DEFAULT_TOLERANCE: usize = 16;

    /// Bytes required for `capacity` slots.
    pub fn precompute_size(capacity: usize) -> usize {
        TableLayout::for_capacity::<K, V>(capacity).total
    }

    /// Stamp `region` as a hash table and write the header on first use,
    /// with the default miss tolerance.
    pub fn initialize_buffer(region: &mut Region) -> Result<(), OverlayError> {
        Self::initialize_buffer_with_tolerance(region, Self::DEFAULT_TOLERANCE)
    }

    /// [`TableView::initialize_buffer`] with an explicit miss tolerance.
    ///
    /// The capacity recorded in the header is the largest slot count whose
    /// layout fits the region at initialisation time. The region must fit
    /// at least one slot.
    pub fn initialize_buffer_with_tolerance(
        region: &mut Region,
        tolerance: usize,
    ) -> Result<(), OverlayError> {
        let capacity = TableLayout::max_capacity::<K, V>(region.size());
        if capacity == 0 {
            return Err(OverlayError::InsufficientMemory {
                region: region.name().to_string(),
                required: Self::precompute_size(1),
                actual: region.size(),
            });
        }
        region.claim(RegionKind::HashTable)?;
        let (header, _, _, _) = table_parts_mut::<K, V>(region);
        if header.capacity == 0 {
            // Fresh region: parts were sized for capacity 0, rewrite the
            // header and re-derive the sections on next access.
            *header = TableHeader {
                capacity: capacity as u64,
                count: 0,
                tolerance: tolerance as u64,
            };
        }
        Ok(())
    }

    /// Overlay a detached region. Inserts that need growth fail.
    pub fn over(region: &'a mut Region) -> Result<Self, OverlayError> {
        check_element::<K>()?;
        check_element::<V>()?;
        Self::initialize_buffer(region)?;
        Ok(Self {
            backing: Backing::Detached(region),
            _entry: PhantomData,
        })
    }

    /// Overlay the region registered under `id`.
    pub fn registered(
        registry: &'a mut RegionRegistry,
        id: RegionId,
    ) -> Result<Self, OverlayError> {
        check_element::<K>()?;
        check_element::<V>()?;
        Self::initialize_buffer(registry.region_mut(id))?;
        Ok(Self {
            backing: Backing::Registered { registry, id },
            _entry: PhantomData,
        })
    }

    /// Overlay the named region, creating it (or growing it, with a
    /// rehash) to hold at least `min_capacity` slots.
    pub fn named(
        registry: &'a mut RegionRegistry,
        name: &str,
        min_capacity: usize,
    ) -> Result<Self, OverlayError> {
        let id =
            registry.find_or_allocate(name, Self::precompute_size(min_capacity.max(1)))?;
        let mut view = Self::registered(registry, id)?;
        if view.capacity() < min_capacity {
            view.grow_and_rehash(min_capacity)?;
        }
        Ok(view)
    }

    fn header(&self) -> TableHeader {
        *table_parts::<K, V>(self.backing.region()).0
    }

    /// Live entry count.
    pub fn count(&self) -> usize {
        self.header().count as usize
    }

    /// Slot capacity.
    pub fn capacity(&self) -> usize {
        self.header().capacity as usize
    }

    /// Probe-window length before an insert demands growth.
    pub fn tolerance(&self) -> usize {
        self.header().tolerance as usize
    }

    /// Whether no entries are live.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn probe_for_insert(&self, key: &K) -> Probe {
        let (header, keys, _, states) = table_parts::<K, V>(self.backing.region());
        let capacity = header.capacity as usize;
        let window = (header.tolerance as usize).min(capacity);
        let start = hash_key(key) as usize % capacity;
        let mut vacant = None;
        for step in 0..window {
            let slot = (start + step) % capacity;
            match states[slot] {
                SLOT_EMPTY => return Probe::Vacant(vacant.unwrap_or(slot)),
                SLOT_USED if keys[slot] == *key => return Probe::Found(slot),
                SLOT_TOMBSTONE if vacant.is_none() => vacant = Some(slot),
                _ => {}
            }
        }
        match vacant {
            Some(slot) => Probe::Vacant(slot),
            None => Probe::Exhausted,
        }
    }

    fn probe_for_lookup(&self, key: &K) -> Option<usize> {
        let (header, keys, _, states) = table_parts::<K, V>(self.backing.region());
        let capacity = header.capacity as usize;
        let window = (header.tolerance as usize).min(capacity);
        let start = hash_key(key) as usize % capacity;
        for step in 0..window {
            let slot = (start + step) % capacity;
            match states[slot] {
                SLOT_EMPTY => return None,
                SLOT_USED if keys[slot] == *key => return Some(slot),
                _ => {}
            }
        }
        None
    }

    /// Insert or overwrite `key`'s value.
    ///
    /// When the probe window is exhausted the table grows and rehashes; a
    /// detached table that cannot grow fails with
    /// [`OverlayError::HashCollision`].
    pub fn set(&mut self, key: K, value: V) -> Result<(), OverlayError> {
        match self.probe_for_insert(&key) {
            Probe::Found(slot) => {
                let (_, _, values, _) = table_parts_mut::<K, V>(self.backing.region_mut());
                values[slot] = value;
                Ok(())
            }
            Probe::Vacant(slot) => {
                let (header, keys, values, states) =
                    table_parts_mut::<K, V>(self.backing.region_mut());
                keys[slot] = key;
                values[slot] = value;
                states[slot] = SLOT_USED;
                header.count += 1;
                Ok(())
            }
            Probe::Exhausted => {
                let tolerance = self.tolerance();
                let grown = self.grow_and_rehash(self.capacity() * 2);
                if grown.is_err() {
                    return Err(OverlayError::HashCollision { tolerance });
                }
                // The fresh table was sized so every live key fits, and it
                // has free slots, so this insert cannot exhaust it again.
                self.set(key, value)
            }
        }
    }

    /// Look up `key`'s value.
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = self.probe_for_lookup(key)?;
        let (_, _, values, _) = table_parts::<K, V>(self.backing.region());
        Some(&values[slot])
    }

    /// Look up `key`'s value for mutation in place.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.probe_for_lookup(key)?;
        let (_, _, values, _) = table_parts_mut::<K, V>(self.backing.region_mut());
        Some(&mut values[slot])
    }

    /// Remove `key`, returning its value.
    ///
    /// The slot becomes a tombstone rather than empty so probe chains for
    /// other keys that pass through it keep working.
    pub fn erase(&mut self, key: &K) -> Option<V> {
        let slot = self.probe_for_lookup(key)?;
        let (header, _, values, states) = table_parts_mut::<K, V>(self.backing.region_mut());
        states[slot] = SLOT_TOMBSTONE;
        header.count -= 1;
        Some(values[slot])
    }

    /// Grow to double the current capacity and rehash every live entry.
    pub fn resize(&mut self) -> Result<(), OverlayError> {
        self.grow_and_rehash(self.capacity() * 2)
    }

    /// Grow to at least `min_capacity` slots and rehash every live entry.
    ///
    /// Slot positions depend on capacity, so this is a true rehash: live
    /// pairs are staged out, re-placed into a scratch image of the new
    /// table (doubling again if any pair exceeds the tolerance there),
    /// and written back over the resized region. Tombstones do not
    /// survive a rehash.
    pub fn grow_and_rehash(&mut self, min_capacity: usize) -> Result<(), OverlayError> {
        let (pairs, tolerance) = {
            let (header, keys, values, states) = table_parts::<K, V>(self.backing.region());
            let live: Vec<(K, V)> = (0..header.capacity as usize)
                .filter(|&slot| states[slot] == SLOT_USED)
                .map(|slot| (keys[slot], values[slot]))
                .collect();
            (live, header.tolerance as usize)
        };

        let mut capacity = min_capacity.max(self.capacity()).max(1);
        let staged = loop {
            match Self::stage(&pairs, capacity, tolerance) {
                Some(staged) => break staged,
                None => capacity *= 2,
            }
        };

        self.backing.resize(Self::precompute_size(capacity))?;
        let region = self.backing.region_mut();
        region.bytes_mut().fill(0);
        {
            let bytes = region.bytes_mut();
            let header: &mut TableHeader =
                bytemuck::from_bytes_mut(&mut bytes[..std::mem::size_of::<TableHeader>()]);
            *header = TableHeader {
                capacity: capacity as u64,
                count: pairs.len() as u64,
                tolerance: tolerance as u64,
            };
        }
        let (_, keys, values, states) = table_parts_mut::<K, V>(region);
        keys.copy_from_slice(&staged.keys);
        values.copy_from_slice(&staged.values);
        states.copy_from_slice(&staged.states);
        Ok(())
    }

    /// Place every pair into a scratch image of a `capacity`-slot table,
    /// or `None` if any pair exceeds the tolerance window there.
    fn stage(pairs: &[(K, V)], capacity: usize, tolerance: usize) -> Option<Staged<K, V>> {
        let mut staged = Staged {
            keys: vec![K::zeroed(); capacity],
            values: vec![V::zeroed(); capacity],
            states: vec![SLOT_EMPTY; capacity],
        };
        let window = tolerance.min(capacity);
        'pairs: for (key, value) in pairs {
            let start = hash_key(key) as usize % capacity;
            for step in 0..window {
                let slot = (start + step) % capacity;
                if staged.states[slot] == SLOT_EMPTY {
                    staged.keys[slot] = *key;
                    staged.values[slot] = *value;
                    staged.states[slot] = SLOT_USED;
                    continue 'pairs;
                }
            }
            return None;
        }
        Some(staged)
    }

    /// Iterate over live keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        let (_, keys, _, states) = table_parts::<K, V>(self.backing.region());
        keys.iter()
            .zip(states.iter())
            .filter(|(_, &state)| state == SLOT_USED)
            .map(|(key, _)| key)
    }

    /// Iterate over live values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        let (_, _, values, states) = table_parts::<K, V>(self.backing.region());
        values
            .iter()
            .zip(states.iter())
            .filter(|(_, &state)| state == SLOT_USED)
            .map(|(value, _)| value)
    }

    /// Iterate over live values mutably; edits are visible to later
    /// [`TableView::get`] calls (these are references into the region).
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        let (_, _, values, states) = table_parts_mut::<K, V>(self.backing.region_mut());
        values
            .iter_mut()
            .zip(states.iter())
            .filter(|(_, &state)| state == SLOT_USED)
            .map(|(value, _)| value)
    }

    /// Iterate over live `(key, value)` pairs.
    pub fn items(&self) -> impl Iterator<Item = (&K, &V)> {
        let (_, keys, values, states) = table_parts::<K, V>(self.backing.region());
        keys.iter()
            .zip(values.iter())
            .zip(states.iter())
            .filter(|(_, &state)| state == SLOT_USED)
            .map(|((key, value), _)| (key, value))
    }

    /// Iterate over live pairs with mutable values.
    pub fn items_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        let (_, keys, values, states) = table_parts_mut::<K, V>(self.backing.region_mut());
        keys.iter()
            .zip(values.iter_mut())
            .zip(states.iter())
            .filter(|(_, &state)| state == SLOT_USED)
            .map(|((key, value), _)| (key, value))
    }

    /// Iterate over every slot of the backing array, used or not.
    pub fn cells(&self) -> impl Iterator<Item = Cell<'_, K, V>> {
        let (_, keys, values, states) = table_parts::<K, V>(self.backing.region());
        keys.iter()
            .zip(values.iter())
            .zip(states.iter())
            .map(|((key, value), &state)| Cell {
                key,
                value,
                used: state == SLOT_USED,
            })
    }

    /// Mutable variant of [`TableView::cells`]: every slot, with the value
    /// borrowed mutably.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = CellMut<'_, K, V>> {
        let (_, keys, values, states) = table_parts_mut::<K, V>(self.backing.region_mut());
        keys.iter()
            .zip(values.iter_mut())
            .zip(states.iter())
            .map(|((key, value), &state)| CellMut {
                key,
                value,
                used: state == SLOT_USED,
            })
    }
}

/// Scratch image of a rehashed table, staged before the region resize.
struct Staged<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    states: Vec<u8>,
}
