//! The name → region table.
//!
//! [`RegionRegistry`] is the "phone book" of a Loam deployment: unrelated
//! subsystems share growable memory by agreeing on a region name and asking
//! the same registry for it. It uses `IndexMap` (not `HashMap`) for
//! deterministic, registration-order iteration, and never removes entries,
//! which is what makes the map index a stable handle.

use std::fmt;

use indexmap::IndexMap;
use loam_core::{OverlayError, Region};

use crate::config::RegistryConfig;

/// Stable handle to a region inside one [`RegionRegistry`].
///
/// Handles are plain indices into the registry's insertion-ordered table.
/// They are only meaningful for the registry that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub usize);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An explicit, passed-by-reference arena of named regions.
///
/// Owns every region created through it; views borrow the registry and
/// resolve their region by [`RegionId`] on every call, so a resize (which
/// may reallocate the region's backing storage) can never leave a view
/// holding stale memory.
#[derive(Debug, Default)]
pub struct RegionRegistry {
    regions: IndexMap<String, Region>,
    config: RegistryConfig,
}

impl RegionRegistry {
    /// Create an empty registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            regions: IndexMap::new(),
            config,
        }
    }

    /// Look up a region by name. No allocation.
    pub fn find(&self, name: &str) -> Option<RegionId> {
        self.regions.get_index_of(name).map(RegionId)
    }

    /// Create a fresh region under `name`.
    ///
    /// The actual capacity is `size_bytes` rounded up to the configured
    /// quantum. Fails with [`OverlayError::RegionExists`] if the name is
    /// already registered — callers who want find-or-create semantics use
    /// [`RegionRegistry::find_or_allocate`].
    pub fn allocate(&mut self, name: &str, size_bytes: usize) -> Result<RegionId, OverlayError> {
        if self.regions.contains_key(name) {
            return Err(OverlayError::RegionExists { name: name.into() });
        }
        let capacity = self.config.round_up(size_bytes);
        let (index, _) = self
            .regions
            .insert_full(name.to_string(), Region::new(name, capacity));
        Ok(RegionId(index))
    }

    /// Look up `name`, creating a region of `size_bytes` if absent.
    ///
    /// An existing region is returned as-is even if smaller than
    /// `size_bytes`; views apply their own minimum-capacity resize.
    pub fn find_or_allocate(
        &mut self,
        name: &str,
        size_bytes: usize,
    ) -> Result<RegionId, OverlayError> {
        match self.find(name) {
            Some(id) => Ok(id),
            None => self.allocate(name, size_bytes),
        }
    }

    /// Change a region's byte capacity, returning the actual new capacity.
    ///
    /// The actual capacity is the request rounded up to the configured
    /// quantum. Leading bytes are preserved; growth exposes zeroes.
    pub fn resize(&mut self, id: RegionId, new_size_bytes: usize) -> usize {
        let capacity = self.config.round_up(new_size_bytes);
        self.region_mut(id).set_size(capacity);
        capacity
    }

    /// Shared access to a region.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    pub fn region(&self, id: RegionId) -> &Region {
        self.regions
            .get_index(id.0)
            .map(|(_, region)| region)
            .unwrap_or_else(|| panic!("RegionId({}) is not from this registry", id.0))
    }

    /// Mutable access to a region.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        self.regions
            .get_index_mut(id.0)
            .map(|(_, region)| region)
            .unwrap_or_else(|| panic!("RegionId({}) is not from this registry", id.0))
    }

    /// Number of registered regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no regions have been registered.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Iterate over all regions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (RegionId, &Region)> {
        self.regions
            .values()
            .enumerate()
            .map(|(index, region)| (RegionId(index), region))
    }

    /// Total bytes held across all regions.
    pub fn memory_bytes(&self) -> usize {
        self.regions.values().map(|r| r.size()).sum()
    }
}
