//! Region resolution for views: detached vs. registry-backed.

use loam_core::{OverlayError, Region};
use loam_registry::{RegionId, RegionRegistry};

/// Where a view's region lives and how (whether) it can be resized.
///
/// Views resolve the region through this enum on every call rather than
/// caching any reference or offset, which is what makes relocation by the
/// registry safe.
#[derive(Debug)]
pub(crate) enum Backing<'a> {
    /// A bare region with no resize path. Growth fails.
    Detached(&'a mut Region),
    /// A region owned by a registry; growth delegates to
    /// [`RegionRegistry::resize`].
    Registered {
        registry: &'a mut RegionRegistry,
        id: RegionId,
    },
}

impl Backing<'_> {
    pub(crate) fn region(&self) -> &Region {
        match self {
            Self::Detached(region) => region,
            Self::Registered { registry, id } => registry.region(*id),
        }
    }

    pub(crate) fn region_mut(&mut self) -> &mut Region {
        match self {
            Self::Detached(region) => region,
            Self::Registered { registry, id } => registry.region_mut(*id),
        }
    }

    /// Change the region's byte capacity, returning the actual capacity.
    ///
    /// Fails with [`OverlayError::ResizeUnavailable`] on a detached backing:
    /// only the registry knows how to grow storage.
    pub(crate) fn resize(&mut self, new_size_bytes: usize) -> Result<usize, OverlayError> {
        match self {
            Self::Detached(region) => Err(OverlayError::ResizeUnavailable {
                region: region.name().to_string(),
            }),
            Self::Registered { registry, id } => Ok(registry.resize(*id, new_size_bytes)),
        }
    }
}
