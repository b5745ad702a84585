//! Loam: named memory regions with typed non-owning container views.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Loam sub-crates. For most users, adding `loam` as a single dependency
//! is sufficient.
//!
//! Storage lives in a [`registry::RegionRegistry`]: a table of named,
//! growable byte regions. Views ([`overlay::ArrayView`],
//! [`overlay::RingView`], [`overlay::StreamView`], [`overlay::TableView`])
//! interpret a region's bytes as a typed container without owning them, so
//! a view can be dropped and re-opened over the same region later with the
//! data intact.
//!
//! # Quick start
//!
//! ```rust
//! use loam::prelude::*;
//!
//! let mut registry = RegionRegistry::new();
//!
//! // An array of positions that grows as entries arrive.
//! let mut positions = ArrayView::<[f32; 2]>::named(&mut registry, "positions", 4)?;
//! positions.push([1.0, 2.0])?;
//! positions.push([3.0, 4.0])?;
//! assert_eq!(positions[1], [3.0, 4.0]);
//!
//! // Views are transient; the region and its contents persist.
//! drop(positions);
//! let positions = ArrayView::<[f32; 2]>::named(&mut registry, "positions", 4)?;
//! assert_eq!(positions.count(), 2);
//!
//! // A fixed-capacity ring over a different region: logical index 0 is the
//! // oldest element, -1 the newest.
//! let mut recent = RingView::<u64>::named(&mut registry, "recent", 2)?;
//! recent.push(1);
//! recent.push(2);
//! recent.push(3);
//! assert_eq!(recent[-1], 3);
//! assert_eq!(recent[0], 2);
//! # Ok::<(), loam::core::OverlayError>(())
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `loam-core` | `Region`, `RegionKind`, `OverlayError` |
//! | [`registry`] | `loam-registry` | `RegionRegistry`, `RegionId`, growth config |
//! | [`overlay`] | `loam-overlay` | The four typed views |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Region descriptors and the error taxonomy (`loam-core`).
///
/// A [`core::Region`] owns zero-filled bytes, a byte length, and the
/// [`core::RegionKind`] tag that pins which view family may interpret it.
pub use loam_core as core;

/// The named-region arena (`loam-registry`).
///
/// [`registry::RegionRegistry`] maps names to regions, hands out stable
/// [`registry::RegionId`] handles, and applies the growth policy from
/// [`registry::RegistryConfig`].
pub use loam_registry as registry;

/// Typed container views over regions (`loam-overlay`).
///
/// [`overlay::ArrayView`] (growable sequence), [`overlay::RingView`]
/// (fixed-capacity circular buffer with signed indexing),
/// [`overlay::StreamView`] (circular buffer with a used/unused split), and
/// [`overlay::TableView`] (open-addressed hash table).
pub use loam_overlay as overlay;

/// Common imports for typical Loam usage.
///
/// ```rust
/// use loam::prelude::*;
/// ```
pub mod prelude {
    pub use loam_core::{OverlayError, Region, RegionKind};

    pub use loam_registry::{RegionId, RegionRegistry, RegistryConfig};

    pub use loam_overlay::{ArrayView, RingView, StreamView, TableView};
}
