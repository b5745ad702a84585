//! Core types for the Loam buffer-overlay system.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! [`Region`] descriptor (a named, owned span of zero-initialised bytes plus
//! two scratch words), the [`RegionKind`] type tag that guards against
//! aliasing a region under two different view kinds, and the shared
//! [`OverlayError`] taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod region;

pub use error::OverlayError;
pub use region::{Region, RegionKind};
