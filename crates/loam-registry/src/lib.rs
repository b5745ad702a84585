//! Named region registry for the Loam buffer-overlay system.
//!
//! The [`RegionRegistry`] owns every [`loam_core::Region`] created through
//! it and hands out stable [`RegionId`] handles. It is an explicit object
//! passed by reference — there is no process-wide singleton — so tests are
//! hermetic and multiple independent registries can coexist.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;

pub use config::RegistryConfig;
pub use registry::{RegionId, RegionRegistry};
