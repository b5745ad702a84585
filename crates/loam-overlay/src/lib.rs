//! Typed container views over Loam regions.
//!
//! A view is a lightweight, non-owning handle that overlays container
//! semantics on a [`loam_core::Region`]. Four kinds exist:
//!
//! - [`ArrayView`]: linear growable sequence (push / consume / erase).
//! - [`RingView`]: fixed-count circular buffer that always holds exactly
//!   `capacity()` elements, with three explicit resize strategies.
//! - [`StreamView`]: circular buffer that tracks a used/unused split via a
//!   header embedded at the front of the region.
//! - [`TableView`]: open-addressed hash table with a bounded probe window.
//!
//! Views never own their region. A view is either *detached* (borrowing a
//! bare `&mut Region`, unable to grow) or *registered* (borrowing a
//! [`loam_registry::RegionRegistry`] plus a [`loam_registry::RegionId`],
//! routing growth through the registry). Either way the view re-derives
//! every byte offset from the region on each call, so a resize can never
//! leave it holding stale memory.
//!
//! Element types must be [`bytemuck::Pod`] with alignment ≤ 8 — region
//! storage guarantees 8-byte alignment, nothing more.
//!
//! All views assume the caller serialises access to a region; nothing here
//! locks, suspends, or retries.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
mod backing;
mod layout;
pub mod ring;
pub mod stream;
pub mod table;

pub use array::ArrayView;
pub use ring::RingView;
pub use stream::StreamView;
pub use table::{Cell, CellMut, TableView};
