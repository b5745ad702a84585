//! The shared error taxonomy for regions, the registry, and overlay views.
//!
//! Every variant represents a caller contract violation, not a transient
//! condition: there is no retry machinery anywhere in Loam. Callers either
//! `?`-propagate these or treat them as bugs.

use std::error::Error;
use std::fmt;

use crate::region::RegionKind;

/// Errors reported by regions, the registry, and overlay views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayError {
    /// A region already claimed by one view kind was handed to another.
    ///
    /// This is the sole defence against aliasing bugs between view types
    /// sharing one region: re-initialising under the same kind is a no-op,
    /// re-initialising under a different kind is this error.
    KindMismatch {
        /// Name of the offending region.
        region: String,
        /// The kind currently stamped on the region.
        current: RegionKind,
        /// The kind the caller tried to claim.
        requested: RegionKind,
    },
    /// The region is too small for the view's header and/or minimum element.
    InsufficientMemory {
        /// Name of the offending region.
        region: String,
        /// Bytes the view requires.
        required: usize,
        /// Bytes the region actually holds.
        actual: usize,
    },
    /// A checked index was at or beyond the live element count.
    OutOfBounds {
        /// The index that was requested.
        index: usize,
        /// The number of addressable elements.
        len: usize,
    },
    /// A view over a detached region needed to change the region's byte
    /// size, but only registry-backed views can resize.
    ResizeUnavailable {
        /// Name of the region that would have been resized.
        region: String,
    },
    /// The operation is a deliberate stub (stream resize and multi-slot
    /// stream consume).
    Unimplemented {
        /// Which operation was requested.
        what: &'static str,
    },
    /// An insert exhausted the hash table's miss tolerance and no growth
    /// path was available.
    HashCollision {
        /// The probe-window length that was exhausted.
        tolerance: usize,
    },
    /// The element type's alignment exceeds the 8-byte guarantee of region
    /// storage, so a typed overlay cannot be constructed.
    MisalignedElement {
        /// Name of the rejected element type.
        type_name: &'static str,
        /// Its alignment in bytes.
        align: usize,
    },
    /// `allocate` was called with a name that is already registered.
    RegionExists {
        /// The duplicate name.
        name: String,
    },
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KindMismatch {
                region,
                current,
                requested,
            } => {
                write!(
                    f,
                    "region '{region}' is claimed as {current}, cannot reinterpret as {requested}"
                )
            }
            Self::InsufficientMemory {
                region,
                required,
                actual,
            } => {
                write!(
                    f,
                    "region '{region}' holds {actual} bytes, view requires at least {required}"
                )
            }
            Self::OutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for {len} elements")
            }
            Self::ResizeUnavailable { region } => {
                write!(f, "region '{region}' is detached; growth requires a registry backing")
            }
            Self::Unimplemented { what } => write!(f, "{what} is not implemented"),
            Self::HashCollision { tolerance } => {
                write!(f, "probe window of {tolerance} slots exhausted with no growth path")
            }
            Self::MisalignedElement { type_name, align } => {
                write!(
                    f,
                    "element type {type_name} has alignment {align}, regions guarantee only 8"
                )
            }
            Self::RegionExists { name } => {
                write!(f, "region '{name}' already exists")
            }
        }
    }
}

impl Error for OverlayError {}
