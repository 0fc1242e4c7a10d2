#![forbid(unsafe_code)]

//! Frame-tagged position coordinates.
//!
//! A position is only meaningful relative to the layer whose coordinate
//! frame it is expressed in. The coordinate types here pair a position with
//! a [`LayerId`] so command conversion can verify it is rewriting values in
//! the frame it thinks it is. The id is a frame tag, nothing more — it is
//! never used to reach the layer itself.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a layer, assigned at construction.
///
/// Two coordinates are in the same frame iff their `LayerId`s are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerId(u64);

impl LayerId {
    /// Allocate a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A column position within a specific layer's frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnPositionCoordinate {
    /// Frame the position is expressed in.
    pub layer: LayerId,
    pub position: usize,
}

impl ColumnPositionCoordinate {
    pub const fn new(layer: LayerId, position: usize) -> Self {
        Self { layer, position }
    }
}

/// A row position within a specific layer's frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowPositionCoordinate {
    /// Frame the position is expressed in.
    pub layer: LayerId,
    pub position: usize,
}

impl RowPositionCoordinate {
    pub const fn new(layer: LayerId, position: usize) -> Self {
        Self { layer, position }
    }
}

/// A cell (column, row) position pair within a specific layer's frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellCoordinate {
    /// Frame both positions are expressed in.
    pub layer: LayerId,
    pub column_position: usize,
    pub row_position: usize,
}

impl CellCoordinate {
    pub const fn new(layer: LayerId, column_position: usize, row_position: usize) -> Self {
        Self {
            layer,
            column_position,
            row_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CellCoordinate, ColumnPositionCoordinate, LayerId};

    #[test]
    fn ids_are_unique() {
        let a = LayerId::next();
        let b = LayerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn coordinate_equality_requires_same_frame() {
        let frame_a = LayerId::next();
        let frame_b = LayerId::next();
        assert_eq!(
            ColumnPositionCoordinate::new(frame_a, 3),
            ColumnPositionCoordinate::new(frame_a, 3)
        );
        assert_ne!(
            ColumnPositionCoordinate::new(frame_a, 3),
            ColumnPositionCoordinate::new(frame_b, 3)
        );
        assert_ne!(
            CellCoordinate::new(frame_a, 1, 2),
            CellCoordinate::new(frame_a, 2, 1)
        );
    }
}
