#![forbid(unsafe_code)]

//! Composite and grid assembly on top of the stratum layer stack.
//!
//! [`CompositeLayer`] places child layers side by side in a layout grid,
//! concatenating their column and row spaces into one frame and routing
//! commands to the child that can represent them. [`GridLayer`] is the
//! standard 2x2 arrangement: corner, column header, row header, body.

pub mod composite;
pub mod grid;

pub use composite::CompositeLayer;
pub use grid::{GridLayer, GridRegion};
