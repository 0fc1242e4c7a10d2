#![forbid(unsafe_code)]

//! Commands and top-down frame conversion.
//!
//! A command is a value object carrying coordinates in the frame of the
//! layer it was issued against. As it descends the stack, each layer calls
//! [`LayerCommand::convert_to_target_layer`] to rewrite those coordinates
//! into the next layer's frame before forwarding. Conversion failure is a
//! normal outcome (the coordinate is hidden, scrolled out, or foreign to
//! the stack): the command is dropped unexecuted, `do_command` returns
//! `false`, and no state changes — never partially applied.
//!
//! Context-free commands carry no positional meaning and convert
//! successfully through every boundary.
//!
//! The conversion utilities here walk `underlying_layer_by_position` links
//! from the source frame to the target frame one boundary at a time, which
//! also covers composite layers where the path depends on the position.

use std::any::Any;

use crate::coordinate::{ColumnPositionCoordinate, RowPositionCoordinate};
use crate::layer::Layer;

/// A routable, convertible command.
pub trait LayerCommand: 'static {
    /// Rewrite the command's coordinates from `source`'s frame into
    /// `target`'s frame. `source` must be the layer currently dispatching
    /// the command; `target` is the layer it is about to be forwarded to.
    ///
    /// Returns `false` if any coordinate cannot be represented in the
    /// target frame; the command must then be dropped unexecuted.
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool;

    /// Deep-enough copy so that forwarding the same logical command to
    /// sibling layers cannot corrupt shared state.
    fn clone_command(&self) -> Box<dyn LayerCommand>;

    fn as_any(&self) -> &dyn Any;
}

/// Convert a column position from `source`'s frame to `target`'s frame.
///
/// Walks down the underlying-layer chain starting at `source`, rewriting
/// the position at each boundary, until `target` is reached. Returns `None`
/// when the position is unmappable at some boundary or `target` is not on
/// the chain below `source`.
pub fn convert_column_position(
    source: &dyn Layer,
    position: usize,
    target: &dyn Layer,
) -> Option<ColumnPositionCoordinate> {
    if source.id() == target.id() {
        return Some(ColumnPositionCoordinate::new(target.id(), position));
    }
    let underlying_position = source.local_to_underlying_column_position(position)?;
    let underlying = source.underlying_layer_by_position(position, 0)?;
    convert_column_position(underlying, underlying_position, target)
}

/// Convert a row position from `source`'s frame to `target`'s frame.
pub fn convert_row_position(
    source: &dyn Layer,
    position: usize,
    target: &dyn Layer,
) -> Option<RowPositionCoordinate> {
    if source.id() == target.id() {
        return Some(RowPositionCoordinate::new(target.id(), position));
    }
    let underlying_position = source.local_to_underlying_row_position(position)?;
    let underlying = source.underlying_layer_by_position(0, position)?;
    convert_row_position(underlying, underlying_position, target)
}

/// Convert a column coordinate in place, verifying it is expressed in
/// `source`'s frame first.
pub fn convert_column_coordinate(
    coordinate: &mut ColumnPositionCoordinate,
    source: &dyn Layer,
    target: &dyn Layer,
) -> bool {
    if coordinate.layer != source.id() {
        return false;
    }
    match convert_column_position(source, coordinate.position, target) {
        Some(converted) => {
            *coordinate = converted;
            true
        }
        None => false,
    }
}

/// Convert a row coordinate in place, verifying the source frame.
pub fn convert_row_coordinate(
    coordinate: &mut RowPositionCoordinate,
    source: &dyn Layer,
    target: &dyn Layer,
) -> bool {
    if coordinate.layer != source.id() {
        return false;
    }
    match convert_row_position(source, coordinate.position, target) {
        Some(converted) => {
            *coordinate = converted;
            true
        }
        None => false,
    }
}

/// Request a full repaint. Context-free: no positional meaning, converts
/// through every boundary, and is consumed by the base data layer.
#[derive(Debug, Clone, Default)]
pub struct VisualRefreshCommand;

impl VisualRefreshCommand {
    pub fn new() -> Self {
        Self
    }
}

impl LayerCommand for VisualRefreshCommand {
    fn convert_to_target_layer(&mut self, _source: &dyn Layer, _target: &dyn Layer) -> bool {
        true
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
