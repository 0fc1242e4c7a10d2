#![forbid(unsafe_code)]

//! Resize commands.
//!
//! Sizes are owned by the base data layer and keyed by **position** in its
//! frame: a resized width follows the column as the stack scrolls, but not
//! as it reorders. That is the documented sizing policy, not an accident.
//! Resize commands therefore descend the stack converting their positions
//! until they reach the data layer.

use std::any::Any;

use crate::command::{LayerCommand, convert_column_coordinate, convert_row_coordinate};
use crate::coordinate::{ColumnPositionCoordinate, LayerId, RowPositionCoordinate};
use crate::layer::Layer;

/// Set one column's width.
#[derive(Debug, Clone)]
pub struct ColumnResizeCommand {
    pub coordinate: ColumnPositionCoordinate,
    pub new_width: u32,
}

impl ColumnResizeCommand {
    pub fn new(layer: LayerId, position: usize, new_width: u32) -> Self {
        Self {
            coordinate: ColumnPositionCoordinate::new(layer, position),
            new_width,
        }
    }
}

impl LayerCommand for ColumnResizeCommand {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        convert_column_coordinate(&mut self.coordinate, source, target)
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Set one row's height.
#[derive(Debug, Clone)]
pub struct RowResizeCommand {
    pub coordinate: RowPositionCoordinate,
    pub new_height: u32,
}

impl RowResizeCommand {
    pub fn new(layer: LayerId, position: usize, new_height: u32) -> Self {
        Self {
            coordinate: RowPositionCoordinate::new(layer, position),
            new_height,
        }
    }
}

impl LayerCommand for RowResizeCommand {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        convert_row_coordinate(&mut self.coordinate, source, target)
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Set several column widths at once, either per-position or one common
/// width for all of them.
///
/// After the command has been converted into another layer's frame,
/// [`column_width`](Self::column_width) answers for positions in the *new*
/// frame; querying with a stale or foreign position yields `None`.
#[derive(Debug, Clone)]
pub struct MultiColumnResizeCommand {
    entries: Vec<(ColumnPositionCoordinate, u32)>,
}

impl MultiColumnResizeCommand {
    /// Parallel positions and widths. Lengths must match; extra entries on
    /// either side are ignored.
    pub fn new(layer: LayerId, positions: &[usize], widths: &[u32]) -> Self {
        Self {
            entries: positions
                .iter()
                .zip(widths)
                .map(|(&p, &w)| (ColumnPositionCoordinate::new(layer, p), w))
                .collect(),
        }
    }

    /// One common width for every given position.
    pub fn with_common_width(layer: LayerId, positions: &[usize], width: u32) -> Self {
        Self {
            entries: positions
                .iter()
                .map(|&p| (ColumnPositionCoordinate::new(layer, p), width))
                .collect(),
        }
    }

    /// The width configured for `position` in the command's current frame.
    pub fn column_width(&self, position: usize) -> Option<u32> {
        self.entries
            .iter()
            .find(|(coordinate, _)| coordinate.position == position)
            .map(|&(_, width)| width)
    }

    /// Positions carried by the command, in its current frame.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(coordinate, _)| coordinate.position)
    }

    /// Coordinate/width pairs, in the command's current frame.
    pub fn entries(&self) -> impl Iterator<Item = (ColumnPositionCoordinate, u32)> + '_ {
        self.entries.iter().copied()
    }
}

impl LayerCommand for MultiColumnResizeCommand {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        // All-or-nothing: leave the command untouched unless every
        // coordinate is representable in the target frame.
        let mut converted = self.entries.clone();
        for (coordinate, _) in &mut converted {
            if !convert_column_coordinate(coordinate, source, target) {
                return false;
            }
        }
        self.entries = converted;
        true
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::MultiColumnResizeCommand;
    use crate::coordinate::LayerId;

    #[test]
    fn width_lookup_by_position() {
        let layer = LayerId::next();
        let command = MultiColumnResizeCommand::new(layer, &[2, 5], &[120, 80]);
        assert_eq!(command.column_width(2), Some(120));
        assert_eq!(command.column_width(5), Some(80));
        assert_eq!(command.column_width(3), None);
    }

    #[test]
    fn common_width_applies_to_all_positions() {
        let layer = LayerId::next();
        let command = MultiColumnResizeCommand::with_common_width(layer, &[1, 4, 6], 90);
        for p in [1, 4, 6] {
            assert_eq!(command.column_width(p), Some(90));
        }
        assert_eq!(command.column_width(0), None);
    }
}
