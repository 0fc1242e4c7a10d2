#![forbid(unsafe_code)]

//! Standard four-region grid assembly.
//!
//! A [`GridLayer`] is a 2x2 [`CompositeLayer`]: corner and column header
//! on the top layout row, row header and body below. Column 0 of the grid
//! frame is the row-header band; row 0 is the header band.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use stratum_layers::command::LayerCommand;
use stratum_layers::coordinate::LayerId;
use stratum_layers::event::LayerEvent;
use stratum_layers::layer::{Layer, LayerCommandHandler, LayerListener};

use crate::composite::CompositeLayer;

/// The four standard grid regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridRegion {
    Corner,
    ColumnHeader,
    RowHeader,
    Body,
}

impl GridRegion {
    pub const fn label(self) -> &'static str {
        match self {
            GridRegion::Corner => "CORNER",
            GridRegion::ColumnHeader => "COLUMN_HEADER",
            GridRegion::RowHeader => "ROW_HEADER",
            GridRegion::Body => "BODY",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "CORNER" => Some(GridRegion::Corner),
            "COLUMN_HEADER" => Some(GridRegion::ColumnHeader),
            "ROW_HEADER" => Some(GridRegion::RowHeader),
            "BODY" => Some(GridRegion::Body),
            _ => None,
        }
    }
}

/// Corner / column header / row header / body composite.
pub struct GridLayer {
    composite: CompositeLayer,
}

impl GridLayer {
    pub fn new(
        corner: Box<dyn Layer>,
        column_header: Box<dyn Layer>,
        row_header: Box<dyn Layer>,
        body: Box<dyn Layer>,
    ) -> Self {
        let mut composite = CompositeLayer::new(2, 2);
        composite.set_child(0, 0, GridRegion::Corner.label(), corner);
        composite.set_child(1, 0, GridRegion::ColumnHeader.label(), column_header);
        composite.set_child(0, 1, GridRegion::RowHeader.label(), row_header);
        composite.set_child(1, 1, GridRegion::Body.label(), body);
        Self { composite }
    }

    pub fn composite(&self) -> &CompositeLayer {
        &self.composite
    }

    /// Region under a grid-frame position.
    pub fn region_by_position(
        &self,
        column_position: usize,
        row_position: usize,
    ) -> Option<GridRegion> {
        self.composite
            .region_by_position(column_position, row_position)
            .and_then(GridRegion::from_label)
    }

    pub fn body_layer(&self) -> Option<&dyn Layer> {
        self.composite.child_layer(1, 1)
    }

    pub fn body_layer_mut(&mut self) -> Option<&mut dyn Layer> {
        self.composite.child_layer_mut(1, 1)
    }

    pub fn column_header_layer(&self) -> Option<&dyn Layer> {
        self.composite.child_layer(1, 0)
    }

    pub fn row_header_layer(&self) -> Option<&dyn Layer> {
        self.composite.child_layer(0, 1)
    }

    pub fn corner_layer(&self) -> Option<&dyn Layer> {
        self.composite.child_layer(0, 0)
    }
}

impl Layer for GridLayer {
    fn id(&self) -> LayerId {
        self.composite.id()
    }

    fn column_count(&self) -> usize {
        self.composite.column_count()
    }

    fn row_count(&self) -> usize {
        self.composite.row_count()
    }

    fn column_index_by_position(&self, position: usize) -> Option<usize> {
        self.composite.column_index_by_position(position)
    }

    fn column_position_by_index(&self, index: usize) -> Option<usize> {
        self.composite.column_position_by_index(index)
    }

    fn row_index_by_position(&self, position: usize) -> Option<usize> {
        self.composite.row_index_by_position(position)
    }

    fn row_position_by_index(&self, index: usize) -> Option<usize> {
        self.composite.row_position_by_index(index)
    }

    fn local_to_underlying_column_position(&self, position: usize) -> Option<usize> {
        self.composite.local_to_underlying_column_position(position)
    }

    fn underlying_to_local_column_position(&self, underlying_position: usize) -> Option<usize> {
        self.composite
            .underlying_to_local_column_position(underlying_position)
    }

    fn local_to_underlying_row_position(&self, position: usize) -> Option<usize> {
        self.composite.local_to_underlying_row_position(position)
    }

    fn underlying_to_local_row_position(&self, underlying_position: usize) -> Option<usize> {
        self.composite
            .underlying_to_local_row_position(underlying_position)
    }

    fn underlying_layer_by_position(
        &self,
        column_position: usize,
        row_position: usize,
    ) -> Option<&dyn Layer> {
        self.composite
            .underlying_layer_by_position(column_position, row_position)
    }

    fn column_width_by_position(&self, position: usize) -> Option<u32> {
        self.composite.column_width_by_position(position)
    }

    fn row_height_by_position(&self, position: usize) -> Option<u32> {
        self.composite.row_height_by_position(position)
    }

    fn start_x_of_column_position(&self, position: usize) -> Option<u64> {
        self.composite.start_x_of_column_position(position)
    }

    fn start_y_of_row_position(&self, position: usize) -> Option<u64> {
        self.composite.start_y_of_row_position(position)
    }

    fn do_command(&mut self, command: &mut dyn LayerCommand) -> bool {
        self.composite.do_command(command)
    }

    fn register_command_handler(&mut self, handler: Rc<dyn LayerCommandHandler>) {
        self.composite.register_command_handler(handler);
    }

    fn unregister_command_handler(&mut self, command_type: TypeId) {
        self.composite.unregister_command_handler(command_type);
    }

    fn add_layer_listener(&mut self, listener: Rc<RefCell<dyn LayerListener>>) {
        self.composite.add_layer_listener(listener);
    }

    fn fire_layer_event(&mut self, event: Box<dyn LayerEvent>) {
        self.composite.fire_layer_event(event);
    }

    fn drain_events(&mut self) -> Vec<Box<dyn LayerEvent>> {
        self.composite.drain_events()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl std::fmt::Debug for GridLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridLayer")
            .field("composite", &self.composite)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::GridRegion;

    #[test]
    fn labels_round_trip() {
        for region in [
            GridRegion::Corner,
            GridRegion::ColumnHeader,
            GridRegion::RowHeader,
            GridRegion::Body,
        ] {
            assert_eq!(GridRegion::from_label(region.label()), Some(region));
        }
        assert_eq!(GridRegion::from_label("FOOTER"), None);
    }
}
