#![forbid(unsafe_code)]

//! Composite layer: a layout grid of child layers side by side.
//!
//! The composite's column space is the concatenation of its layout
//! columns' bands, its row space the concatenation of its layout rows'.
//! A composite position locates a band and delegates to the child there
//! with the band offset subtracted.
//!
//! Commands are routed per child: for each occupied cell, a **clone** of
//! the command is converted from the composite frame into that child's
//! frame and forwarded; the first child that consumes it wins. Cloning
//! keeps siblings from seeing each other's converted coordinates.
//!
//! # Routing context
//!
//! The one-boundary conversion methods (`local_to_underlying_*`,
//! `underlying_to_local_*`, `underlying_layer_by_position`) are ambiguous
//! on a composite: several children share the same underlying position
//! space. While a command or event is being routed for one specific cell,
//! the composite pins that cell as the conversion band and the methods
//! answer for it alone; outside routing they fall back to locating the
//! band by position (and the first layout column/row for the inverse).

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use stratum_layers::command::LayerCommand;
use stratum_layers::coordinate::LayerId;
use stratum_layers::event::LayerEvent;
use stratum_layers::layer::{Layer, LayerBase, LayerCommandHandler, LayerListener};

struct CompositeChild {
    region: String,
    layer: Box<dyn Layer>,
}

/// A rectangular arrangement of child layers under region labels.
pub struct CompositeLayer {
    base: LayerBase,
    layout_columns: usize,
    layout_rows: usize,
    /// Indexed `cells[layout_y][layout_x]`.
    cells: Vec<Vec<Option<CompositeChild>>>,
    /// `(layout_x, layout_y)` pinned while routing for one cell.
    conversion_band: RefCell<Option<(usize, usize)>>,
}

impl CompositeLayer {
    pub fn new(layout_columns: usize, layout_rows: usize) -> Self {
        let cells = (0..layout_rows)
            .map(|_| (0..layout_columns).map(|_| None).collect())
            .collect();
        Self {
            base: LayerBase::new(),
            layout_columns,
            layout_rows,
            cells,
            conversion_band: RefCell::new(None),
        }
    }

    pub fn layout_columns(&self) -> usize {
        self.layout_columns
    }

    pub fn layout_rows(&self) -> usize {
        self.layout_rows
    }

    /// Place a child at a layout cell, replacing any previous occupant.
    ///
    /// Out-of-layout coordinates are ignored.
    pub fn set_child(
        &mut self,
        layout_x: usize,
        layout_y: usize,
        region: impl Into<String>,
        layer: Box<dyn Layer>,
    ) {
        if layout_x >= self.layout_columns || layout_y >= self.layout_rows {
            tracing::warn!(layout_x, layout_y, "child placed outside the layout; ignored");
            return;
        }
        self.cells[layout_y][layout_x] = Some(CompositeChild {
            region: region.into(),
            layer,
        });
    }

    pub fn child_layer(&self, layout_x: usize, layout_y: usize) -> Option<&dyn Layer> {
        self.cells
            .get(layout_y)?
            .get(layout_x)?
            .as_ref()
            .map(|child| child.layer.as_ref())
    }

    pub fn child_layer_mut(&mut self, layout_x: usize, layout_y: usize) -> Option<&mut dyn Layer> {
        match self.cells.get_mut(layout_y)?.get_mut(layout_x)? {
            Some(child) => Some(child.layer.as_mut()),
            None => None,
        }
    }

    /// Region label of the child responsible for a composite position.
    pub fn region_by_position(&self, column_position: usize, row_position: usize) -> Option<&str> {
        let (layout_x, _) = self.locate_column(column_position)?;
        let (layout_y, _) = self.locate_row(row_position)?;
        self.cells[layout_y][layout_x]
            .as_ref()
            .map(|child| child.region.as_str())
    }

    // ---------------------------------------------------------------
    // Band geometry
    // ---------------------------------------------------------------

    /// Reference child for a layout column: the topmost occupant.
    fn column_reference_child(&self, layout_x: usize) -> Option<&dyn Layer> {
        (0..self.layout_rows).find_map(|y| self.child_layer(layout_x, y))
    }

    /// Reference child for a layout row: the leftmost occupant.
    fn row_reference_child(&self, layout_y: usize) -> Option<&dyn Layer> {
        (0..self.layout_columns).find_map(|x| self.child_layer(x, layout_y))
    }

    fn band_column_count(&self, layout_x: usize) -> usize {
        self.column_reference_child(layout_x)
            .map_or(0, Layer::column_count)
    }

    fn band_row_count(&self, layout_y: usize) -> usize {
        self.row_reference_child(layout_y)
            .map_or(0, Layer::row_count)
    }

    fn column_band_offset(&self, layout_x: usize) -> usize {
        (0..layout_x).map(|x| self.band_column_count(x)).sum()
    }

    fn row_band_offset(&self, layout_y: usize) -> usize {
        (0..layout_y).map(|y| self.band_row_count(y)).sum()
    }

    /// Locate the layout column owning a composite column position.
    fn locate_column(&self, position: usize) -> Option<(usize, usize)> {
        let mut offset = 0;
        for layout_x in 0..self.layout_columns {
            let count = self.band_column_count(layout_x);
            if position < offset + count {
                return Some((layout_x, position - offset));
            }
            offset += count;
        }
        None
    }

    fn locate_row(&self, position: usize) -> Option<(usize, usize)> {
        let mut offset = 0;
        for layout_y in 0..self.layout_rows {
            let count = self.band_row_count(layout_y);
            if position < offset + count {
                return Some((layout_y, position - offset));
            }
            offset += count;
        }
        None
    }

    fn band_total_width(&self, layout_x: usize) -> Option<u64> {
        let child = self.column_reference_child(layout_x)?;
        child.start_x_of_column_position(child.column_count())
    }

    fn band_total_height(&self, layout_y: usize) -> Option<u64> {
        let child = self.row_reference_child(layout_y)?;
        child.start_y_of_row_position(child.row_count())
    }

    // ---------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------

    fn pinned_band(&self) -> Option<(usize, usize)> {
        *self.conversion_band.borrow()
    }

    /// Drain every child's outbox, converting events into the composite
    /// frame with the firing cell pinned as the conversion band.
    fn pull_child_events(&mut self) {
        for layout_y in 0..self.layout_rows {
            for layout_x in 0..self.layout_columns {
                let events = match self.cells[layout_y][layout_x].as_mut() {
                    Some(child) => child.layer.drain_events(),
                    None => continue,
                };
                if events.is_empty() {
                    continue;
                }
                let mut converted = Vec::with_capacity(events.len());
                *self.conversion_band.borrow_mut() = Some((layout_x, layout_y));
                for mut event in events {
                    if event.convert_to_local(&*self) {
                        converted.push(event);
                    }
                }
                *self.conversion_band.borrow_mut() = None;
                for event in converted {
                    self.base.fire(event);
                }
            }
        }
    }
}

impl Layer for CompositeLayer {
    fn id(&self) -> LayerId {
        self.base.id()
    }

    fn column_count(&self) -> usize {
        (0..self.layout_columns)
            .map(|x| self.band_column_count(x))
            .sum()
    }

    fn row_count(&self) -> usize {
        (0..self.layout_rows).map(|y| self.band_row_count(y)).sum()
    }

    fn column_index_by_position(&self, position: usize) -> Option<usize> {
        let (layout_x, local) = self.locate_column(position)?;
        self.column_reference_child(layout_x)?
            .column_index_by_position(local)
    }

    fn column_position_by_index(&self, index: usize) -> Option<usize> {
        // Index spaces of sibling bands may collide; the leftmost band
        // that can answer wins.
        for layout_x in 0..self.layout_columns {
            if let Some(child) = self.column_reference_child(layout_x)
                && let Some(position) = child.column_position_by_index(index)
            {
                return Some(self.column_band_offset(layout_x) + position);
            }
        }
        None
    }

    fn row_index_by_position(&self, position: usize) -> Option<usize> {
        let (layout_y, local) = self.locate_row(position)?;
        self.row_reference_child(layout_y)?.row_index_by_position(local)
    }

    fn row_position_by_index(&self, index: usize) -> Option<usize> {
        for layout_y in 0..self.layout_rows {
            if let Some(child) = self.row_reference_child(layout_y)
                && let Some(position) = child.row_position_by_index(index)
            {
                return Some(self.row_band_offset(layout_y) + position);
            }
        }
        None
    }

    fn local_to_underlying_column_position(&self, position: usize) -> Option<usize> {
        if let Some((layout_x, _)) = self.pinned_band() {
            let offset = self.column_band_offset(layout_x);
            let count = self.band_column_count(layout_x);
            return (position >= offset && position < offset + count)
                .then(|| position - offset);
        }
        self.locate_column(position).map(|(_, local)| local)
    }

    fn underlying_to_local_column_position(&self, underlying_position: usize) -> Option<usize> {
        let (layout_x, _) = self.pinned_band().unwrap_or((0, 0));
        (underlying_position < self.band_column_count(layout_x))
            .then(|| self.column_band_offset(layout_x) + underlying_position)
    }

    fn local_to_underlying_row_position(&self, position: usize) -> Option<usize> {
        if let Some((_, layout_y)) = self.pinned_band() {
            let offset = self.row_band_offset(layout_y);
            let count = self.band_row_count(layout_y);
            return (position >= offset && position < offset + count)
                .then(|| position - offset);
        }
        self.locate_row(position).map(|(_, local)| local)
    }

    fn underlying_to_local_row_position(&self, underlying_position: usize) -> Option<usize> {
        let (_, layout_y) = self.pinned_band().unwrap_or((0, 0));
        (underlying_position < self.band_row_count(layout_y))
            .then(|| self.row_band_offset(layout_y) + underlying_position)
    }

    fn underlying_layer_by_position(
        &self,
        column_position: usize,
        row_position: usize,
    ) -> Option<&dyn Layer> {
        if let Some((layout_x, layout_y)) = self.pinned_band() {
            return self.child_layer(layout_x, layout_y);
        }
        let (layout_x, _) = self.locate_column(column_position)?;
        let (layout_y, _) = self.locate_row(row_position)?;
        self.child_layer(layout_x, layout_y)
    }

    fn column_width_by_position(&self, position: usize) -> Option<u32> {
        let (layout_x, local) = self.locate_column(position)?;
        self.column_reference_child(layout_x)?
            .column_width_by_position(local)
    }

    fn row_height_by_position(&self, position: usize) -> Option<u32> {
        let (layout_y, local) = self.locate_row(position)?;
        self.row_reference_child(layout_y)?.row_height_by_position(local)
    }

    fn start_x_of_column_position(&self, position: usize) -> Option<u64> {
        if position == self.column_count() {
            return (0..self.layout_columns).try_fold(0u64, |acc, x| {
                if self.band_column_count(x) == 0 {
                    Some(acc)
                } else {
                    self.band_total_width(x).map(|w| acc + w)
                }
            });
        }
        let (layout_x, local) = self.locate_column(position)?;
        let mut acc = 0u64;
        for x in 0..layout_x {
            if self.band_column_count(x) > 0 {
                acc += self.band_total_width(x)?;
            }
        }
        let child = self.column_reference_child(layout_x)?;
        Some(acc + child.start_x_of_column_position(local)?)
    }

    fn start_y_of_row_position(&self, position: usize) -> Option<u64> {
        if position == self.row_count() {
            return (0..self.layout_rows).try_fold(0u64, |acc, y| {
                if self.band_row_count(y) == 0 {
                    Some(acc)
                } else {
                    self.band_total_height(y).map(|h| acc + h)
                }
            });
        }
        let (layout_y, local) = self.locate_row(position)?;
        let mut acc = 0u64;
        for y in 0..layout_y {
            if self.band_row_count(y) > 0 {
                acc += self.band_total_height(y)?;
            }
        }
        let child = self.row_reference_child(layout_y)?;
        Some(acc + child.start_y_of_row_position(local)?)
    }

    fn do_command(&mut self, command: &mut dyn LayerCommand) -> bool {
        if let Some(handler) = self.base.handler_for(command.as_any().type_id())
            && handler.handle(self, command)
        {
            return true;
        }
        for layout_y in 0..self.layout_rows {
            for layout_x in 0..self.layout_columns {
                if self.cells[layout_y][layout_x].is_none() {
                    continue;
                }
                let mut clone = command.clone_command();
                *self.conversion_band.borrow_mut() = Some((layout_x, layout_y));
                let converted = match self.child_layer(layout_x, layout_y) {
                    Some(child) => clone.convert_to_target_layer(&*self, child),
                    None => false,
                };
                *self.conversion_band.borrow_mut() = None;
                if !converted {
                    continue;
                }
                let handled = match self.cells[layout_y][layout_x].as_mut() {
                    Some(child) => child.layer.do_command(&mut *clone),
                    None => false,
                };
                self.pull_child_events();
                if handled {
                    return true;
                }
            }
        }
        tracing::debug!("no composite child consumed the command");
        false
    }

    fn register_command_handler(&mut self, handler: Rc<dyn LayerCommandHandler>) {
        self.base.register_handler(handler);
    }

    fn unregister_command_handler(&mut self, command_type: TypeId) {
        self.base.unregister_handler(command_type);
    }

    fn add_layer_listener(&mut self, listener: Rc<RefCell<dyn LayerListener>>) {
        self.base.add_listener(listener);
    }

    fn fire_layer_event(&mut self, event: Box<dyn LayerEvent>) {
        self.base.fire(event);
    }

    fn drain_events(&mut self) -> Vec<Box<dyn LayerEvent>> {
        self.pull_child_events();
        self.base.drain()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl std::fmt::Debug for CompositeLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeLayer")
            .field("id", &self.base.id())
            .field("layout", &(self.layout_columns, self.layout_rows))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::CompositeLayer;
    use stratum_layers::layer::Layer;
    use stratum_layers::{DataLayer, VecDataProvider};

    fn body(columns: usize, rows: usize) -> Box<dyn Layer> {
        Box::new(DataLayer::new(VecDataProvider::<u32>::new(columns, rows)))
    }

    fn two_by_one() -> CompositeLayer {
        let mut composite = CompositeLayer::new(2, 1);
        composite.set_child(0, 0, "left", body(2, 3));
        composite.set_child(1, 0, "right", body(4, 3));
        composite
    }

    #[test]
    fn column_space_concatenates_bands() {
        let composite = two_by_one();
        assert_eq!(composite.column_count(), 6);
        assert_eq!(composite.row_count(), 3);
        assert_eq!(composite.column_index_by_position(1), Some(1));
        // Position 2 is the right band's local position 0.
        assert_eq!(composite.column_index_by_position(2), Some(0));
        assert_eq!(composite.column_index_by_position(6), None);
    }

    #[test]
    fn start_x_spans_band_boundaries() {
        let composite = two_by_one();
        assert_eq!(composite.start_x_of_column_position(0), Some(0));
        assert_eq!(composite.start_x_of_column_position(2), Some(200));
        assert_eq!(composite.start_x_of_column_position(3), Some(300));
        // Total width of both bands.
        assert_eq!(composite.start_x_of_column_position(6), Some(600));
    }

    #[test]
    fn region_lookup_locates_the_owning_cell() {
        let composite = two_by_one();
        assert_eq!(composite.region_by_position(0, 0), Some("left"));
        assert_eq!(composite.region_by_position(5, 2), Some("right"));
        assert_eq!(composite.region_by_position(6, 0), None);
    }

    #[test]
    fn empty_cells_contribute_nothing() {
        let mut composite = CompositeLayer::new(2, 2);
        composite.set_child(1, 1, "body", body(3, 2));
        assert_eq!(composite.column_count(), 3);
        assert_eq!(composite.row_count(), 2);
        assert_eq!(composite.region_by_position(0, 0), Some("body"));
    }
}
