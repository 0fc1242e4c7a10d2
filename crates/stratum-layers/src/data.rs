#![forbid(unsafe_code)]

//! The base data layer.
//!
//! [`DataLayer`] sits at the bottom of every stack: position and index are
//! identical here, and it owns one [`SizeConfig`] per axis. It consumes the
//! resize and update commands that descend to it and answers the pixel
//! offset queries the rest of the stack forwards down.
//!
//! The [`DataProvider`] boundary is a collaborator interface: a provider
//! that rejects mutation (a read-only header provider, say) makes the
//! update handler report a failed command rather than crash.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use stratum_core::{Persistable, Properties, SizeConfig};

use crate::command::{LayerCommand, VisualRefreshCommand};
use crate::coordinate::{CellCoordinate, LayerId};
use crate::event::{CellUpdateEvent, ColumnResizeEvent, RowResizeEvent, VisualRefreshEvent};
use crate::layer::{Layer, LayerBase, LayerCommandHandler, LayerListener};
use crate::resize::{ColumnResizeCommand, MultiColumnResizeCommand, RowResizeCommand};

/// Default column width in pixels.
pub const DEFAULT_COLUMN_WIDTH: u32 = 100;
/// Default row height in pixels.
pub const DEFAULT_ROW_HEIGHT: u32 = 20;

/// Why a data mutation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataUpdateError {
    /// The provider does not support mutation.
    ReadOnly,
    /// The cell lies outside the provider's bounds.
    OutOfBounds,
}

impl fmt::Display for DataUpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "data provider is read-only"),
            Self::OutOfBounds => write!(f, "cell is outside the data provider bounds"),
        }
    }
}

impl std::error::Error for DataUpdateError {}

/// Source of cell values underneath a [`DataLayer`].
///
/// Coordinates here are **indexes** — the data layer is the bottom of the
/// stack, so its positions and the provider's indexes coincide.
pub trait DataProvider: 'static {
    type Value: Clone + 'static;

    fn column_count(&self) -> usize;
    fn row_count(&self) -> usize;

    fn value(&self, column_index: usize, row_index: usize) -> Option<Self::Value>;

    fn set_value(
        &mut self,
        column_index: usize,
        row_index: usize,
        value: Self::Value,
    ) -> Result<(), DataUpdateError>;
}

/// A sparse in-memory provider, optionally read-only.
///
/// Handy as a body or header backing store in assemblies and tests.
#[derive(Debug, Clone)]
pub struct VecDataProvider<V> {
    column_count: usize,
    row_count: usize,
    cells: FxHashMap<(usize, usize), V>,
    read_only: bool,
}

impl<V: Clone + 'static> VecDataProvider<V> {
    pub fn new(column_count: usize, row_count: usize) -> Self {
        Self {
            column_count,
            row_count,
            cells: FxHashMap::default(),
            read_only: false,
        }
    }

    /// A provider that rejects every mutation.
    pub fn read_only(column_count: usize, row_count: usize) -> Self {
        Self {
            read_only: true,
            ..Self::new(column_count, row_count)
        }
    }

    /// Seed a cell value, bypassing the read-only flag.
    pub fn seed(&mut self, column_index: usize, row_index: usize, value: V) {
        self.cells.insert((column_index, row_index), value);
    }
}

impl<V: Clone + 'static> DataProvider for VecDataProvider<V> {
    type Value = V;

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn value(&self, column_index: usize, row_index: usize) -> Option<V> {
        self.cells.get(&(column_index, row_index)).cloned()
    }

    fn set_value(
        &mut self,
        column_index: usize,
        row_index: usize,
        value: V,
    ) -> Result<(), DataUpdateError> {
        if self.read_only {
            return Err(DataUpdateError::ReadOnly);
        }
        if column_index >= self.column_count || row_index >= self.row_count {
            return Err(DataUpdateError::OutOfBounds);
        }
        self.cells.insert((column_index, row_index), value);
        Ok(())
    }
}

/// Write one cell's value through the stack.
#[derive(Debug, Clone)]
pub struct UpdateDataCommand<V> {
    pub coordinate: CellCoordinate,
    pub value: V,
}

impl<V: Clone + 'static> UpdateDataCommand<V> {
    pub fn new(layer: LayerId, column_position: usize, row_position: usize, value: V) -> Self {
        Self {
            coordinate: CellCoordinate::new(layer, column_position, row_position),
            value,
        }
    }
}

impl<V: Clone + 'static> LayerCommand for UpdateDataCommand<V> {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        if self.coordinate.layer != source.id() {
            return false;
        }
        let (Some(column), Some(row)) = (
            crate::command::convert_column_position(
                source,
                self.coordinate.column_position,
                target,
            ),
            crate::command::convert_row_position(source, self.coordinate.row_position, target),
        ) else {
            return false;
        };
        self.coordinate = CellCoordinate::new(target.id(), column.position, row.position);
        true
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The bottom layer of a stack: identity position↔index mapping over a
/// [`DataProvider`], plus per-axis sizing.
pub struct DataLayer<P: DataProvider> {
    base: LayerBase,
    provider: P,
    column_sizes: SizeConfig,
    row_sizes: SizeConfig,
}

impl<P: DataProvider> DataLayer<P> {
    pub fn new(provider: P) -> Self {
        Self::with_sizes(provider, DEFAULT_COLUMN_WIDTH, DEFAULT_ROW_HEIGHT)
    }

    pub fn with_sizes(provider: P, default_column_width: u32, default_row_height: u32) -> Self {
        Self {
            base: LayerBase::new(),
            provider,
            column_sizes: SizeConfig::new(default_column_width),
            row_sizes: SizeConfig::new(default_row_height),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn column_sizes(&self) -> &SizeConfig {
        &self.column_sizes
    }

    pub fn row_sizes(&self) -> &SizeConfig {
        &self.row_sizes
    }

    /// Cell value at `(column_position, row_position)` in this layer's
    /// frame (identical to provider indexes).
    pub fn value_by_position(&self, column_position: usize, row_position: usize) -> Option<P::Value> {
        if column_position >= self.column_count() || row_position >= self.row_count() {
            return None;
        }
        self.provider.value(column_position, row_position)
    }

    /// Set one column's width and fire a resize event.
    ///
    /// A position marked non-resizable is left unchanged.
    pub fn set_column_width_by_position(&mut self, position: usize, width: u32) -> bool {
        if position >= self.column_count() {
            return false;
        }
        if !self.column_sizes.is_position_resizable(position) {
            return true;
        }
        self.column_sizes.set_size(position, width);
        let event = ColumnResizeEvent::new(self.base.id(), vec![position]);
        self.base.fire(Box::new(event));
        true
    }

    /// Set one row's height and fire a resize event.
    pub fn set_row_height_by_position(&mut self, position: usize, height: u32) -> bool {
        if position >= self.row_count() {
            return false;
        }
        if !self.row_sizes.is_position_resizable(position) {
            return true;
        }
        self.row_sizes.set_size(position, height);
        let event = RowResizeEvent::new(self.base.id(), vec![position]);
        self.base.fire(Box::new(event));
        true
    }

    fn on_update_data(&mut self, coordinate: CellCoordinate, value: P::Value) -> bool {
        if coordinate.layer != self.base.id() {
            return false;
        }
        match self
            .provider
            .set_value(coordinate.column_position, coordinate.row_position, value)
        {
            Ok(()) => {
                let event = CellUpdateEvent::new(
                    self.base.id(),
                    coordinate.column_position,
                    coordinate.row_position,
                );
                self.base.fire(Box::new(event));
                true
            }
            Err(error) => {
                // Unsupported mutation is reported as a failed command,
                // not propagated.
                tracing::debug!(%error, "data update rejected");
                false
            }
        }
    }
}

impl<P: DataProvider> Layer for DataLayer<P> {
    fn id(&self) -> LayerId {
        self.base.id()
    }

    fn column_count(&self) -> usize {
        self.provider.column_count()
    }

    fn row_count(&self) -> usize {
        self.provider.row_count()
    }

    fn column_index_by_position(&self, position: usize) -> Option<usize> {
        (position < self.column_count()).then_some(position)
    }

    fn column_position_by_index(&self, index: usize) -> Option<usize> {
        (index < self.column_count()).then_some(index)
    }

    fn row_index_by_position(&self, position: usize) -> Option<usize> {
        (position < self.row_count()).then_some(position)
    }

    fn row_position_by_index(&self, index: usize) -> Option<usize> {
        (index < self.row_count()).then_some(index)
    }

    fn local_to_underlying_column_position(&self, _position: usize) -> Option<usize> {
        None
    }

    fn underlying_to_local_column_position(&self, _underlying_position: usize) -> Option<usize> {
        None
    }

    fn local_to_underlying_row_position(&self, _position: usize) -> Option<usize> {
        None
    }

    fn underlying_to_local_row_position(&self, _underlying_position: usize) -> Option<usize> {
        None
    }

    fn underlying_layer_by_position(
        &self,
        _column_position: usize,
        _row_position: usize,
    ) -> Option<&dyn Layer> {
        None
    }

    fn column_width_by_position(&self, position: usize) -> Option<u32> {
        (position < self.column_count()).then(|| self.column_sizes.size(position))
    }

    fn row_height_by_position(&self, position: usize) -> Option<u32> {
        (position < self.row_count()).then(|| self.row_sizes.size(position))
    }

    fn start_x_of_column_position(&self, position: usize) -> Option<u64> {
        (position <= self.column_count()).then(|| self.column_sizes.aggregate_size(position))
    }

    fn start_y_of_row_position(&self, position: usize) -> Option<u64> {
        (position <= self.row_count()).then(|| self.row_sizes.aggregate_size(position))
    }

    fn do_command(&mut self, command: &mut dyn LayerCommand) -> bool {
        if let Some(handler) = self.base.handler_for(command.as_any().type_id())
            && handler.handle(self, command)
        {
            return true;
        }
        if let Some(cmd) = command.as_any().downcast_ref::<ColumnResizeCommand>() {
            if cmd.coordinate.layer != self.base.id() {
                return false;
            }
            return self.set_column_width_by_position(cmd.coordinate.position, cmd.new_width);
        }
        if let Some(cmd) = command.as_any().downcast_ref::<RowResizeCommand>() {
            if cmd.coordinate.layer != self.base.id() {
                return false;
            }
            return self.set_row_height_by_position(cmd.coordinate.position, cmd.new_height);
        }
        if let Some(cmd) = command.as_any().downcast_ref::<MultiColumnResizeCommand>() {
            let mut entries = Vec::new();
            for (coordinate, width) in cmd.entries() {
                if coordinate.layer != self.base.id() {
                    return false;
                }
                entries.push((coordinate.position, width));
            }
            let mut any = false;
            for (position, width) in entries {
                any |= self.set_column_width_by_position(position, width);
            }
            return any;
        }
        if let Some(cmd) = command.as_any().downcast_ref::<UpdateDataCommand<P::Value>>() {
            let (coordinate, value) = (cmd.coordinate, cmd.value.clone());
            return self.on_update_data(coordinate, value);
        }
        if command.as_any().is::<VisualRefreshCommand>() {
            let event = VisualRefreshEvent::new(self.base.id());
            self.base.fire(Box::new(event));
            return true;
        }
        tracing::debug!("command not handled at base data layer");
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

    fn fire_layer_event(&mut self, event: Box<dyn crate::event::LayerEvent>) {
        self.base.fire(event);
    }

    fn drain_events(&mut self) -> Vec<Box<dyn crate::event::LayerEvent>> {
        self.base.drain()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<P: DataProvider> Persistable for DataLayer<P> {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        self.column_sizes
            .save_state(&format!("{prefix}.columnWidth"), properties);
        self.row_sizes
            .save_state(&format!("{prefix}.rowHeight"), properties);
    }

    fn load_state(&mut self, prefix: &str, properties: &Properties) {
        self.column_sizes
            .load_state(&format!("{prefix}.columnWidth"), properties);
        self.row_sizes
            .load_state(&format!("{prefix}.rowHeight"), properties);
    }
}

impl<P: DataProvider> std::fmt::Debug for DataLayer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLayer")
            .field("id", &self.base.id())
            .field("columns", &self.column_count())
            .field("rows", &self.row_count())
            .finish()
    }
}
