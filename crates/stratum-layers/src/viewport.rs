#![forbid(unsafe_code)]

//! Viewport transformation layer.
//!
//! [`ViewportLayer`] exposes the window of the underlying layer that fits
//! a pixel client area, starting at an origin position per axis. Local
//! position `p` is underlying position `origin + p`; anything scrolled out
//! of view is simply not representable in the viewport frame, so commands
//! targeting it fail conversion and are dropped, and events about it are
//! filtered on the way up.
//!
//! A partially visible last column/row counts as visible.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use crate::command::LayerCommand;
use crate::coordinate::LayerId;
use crate::event::{LayerEvent, VisualRefreshEvent};
use crate::layer::{Layer, LayerBase, LayerCommandHandler, LayerListener};

/// Scroll window over one underlying layer.
pub struct ViewportLayer<L: Layer> {
    base: LayerBase,
    underlying: L,
    client_width: u64,
    client_height: u64,
    origin_column: usize,
    origin_row: usize,
}

impl<L: Layer> ViewportLayer<L> {
    /// A viewport showing everything (unbounded client area).
    pub fn new(underlying: L) -> Self {
        Self::with_client_area(underlying, u64::MAX, u64::MAX)
    }

    pub fn with_client_area(underlying: L, client_width: u64, client_height: u64) -> Self {
        Self {
            base: LayerBase::new(),
            underlying,
            client_width,
            client_height,
            origin_column: 0,
            origin_row: 0,
        }
    }

    pub fn underlying(&self) -> &L {
        &self.underlying
    }

    /// Resize the pixel client area.
    pub fn set_client_area(&mut self, width: u64, height: u64) {
        self.client_width = width;
        self.client_height = height;
        let event = VisualRefreshEvent::new(self.base.id());
        self.base.fire(Box::new(event));
    }

    pub fn origin_column_position(&self) -> usize {
        self.origin_column
    }

    pub fn origin_row_position(&self) -> usize {
        self.origin_row
    }

    /// Scroll so the underlying column `position` becomes local position 0.
    ///
    /// Clamped to the underlying column count.
    pub fn set_origin_column_position(&mut self, position: usize) {
        self.origin_column = position.min(self.underlying.column_count());
        let event = VisualRefreshEvent::new(self.base.id());
        self.base.fire(Box::new(event));
    }

    /// Scroll so the underlying row `position` becomes local position 0.
    pub fn set_origin_row_position(&mut self, position: usize) {
        self.origin_row = position.min(self.underlying.row_count());
        let event = VisualRefreshEvent::new(self.base.id());
        self.base.fire(Box::new(event));
    }

    fn visible_column_count(&self) -> usize {
        let total = self.underlying.column_count();
        if self.origin_column >= total {
            return 0;
        }
        let Some(base_x) = self.underlying.start_x_of_column_position(self.origin_column) else {
            return 0;
        };
        let mut count = 0;
        for position in self.origin_column..total {
            match self.underlying.start_x_of_column_position(position) {
                Some(x) if x.saturating_sub(base_x) < self.client_width => count += 1,
                _ => break,
            }
        }
        count
    }

    fn visible_row_count(&self) -> usize {
        let total = self.underlying.row_count();
        if self.origin_row >= total {
            return 0;
        }
        let Some(base_y) = self.underlying.start_y_of_row_position(self.origin_row) else {
            return 0;
        };
        let mut count = 0;
        for position in self.origin_row..total {
            match self.underlying.start_y_of_row_position(position) {
                Some(y) if y.saturating_sub(base_y) < self.client_height => count += 1,
                _ => break,
            }
        }
        count
    }

    fn pull_underlying_events(&mut self) {
        let events = self.underlying.drain_events();
        for mut event in events {
            if event.convert_to_local(&*self) {
                self.base.fire(event);
            } else {
                tracing::trace!("event outside the viewport; dropped");
            }
        }
    }
}

impl<L: Layer> Layer for ViewportLayer<L> {
    fn id(&self) -> LayerId {
        self.base.id()
    }

    fn column_count(&self) -> usize {
        self.visible_column_count()
    }

    fn row_count(&self) -> usize {
        self.visible_row_count()
    }

    fn column_index_by_position(&self, position: usize) -> Option<usize> {
        if position >= self.visible_column_count() {
            return None;
        }
        self.underlying
            .column_index_by_position(self.origin_column + position)
    }

    fn column_position_by_index(&self, index: usize) -> Option<usize> {
        let underlying_position = self.underlying.column_position_by_index(index)?;
        self.underlying_to_local_column_position(underlying_position)
    }

    fn row_index_by_position(&self, position: usize) -> Option<usize> {
        if position >= self.visible_row_count() {
            return None;
        }
        self.underlying.row_index_by_position(self.origin_row + position)
    }

    fn row_position_by_index(&self, index: usize) -> Option<usize> {
        let underlying_position = self.underlying.row_position_by_index(index)?;
        self.underlying_to_local_row_position(underlying_position)
    }

    fn local_to_underlying_column_position(&self, position: usize) -> Option<usize> {
        (position < self.visible_column_count()).then(|| self.origin_column + position)
    }

    fn underlying_to_local_column_position(&self, underlying_position: usize) -> Option<usize> {
        if underlying_position < self.origin_column {
            return None;
        }
        let local = underlying_position - self.origin_column;
        (local < self.visible_column_count()).then_some(local)
    }

    fn local_to_underlying_row_position(&self, position: usize) -> Option<usize> {
        (position < self.visible_row_count()).then(|| self.origin_row + position)
    }

    fn underlying_to_local_row_position(&self, underlying_position: usize) -> Option<usize> {
        if underlying_position < self.origin_row {
            return None;
        }
        let local = underlying_position - self.origin_row;
        (local < self.visible_row_count()).then_some(local)
    }

    fn underlying_layer_by_position(
        &self,
        _column_position: usize,
        _row_position: usize,
    ) -> Option<&dyn Layer> {
        Some(&self.underlying)
    }

    fn column_width_by_position(&self, position: usize) -> Option<u32> {
        let underlying_position = self.local_to_underlying_column_position(position)?;
        self.underlying.column_width_by_position(underlying_position)
    }

    fn row_height_by_position(&self, position: usize) -> Option<u32> {
        let underlying_position = self.local_to_underlying_row_position(position)?;
        self.underlying.row_height_by_position(underlying_position)
    }

    fn start_x_of_column_position(&self, position: usize) -> Option<u64> {
        if position > self.visible_column_count() {
            return None;
        }
        let base = self.underlying.start_x_of_column_position(self.origin_column)?;
        let x = self
            .underlying
            .start_x_of_column_position(self.origin_column + position)?;
        Some(x.saturating_sub(base))
    }

    fn start_y_of_row_position(&self, position: usize) -> Option<u64> {
        if position > self.visible_row_count() {
            return None;
        }
        let base = self.underlying.start_y_of_row_position(self.origin_row)?;
        let y = self
            .underlying
            .start_y_of_row_position(self.origin_row + position)?;
        Some(y.saturating_sub(base))
    }

    fn do_command(&mut self, command: &mut dyn LayerCommand) -> bool {
        if let Some(handler) = self.base.handler_for(command.as_any().type_id())
            && handler.handle(self, command)
        {
            return true;
        }
        if !command.convert_to_target_layer(&*self, &self.underlying) {
            tracing::debug!("command conversion failed at viewport boundary; dropped");
            return false;
        }
        let handled = self.underlying.do_command(command);
        self.pull_underlying_events();
        handled
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
        self.base.drain()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<L: Layer> std::fmt::Debug for ViewportLayer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportLayer")
            .field("id", &self.base.id())
            .field("origin_column", &self.origin_column)
            .field("origin_row", &self.origin_row)
            .field("client", &(self.client_width, self.client_height))
            .finish()
    }
}
