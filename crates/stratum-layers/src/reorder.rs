#![forbid(unsafe_code)]

//! Column reorder transformation layer.
//!
//! [`ColumnReorderLayer`] maintains a position→index permutation: one entry
//! per visible position, distinct from hide/show's filtered set. Moving a
//! column removes its entry and reinserts it so that the moved column ends
//! up immediately before the element that was at the target position when
//! the move was issued (for `[0,1,2,3,4]`, `reorder(4, 1)` yields
//! `[0,4,1,2,3]`). `to == count` appends at the right edge.
//!
//! Multi-column moves preserve the relative order of the moved set.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::command::LayerCommand;
use crate::coordinate::{ColumnPositionCoordinate, LayerId};
use crate::event::{ColumnReorderEvent, LayerEvent};
use crate::layer::{Layer, LayerBase, LayerCommandHandler, LayerListener};

/// Move one column from `from` to `to`, both in the issuing layer's frame.
///
/// Both endpoints are remapped at every boundary on the way down; if either
/// cannot be mapped the whole command is dropped — no partial reorder.
#[derive(Debug, Clone)]
pub struct ColumnReorderCommand {
    pub from: ColumnPositionCoordinate,
    pub to: ColumnPositionCoordinate,
}

impl ColumnReorderCommand {
    pub fn new(layer: LayerId, from_position: usize, to_position: usize) -> Self {
        Self {
            from: ColumnPositionCoordinate::new(layer, from_position),
            to: ColumnPositionCoordinate::new(layer, to_position),
        }
    }
}

impl LayerCommand for ColumnReorderCommand {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        let mut from = self.from;
        let mut to = self.to;
        if !crate::command::convert_column_coordinate(&mut from, source, target)
            || !crate::command::convert_column_coordinate(&mut to, source, target)
        {
            return false;
        }
        self.from = from;
        self.to = to;
        true
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Move a set of columns to a common target, preserving their relative
/// order.
#[derive(Debug, Clone)]
pub struct MultiColumnReorderCommand {
    pub from: Vec<ColumnPositionCoordinate>,
    pub to: ColumnPositionCoordinate,
}

impl MultiColumnReorderCommand {
    pub fn new(layer: LayerId, from_positions: &[usize], to_position: usize) -> Self {
        Self {
            from: from_positions
                .iter()
                .map(|&p| ColumnPositionCoordinate::new(layer, p))
                .collect(),
            to: ColumnPositionCoordinate::new(layer, to_position),
        }
    }
}

impl LayerCommand for MultiColumnReorderCommand {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        let mut from = self.from.clone();
        let mut to = self.to;
        for coordinate in &mut from {
            if !crate::command::convert_column_coordinate(coordinate, source, target) {
                return false;
            }
        }
        if !crate::command::convert_column_coordinate(&mut to, source, target) {
            return false;
        }
        self.from = from;
        self.to = to;
        true
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reorder transformation over one underlying layer.
pub struct ColumnReorderLayer<L: Layer> {
    base: LayerBase,
    underlying: L,
    /// Index at each position. Rebuilt from the underlying order whenever
    /// the underlying column count no longer matches, so a structural
    /// change below (a hide, say) resets the order on the next access.
    permutation: RefCell<Vec<usize>>,
    inverse: RefCell<Option<FxHashMap<usize, usize>>>,
}

impl<L: Layer> ColumnReorderLayer<L> {
    pub fn new(underlying: L) -> Self {
        let permutation = Self::current_order(&underlying);
        Self {
            base: LayerBase::new(),
            underlying,
            permutation: RefCell::new(permutation),
            inverse: RefCell::new(None),
        }
    }

    pub fn underlying(&self) -> &L {
        &self.underlying
    }

    /// Index-by-position order, left to right.
    pub fn column_index_order(&self) -> Vec<usize> {
        self.with_order(|order| order.to_vec())
    }

    fn current_order(underlying: &L) -> Vec<usize> {
        (0..underlying.column_count())
            .filter_map(|p| underlying.column_index_by_position(p))
            .collect()
    }

    fn ensure_current(&mut self) {
        if self.permutation.get_mut().len() != self.underlying.column_count() {
            let order = Self::current_order(&self.underlying);
            *self.permutation.get_mut() = order;
            *self.inverse.get_mut() = None;
        }
    }

    /// Read the permutation, resynchronizing it first when the layer
    /// below changed shape since the last access.
    fn with_order<T>(&self, f: impl FnOnce(&[usize]) -> T) -> T {
        let mut permutation = self.permutation.borrow_mut();
        if permutation.len() != self.underlying.column_count() {
            *permutation = Self::current_order(&self.underlying);
            *self.inverse.borrow_mut() = None;
        }
        f(&permutation)
    }

    fn with_inverse<T>(&self, f: impl FnOnce(&FxHashMap<usize, usize>) -> T) -> T {
        self.with_order(|order| {
            let mut inverse = self.inverse.borrow_mut();
            let inverse = inverse.get_or_insert_with(|| {
                order
                    .iter()
                    .enumerate()
                    .map(|(position, &index)| (index, position))
                    .collect()
            });
            f(inverse)
        })
    }

    /// Move the column at `from` so it lands at `to`.
    ///
    /// Returns `false` (and leaves the order unchanged) when either
    /// position is out of range. `to` may equal the column count, meaning
    /// the right edge.
    pub fn reorder_column_position(&mut self, from: usize, to: usize) -> bool {
        self.ensure_current();
        let permutation = self.permutation.get_mut();
        let count = permutation.len();
        if from >= count || to > count {
            return false;
        }
        let insert_at = if to > from { to - 1 } else { to };
        let index = permutation.remove(from);
        permutation.insert(insert_at, index);
        *self.inverse.get_mut() = None;
        let event = ColumnReorderEvent::new(self.base.id(), vec![from], to);
        self.base.fire(Box::new(event));
        true
    }

    /// Move the columns at `from_positions` (any order) to `to`, keeping
    /// their left-to-right order.
    pub fn reorder_multiple_column_positions(
        &mut self,
        from_positions: &[usize],
        to: usize,
    ) -> bool {
        self.ensure_current();
        let permutation = self.permutation.get_mut();
        let count = permutation.len();
        if to > count || from_positions.iter().any(|&p| p >= count) {
            return false;
        }
        let mut froms: Vec<usize> = from_positions.to_vec();
        froms.sort_unstable();
        froms.dedup();
        if froms.is_empty() {
            return false;
        }
        // Extract in ascending position order, then reinsert as one block.
        let moved: Vec<usize> = froms.iter().map(|&p| permutation[p]).collect();
        for &p in froms.iter().rev() {
            permutation.remove(p);
        }
        let shift = froms.iter().filter(|&&p| p < to).count();
        let insert_at = (to - shift).min(permutation.len());
        for (offset, &index) in moved.iter().enumerate() {
            permutation.insert(insert_at + offset, index);
        }
        *self.inverse.get_mut() = None;
        let event = ColumnReorderEvent::new(self.base.id(), froms, to);
        self.base.fire(Box::new(event));
        true
    }

    fn pull_underlying_events(&mut self) {
        let events = self.underlying.drain_events();
        if events.is_empty() {
            return;
        }
        for mut event in events {
            if event.convert_to_local(&*self) {
                self.base.fire(event);
            } else {
                tracing::trace!("event not representable in reorder frame; dropped");
            }
        }
    }
}

impl<L: Layer> Layer for ColumnReorderLayer<L> {
    fn id(&self) -> LayerId {
        self.base.id()
    }

    fn column_count(&self) -> usize {
        self.underlying.column_count()
    }

    fn row_count(&self) -> usize {
        self.underlying.row_count()
    }

    fn column_index_by_position(&self, position: usize) -> Option<usize> {
        self.with_order(|order| order.get(position).copied())
    }

    fn column_position_by_index(&self, index: usize) -> Option<usize> {
        self.with_inverse(|inverse| inverse.get(&index).copied())
    }

    fn row_index_by_position(&self, position: usize) -> Option<usize> {
        self.underlying.row_index_by_position(position)
    }

    fn row_position_by_index(&self, index: usize) -> Option<usize> {
        self.underlying.row_position_by_index(index)
    }

    fn local_to_underlying_column_position(&self, position: usize) -> Option<usize> {
        let index = self.column_index_by_position(position)?;
        self.underlying.column_position_by_index(index)
    }

    fn underlying_to_local_column_position(&self, underlying_position: usize) -> Option<usize> {
        let index = self.underlying.column_index_by_position(underlying_position)?;
        self.column_position_by_index(index)
    }

    fn local_to_underlying_row_position(&self, position: usize) -> Option<usize> {
        (position < self.underlying.row_count()).then_some(position)
    }

    fn underlying_to_local_row_position(&self, underlying_position: usize) -> Option<usize> {
        (underlying_position < self.underlying.row_count()).then_some(underlying_position)
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
        self.underlying.row_height_by_position(position)
    }

    fn start_x_of_column_position(&self, position: usize) -> Option<u64> {
        if position > self.column_count() {
            return None;
        }
        (0..position).try_fold(0u64, |acc, p| {
            self.column_width_by_position(p).map(|w| acc + u64::from(w))
        })
    }

    fn start_y_of_row_position(&self, position: usize) -> Option<u64> {
        self.underlying.start_y_of_row_position(position)
    }

    fn do_command(&mut self, command: &mut dyn LayerCommand) -> bool {
        if let Some(handler) = self.base.handler_for(command.as_any().type_id())
            && handler.handle(self, command)
        {
            return true;
        }
        if let Some(cmd) = command.as_any().downcast_ref::<ColumnReorderCommand>() {
            if cmd.from.layer == self.base.id() && cmd.to.layer == self.base.id() {
                return self.reorder_column_position(cmd.from.position, cmd.to.position);
            }
        }
        if let Some(cmd) = command.as_any().downcast_ref::<MultiColumnReorderCommand>() {
            let mine = cmd.to.layer == self.base.id()
                && cmd.from.iter().all(|c| c.layer == self.base.id());
            if mine {
                let froms: Vec<usize> = cmd.from.iter().map(|c| c.position).collect();
                let to = cmd.to.position;
                return self.reorder_multiple_column_positions(&froms, to);
            }
        }
        if !command.convert_to_target_layer(&*self, &self.underlying) {
            tracing::debug!("command conversion failed at reorder boundary; dropped");
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

impl<L: Layer> std::fmt::Debug for ColumnReorderLayer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnReorderLayer")
            .field("id", &self.base.id())
            .field("order", &self.permutation.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnReorderCommand, ColumnReorderLayer};
    use crate::data::{DataLayer, VecDataProvider};
    use crate::layer::Layer;

    fn five_columns() -> ColumnReorderLayer<DataLayer<VecDataProvider<u32>>> {
        ColumnReorderLayer::new(DataLayer::new(VecDataProvider::new(5, 2)))
    }

    #[test]
    fn single_move_lands_before_the_original_target_element() {
        let mut layer = five_columns();
        assert!(layer.reorder_column_position(4, 1));
        assert_eq!(layer.column_index_order(), [0, 4, 1, 2, 3]);
        assert_eq!(layer.column_index_by_position(1), Some(4));
        assert_eq!(layer.column_position_by_index(4), Some(1));
        assert_eq!(layer.column_position_by_index(1), Some(2));
    }

    #[test]
    fn rightward_move_accounts_for_the_removal_shift() {
        let mut layer = five_columns();
        assert!(layer.reorder_column_position(1, 3));
        assert_eq!(layer.column_index_order(), [0, 2, 1, 3, 4]);
    }

    #[test]
    fn move_to_count_appends_at_the_right_edge() {
        let mut layer = five_columns();
        assert!(layer.reorder_column_position(0, 5));
        assert_eq!(layer.column_index_order(), [1, 2, 3, 4, 0]);
    }

    #[test]
    fn out_of_range_moves_are_rejected() {
        let mut layer = five_columns();
        assert!(!layer.reorder_column_position(5, 0));
        assert!(!layer.reorder_column_position(0, 6));
        assert_eq!(layer.column_index_order(), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn multi_move_preserves_relative_order() {
        let mut layer = five_columns();
        assert!(layer.reorder_multiple_column_positions(&[3, 1], 0));
        assert_eq!(layer.column_index_order(), [1, 3, 0, 2, 4]);
    }

    #[test]
    fn multi_move_rightward() {
        let mut layer = five_columns();
        assert!(layer.reorder_multiple_column_positions(&[0, 1], 4));
        assert_eq!(layer.column_index_order(), [2, 3, 0, 1, 4]);
    }

    #[test]
    fn reorder_via_command() {
        let mut layer = five_columns();
        let mut cmd = ColumnReorderCommand::new(layer.id(), 4, 1);
        assert!(layer.do_command(&mut cmd));
        assert_eq!(layer.column_index_order(), [0, 4, 1, 2, 3]);
    }

    #[test]
    fn command_in_foreign_frame_is_dropped_without_effect() {
        let mut layer = five_columns();
        let foreign = crate::coordinate::LayerId::next();
        let mut cmd = ColumnReorderCommand::new(foreign, 4, 1);
        assert!(!layer.do_command(&mut cmd));
        assert_eq!(layer.column_index_order(), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn structural_change_below_resets_the_order_on_the_next_read() {
        let mut layer = ColumnReorderLayer::new(crate::hideshow::ColumnHideShowLayer::new(
            DataLayer::new(VecDataProvider::<u32>::new(5, 2)),
        ));
        assert!(layer.reorder_column_position(4, 1));

        // Hide one column in the layer below via command descent.
        let mut hide = crate::hideshow::MultiColumnHideCommand::new(layer.id(), &[0]);
        assert!(layer.do_command(&mut hide));

        assert_eq!(layer.column_count(), 4);
        assert_eq!(layer.column_index_by_position(4), None);
        assert_eq!(layer.column_index_order(), [1, 2, 3, 4]);
        assert_eq!(layer.column_position_by_index(0), None);
    }

    #[test]
    fn widths_follow_the_underlying_position_not_the_index() {
        let mut layer = five_columns();
        let mut resize = crate::resize::ColumnResizeCommand::new(layer.id(), 0, 60);
        assert!(layer.do_command(&mut resize));
        // Sizes are keyed by position in the data layer: after reorder the
        // 60px width stays at underlying position 0, which index 0 still
        // occupies down there, so it travels with index 0 here.
        layer.reorder_column_position(0, 5);
        assert_eq!(layer.column_index_by_position(4), Some(0));
        assert_eq!(layer.column_width_by_position(4), Some(60));
        assert_eq!(layer.column_width_by_position(0), Some(100));
    }
}
