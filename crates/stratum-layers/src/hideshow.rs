#![forbid(unsafe_code)]

//! Column hide/show transformation layer.
//!
//! [`ColumnHideShowLayer`] filters the underlying column space through a
//! set of hidden **indexes**. Indexes, not positions: the hidden set stays
//! correct when a reorder elsewhere in the stack shuffles positions.
//!
//! Conceptually, position `p` maps to "the p-th non-hidden index in
//! underlying order". That walk is cached as a position→index array (plus
//! its inverse) and the cache is invalidated on any hide/show mutation or
//! structural change below, keeping queries O(1) amortized.
//!
//! # Invariants
//!
//! 1. `column_position_by_index(column_index_by_position(p)) == p` for
//!    every visible position `p`.
//! 2. `column_index_by_position(p)` is `None` for `p >= column_count()`.
//! 3. Hiding an already-hidden column is idempotent.
//! 4. Hiding everything yields `column_count() == 0`; further hides are
//!    no-ops.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use ahash::HashSet;
use rustc_hash::FxHashMap;
use stratum_core::{Persistable, Properties};

use crate::command::LayerCommand;
use crate::coordinate::{ColumnPositionCoordinate, LayerId};
use crate::event::{
    ColumnReorderEvent, HideColumnsEvent, LayerEvent, ShowColumnsEvent,
};
use crate::layer::{Layer, LayerBase, LayerCommandHandler, LayerListener};

const KEY_HIDDEN_COLUMN_INDEXES: &str = "hiddenColumnIndexes";

/// Hide columns at the given positions (in the receiving layer's frame).
///
/// Conversion is all-or-nothing: if any position cannot be represented in
/// the next frame the whole command is dropped.
#[derive(Debug, Clone)]
pub struct MultiColumnHideCommand {
    coordinates: Vec<ColumnPositionCoordinate>,
}

impl MultiColumnHideCommand {
    pub fn new(layer: LayerId, positions: &[usize]) -> Self {
        Self {
            coordinates: positions
                .iter()
                .map(|&p| ColumnPositionCoordinate::new(layer, p))
                .collect(),
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.coordinates.iter().map(|c| c.position)
    }
}

impl LayerCommand for MultiColumnHideCommand {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        let mut converted = self.coordinates.clone();
        for coordinate in &mut converted {
            if !crate::command::convert_column_coordinate(coordinate, source, target) {
                return false;
            }
        }
        self.coordinates = converted;
        true
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Show columns by stable index. Context-free: indexes are frame-invariant.
#[derive(Debug, Clone)]
pub struct ShowColumnsCommand {
    pub indexes: Vec<usize>,
}

impl ShowColumnsCommand {
    pub fn new(indexes: Vec<usize>) -> Self {
        Self { indexes }
    }
}

impl LayerCommand for ShowColumnsCommand {
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

/// Clear the hidden set entirely. Context-free.
#[derive(Debug, Clone, Default)]
pub struct ShowAllColumnsCommand;

impl ShowAllColumnsCommand {
    pub fn new() -> Self {
        Self
    }
}

impl LayerCommand for ShowAllColumnsCommand {
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

struct MappingCache {
    position_to_index: Vec<usize>,
    index_to_position: FxHashMap<usize, usize>,
    /// Underlying column count the cache was built against; a mismatch
    /// marks the cache stale.
    underlying_count: usize,
}

/// Hide/show transformation over one underlying layer.
pub struct ColumnHideShowLayer<L: Layer> {
    base: LayerBase,
    underlying: L,
    hidden: HashSet<usize>,
    cache: RefCell<Option<MappingCache>>,
}

impl<L: Layer> ColumnHideShowLayer<L> {
    pub fn new(underlying: L) -> Self {
        Self {
            base: LayerBase::new(),
            underlying,
            hidden: HashSet::default(),
            cache: RefCell::new(None),
        }
    }

    pub fn underlying(&self) -> &L {
        &self.underlying
    }

    /// Hidden indexes, ascending.
    pub fn hidden_column_indexes(&self) -> Vec<usize> {
        let mut indexes: Vec<usize> = self.hidden.iter().copied().collect();
        indexes.sort_unstable();
        indexes
    }

    pub fn is_column_index_hidden(&self, index: usize) -> bool {
        self.hidden.contains(&index)
    }

    /// Hide the columns currently at `positions`.
    ///
    /// Positions are resolved to indexes *before* anything is hidden; the
    /// hide event carries those before-state positions. Unresolvable
    /// positions (out of range) are skipped.
    pub fn hide_column_positions(&mut self, positions: &[usize]) {
        let resolved: Vec<(usize, usize)> = positions
            .iter()
            .filter_map(|&p| self.column_index_by_position(p).map(|index| (p, index)))
            .collect();
        if resolved.is_empty() {
            return;
        }
        for &(_, index) in &resolved {
            self.hidden.insert(index);
        }
        self.invalidate();
        let before_positions = resolved.iter().map(|&(p, _)| p).collect();
        let event = HideColumnsEvent::new(self.base.id(), before_positions);
        self.base.fire(Box::new(event));
    }

    /// Make the given indexes visible again.
    pub fn show_column_indexes(&mut self, indexes: &[usize]) {
        let shown: Vec<usize> = indexes
            .iter()
            .filter(|index| self.hidden.remove(index))
            .copied()
            .collect();
        if shown.is_empty() {
            return;
        }
        self.invalidate();
        self.fire_show_event(&shown);
    }

    /// Clear the hidden set entirely.
    pub fn show_all_columns(&mut self) {
        if self.hidden.is_empty() {
            return;
        }
        let shown: Vec<usize> = self.hidden.drain().collect();
        self.invalidate();
        self.fire_show_event(&shown);
    }

    /// Fire a show event carrying the restored (after-state) positions.
    fn fire_show_event(&mut self, shown_indexes: &[usize]) {
        let positions: Vec<usize> = shown_indexes
            .iter()
            .filter_map(|&index| self.column_position_by_index(index))
            .collect();
        let event = ShowColumnsEvent::new(self.base.id(), positions);
        self.base.fire(Box::new(event));
    }

    fn invalidate(&mut self) {
        *self.cache.get_mut() = None;
    }

    fn with_cache<T>(&self, f: impl FnOnce(&MappingCache) -> T) -> T {
        let mut cache = self.cache.borrow_mut();
        if let Some(existing) = &*cache
            && existing.underlying_count != self.underlying.column_count()
        {
            *cache = None;
        }
        let cache = cache.get_or_insert_with(|| self.build_cache());
        f(cache)
    }

    fn build_cache(&self) -> MappingCache {
        let underlying_count = self.underlying.column_count();
        let mut position_to_index =
            Vec::with_capacity(underlying_count.saturating_sub(self.hidden.len()));
        let mut index_to_position = FxHashMap::default();
        for underlying_position in 0..underlying_count {
            if let Some(index) = self.underlying.column_index_by_position(underlying_position)
                && !self.hidden.contains(&index)
            {
                index_to_position.insert(index, position_to_index.len());
                position_to_index.push(index);
            }
        }
        MappingCache {
            position_to_index,
            index_to_position,
            underlying_count,
        }
    }

    fn pull_underlying_events(&mut self) {
        let events = self.underlying.drain_events();
        if events.is_empty() {
            return;
        }
        let structural = events.iter().any(|event| {
            let any = event.as_any();
            any.is::<ColumnReorderEvent>()
                || any.is::<HideColumnsEvent>()
                || any.is::<ShowColumnsEvent>()
        });
        if structural {
            self.invalidate();
        }
        for mut event in events {
            if event.convert_to_local(&*self) {
                self.base.fire(event);
            } else {
                tracing::trace!("event not representable in hide/show frame; dropped");
            }
        }
    }
}

impl<L: Layer> Layer for ColumnHideShowLayer<L> {
    fn id(&self) -> LayerId {
        self.base.id()
    }

    fn column_count(&self) -> usize {
        self.with_cache(|c| c.position_to_index.len())
    }

    fn row_count(&self) -> usize {
        self.underlying.row_count()
    }

    fn column_index_by_position(&self, position: usize) -> Option<usize> {
        self.with_cache(|c| c.position_to_index.get(position).copied())
    }

    fn column_position_by_index(&self, index: usize) -> Option<usize> {
        self.with_cache(|c| c.index_to_position.get(&index).copied())
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
        // Hidden columns take no space, so offsets are sums of the visible
        // widths to the left. Width lookups are O(1) against the cache.
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
        if let Some(cmd) = command.as_any().downcast_ref::<MultiColumnHideCommand>() {
            let mine = cmd
                .coordinates
                .iter()
                .all(|coordinate| coordinate.layer == self.base.id());
            if mine {
                let positions: Vec<usize> = cmd.positions().collect();
                self.hide_column_positions(&positions);
                return true;
            }
        }
        if let Some(cmd) = command.as_any().downcast_ref::<ShowColumnsCommand>() {
            let indexes = cmd.indexes.clone();
            self.show_column_indexes(&indexes);
            return true;
        }
        if command.as_any().is::<ShowAllColumnsCommand>() {
            self.show_all_columns();
            return true;
        }
        if !command.convert_to_target_layer(&*self, &self.underlying) {
            tracing::debug!("command conversion failed at hide/show boundary; dropped");
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

impl<L: Layer> Persistable for ColumnHideShowLayer<L> {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        let key = format!("{prefix}.{KEY_HIDDEN_COLUMN_INDEXES}");
        if self.hidden.is_empty() {
            properties.remove(&key);
            return;
        }
        let value = self
            .hidden_column_indexes()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        properties.set(key, value);
    }

    fn load_state(&mut self, prefix: &str, properties: &Properties) {
        self.hidden.clear();
        if let Some(value) = properties.get(&format!("{prefix}.{KEY_HIDDEN_COLUMN_INDEXES}")) {
            for token in value.split(',').filter(|t| !t.is_empty()) {
                match token.trim().parse() {
                    Ok(index) => {
                        self.hidden.insert(index);
                    }
                    Err(_) => {
                        tracing::warn!(token, "skipping malformed hidden column index");
                    }
                }
            }
        }
        self.invalidate();
    }
}

impl<L: Layer> std::fmt::Debug for ColumnHideShowLayer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnHideShowLayer")
            .field("id", &self.base.id())
            .field("hidden", &self.hidden_column_indexes())
            .finish()
    }
}
