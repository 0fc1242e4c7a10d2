#![forbid(unsafe_code)]

//! Column header layer with user-renamed labels.
//!
//! Renamed labels are keyed by column **index**, so a custom name stays
//! with its column through reordering and hide/show. Rename requests
//! arrive position-addressed and are resolved to an index at the moment
//! they are applied.
//!
//! Persisted under `.renamedColumnHeaders` as `index:name|...` in
//! ascending index order. `|` and `:` inside names are not escaped; names
//! containing them will not round-trip.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use stratum_core::{Persistable, Properties};

use crate::command::LayerCommand;
use crate::coordinate::{ColumnPositionCoordinate, LayerId};
use crate::event::{LayerEvent, VisualRefreshEvent};
use crate::layer::{Layer, LayerBase, LayerCommandHandler, LayerListener};

const RENAMED_HEADERS_KEY: &str = ".renamedColumnHeaders";

/// Rename the column at a position, or clear its custom name with `None`.
#[derive(Debug, Clone)]
pub struct RenameColumnHeaderCommand {
    pub coordinate: ColumnPositionCoordinate,
    pub custom_name: Option<String>,
}

impl RenameColumnHeaderCommand {
    pub fn new(layer: LayerId, position: usize, custom_name: Option<String>) -> Self {
        Self {
            coordinate: ColumnPositionCoordinate::new(layer, position),
            custom_name,
        }
    }
}

impl LayerCommand for RenameColumnHeaderCommand {
    fn convert_to_target_layer(&mut self, source: &dyn Layer, target: &dyn Layer) -> bool {
        crate::command::convert_column_coordinate(&mut self.coordinate, source, target)
    }

    fn clone_command(&self) -> Box<dyn LayerCommand> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Header band over the body's column space.
///
/// Mapping is the identity over the underlying layer; the layer only adds
/// label ownership on top.
pub struct ColumnHeaderLayer<L: Layer> {
    base: LayerBase,
    underlying: L,
    renamed: BTreeMap<usize, String>,
}

impl<L: Layer> ColumnHeaderLayer<L> {
    pub fn new(underlying: L) -> Self {
        Self {
            base: LayerBase::new(),
            underlying,
            renamed: BTreeMap::new(),
        }
    }

    pub fn underlying(&self) -> &L {
        &self.underlying
    }

    /// The custom name stored for a column index, if any.
    pub fn renamed_label_by_index(&self, index: usize) -> Option<&str> {
        self.renamed.get(&index).map(String::as_str)
    }

    /// The custom name for the column currently at `position`.
    pub fn renamed_label_by_position(&self, position: usize) -> Option<&str> {
        let index = self.column_index_by_position(position)?;
        self.renamed_label_by_index(index)
    }

    pub fn is_renamed(&self, index: usize) -> bool {
        self.renamed.contains_key(&index)
    }

    /// Rename the column at `position`, or clear its name with `None`.
    ///
    /// Returns `false` when the position resolves to no column.
    pub fn rename_column_position(&mut self, position: usize, custom_name: Option<String>) -> bool {
        let Some(index) = self.column_index_by_position(position) else {
            return false;
        };
        self.rename_column_index(index, custom_name);
        true
    }

    /// Rename by stable index, bypassing position resolution.
    pub fn rename_column_index(&mut self, index: usize, custom_name: Option<String>) {
        match custom_name {
            Some(name) => {
                self.renamed.insert(index, name);
            }
            None => {
                self.renamed.remove(&index);
            }
        }
        let event = VisualRefreshEvent::new(self.base.id());
        self.base.fire(Box::new(event));
    }

    fn pull_underlying_events(&mut self) {
        let events = self.underlying.drain_events();
        for mut event in events {
            if event.convert_to_local(&*self) {
                self.base.fire(event);
            }
        }
    }
}

impl<L: Layer> Layer for ColumnHeaderLayer<L> {
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
        self.underlying.column_index_by_position(position)
    }

    fn column_position_by_index(&self, index: usize) -> Option<usize> {
        self.underlying.column_position_by_index(index)
    }

    fn row_index_by_position(&self, position: usize) -> Option<usize> {
        self.underlying.row_index_by_position(position)
    }

    fn row_position_by_index(&self, index: usize) -> Option<usize> {
        self.underlying.row_position_by_index(index)
    }

    fn local_to_underlying_column_position(&self, position: usize) -> Option<usize> {
        (position < self.underlying.column_count()).then_some(position)
    }

    fn underlying_to_local_column_position(&self, underlying_position: usize) -> Option<usize> {
        (underlying_position < self.underlying.column_count()).then_some(underlying_position)
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
        self.underlying.column_width_by_position(position)
    }

    fn row_height_by_position(&self, position: usize) -> Option<u32> {
        self.underlying.row_height_by_position(position)
    }

    fn start_x_of_column_position(&self, position: usize) -> Option<u64> {
        self.underlying.start_x_of_column_position(position)
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
        if let Some(rename) = command.as_any().downcast_ref::<RenameColumnHeaderCommand>()
            && rename.coordinate.layer == self.base.id()
        {
            let position = rename.coordinate.position;
            let custom_name = rename.custom_name.clone();
            return self.rename_column_position(position, custom_name);
        }
        if !command.convert_to_target_layer(&*self, &self.underlying) {
            tracing::debug!("command conversion failed at header layer; dropped");
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

impl<L: Layer> Persistable for ColumnHeaderLayer<L> {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        let key = format!("{prefix}{RENAMED_HEADERS_KEY}");
        if self.renamed.is_empty() {
            properties.remove(&key);
            return;
        }
        let mut value = String::new();
        for (index, name) in &self.renamed {
            value.push_str(&format!("{index}:{name}|"));
        }
        properties.set(key, value);
    }

    fn load_state(&mut self, prefix: &str, properties: &Properties) {
        self.renamed.clear();
        let key = format!("{prefix}{RENAMED_HEADERS_KEY}");
        let Some(value) = properties.get(&key) else {
            return;
        };
        for entry in value.split('|').filter(|e| !e.is_empty()) {
            let Some((index, name)) = entry.split_once(':') else {
                tracing::warn!(entry, "malformed renamed-header entry; skipped");
                continue;
            };
            match index.parse::<usize>() {
                Ok(index) => {
                    self.renamed.insert(index, name.to_string());
                }
                Err(_) => {
                    tracing::warn!(entry, "renamed-header entry has a bad index; skipped");
                }
            }
        }
    }
}

impl<L: Layer> std::fmt::Debug for ColumnHeaderLayer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnHeaderLayer")
            .field("id", &self.base.id())
            .field("renamed", &self.renamed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnHeaderLayer, RenameColumnHeaderCommand};
    use crate::data::{DataLayer, VecDataProvider};
    use crate::layer::Layer;
    use crate::reorder::ColumnReorderLayer;
    use stratum_core::{Persistable, Properties};

    fn header() -> ColumnHeaderLayer<ColumnReorderLayer<DataLayer<VecDataProvider<String>>>> {
        ColumnHeaderLayer::new(ColumnReorderLayer::new(DataLayer::new(VecDataProvider::new(
            6, 1,
        ))))
    }

    #[test]
    fn rename_resolves_position_to_index() {
        let mut layer = header();
        assert!(layer.rename_column_position(2, Some("Custom".to_string())));
        assert_eq!(layer.renamed_label_by_index(2), Some("Custom"));
        assert_eq!(layer.renamed_label_by_position(2), Some("Custom"));
    }

    #[test]
    fn renamed_label_follows_reorder() {
        let mut layer = header();
        layer.rename_column_position(2, Some("Custom".to_string()));
        let mut cmd = crate::reorder::ColumnReorderCommand::new(layer.id(), 2, 0);
        assert!(layer.do_command(&mut cmd));
        assert_eq!(layer.renamed_label_by_position(0), Some("Custom"));
        assert_eq!(layer.renamed_label_by_position(2), None);
    }

    #[test]
    fn rename_out_of_range_is_refused() {
        let mut layer = header();
        assert!(!layer.rename_column_position(99, Some("x".to_string())));
    }

    #[test]
    fn rename_command_is_handled_in_place() {
        let mut layer = header();
        let mut cmd = RenameColumnHeaderCommand::new(layer.id(), 1, Some("Via command".to_string()));
        assert!(layer.do_command(&mut cmd));
        assert_eq!(layer.renamed_label_by_index(1), Some("Via command"));
    }

    #[test]
    fn clearing_the_last_name_removes_the_key() {
        let mut layer = header();
        layer.rename_column_position(1, Some("One".to_string()));
        let mut props = Properties::new();
        layer.save_state("grid.header", &mut props);
        assert!(props.contains_key("grid.header.renamedColumnHeaders"));

        layer.rename_column_position(1, None);
        layer.save_state("grid.header", &mut props);
        assert!(!props.contains_key("grid.header.renamedColumnHeaders"));
    }

    #[test]
    fn persisted_format_is_index_ordered() {
        let mut layer = header();
        layer.rename_column_index(2, Some("Renamed 2".to_string()));
        layer.rename_column_index(1, Some("Renamed 1".to_string()));
        let mut props = Properties::new();
        layer.save_state("grid.header", &mut props);
        assert_eq!(
            props.get("grid.header.renamedColumnHeaders"),
            Some("1:Renamed 1|2:Renamed 2|")
        );
    }

    #[test]
    fn load_round_trips_and_skips_malformed_entries() {
        let mut props = Properties::new();
        props.set(
            "grid.header.renamedColumnHeaders".to_string(),
            "0:First|garbage|x:Bad|3:Fourth|".to_string(),
        );
        let mut layer = header();
        layer.load_state("grid.header", &props);
        assert_eq!(layer.renamed_label_by_index(0), Some("First"));
        assert_eq!(layer.renamed_label_by_index(3), Some("Fourth"));
        assert!(!layer.is_renamed(1));

        let mut saved = Properties::new();
        layer.save_state("grid.header", &mut saved);
        assert_eq!(
            saved.get("grid.header.renamedColumnHeaders"),
            Some("0:First|3:Fourth|")
        );
    }
}
