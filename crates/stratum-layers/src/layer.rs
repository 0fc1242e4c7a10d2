#![forbid(unsafe_code)]

//! The layer contract.
//!
//! Every layer exposes the same bidirectional coordinate mapping:
//!
//! - **position** — a 0-based offset into the layer's currently visible
//!   ordering (its local frame);
//! - **index** — the stable identity of a column/row in the underlying
//!   data, invariant under hide/show and reorder performed above it.
//!
//! Transformation layers wrap one underlying layer and rewrite positions on
//! the way down (commands) and back up (events). Absence is always
//! `Option::None` — a position out of range or an index that is currently
//! not visible is an expected outcome, never a panic.
//!
//! # Dispatch order
//!
//! [`Layer::do_command`] consults the registered handler registry first
//! (exact command type match), then the layer's built-in handling, and
//! finally converts the command into the underlying layer's frame and
//! forwards it. A failed conversion drops the command: `false` is returned
//! and the stack is untouched.
//!
//! # Event ascent
//!
//! Layers fire events synchronously to their listeners in registration
//! order and additionally retain each event in an outbox. The enclosing
//! layer drains the outbox after any call that may have mutated the inner
//! layer, converts each event into its own frame via
//! [`LayerEvent::convert_to_local`], drops the ones that are not
//! representable, and re-fires the rest.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use ahash::HashMap;

use crate::command::LayerCommand;
use crate::coordinate::LayerId;
use crate::event::LayerEvent;

/// Observer notified synchronously on structural/visual change.
pub trait LayerListener {
    fn handle_layer_event(&mut self, event: &dyn LayerEvent);
}

/// An externally registered command handler.
///
/// Handlers are stateless at the trait level; they mutate the layer they
/// were registered on through the `layer` argument (downcasting to the
/// concrete type they were written for).
pub trait LayerCommandHandler {
    /// The exact command type this handler consumes.
    fn command_type(&self) -> TypeId;

    /// Try to handle `command` on `layer`. Returns `true` if consumed.
    fn handle(&self, layer: &mut dyn Layer, command: &mut dyn LayerCommand) -> bool;
}

/// The polymorphic contract every layer implements.
pub trait Layer: 'static {
    fn id(&self) -> LayerId;

    // -----------------------------------------------------------------
    // Dimension queries
    // -----------------------------------------------------------------

    fn column_count(&self) -> usize;
    fn row_count(&self) -> usize;

    /// Stable index of the column at `position`, `None` if out of range.
    fn column_index_by_position(&self, position: usize) -> Option<usize>;
    /// Position of the column with stable index `index`, `None` if the
    /// index is hidden or does not exist.
    fn column_position_by_index(&self, index: usize) -> Option<usize>;
    fn row_index_by_position(&self, position: usize) -> Option<usize>;
    fn row_position_by_index(&self, index: usize) -> Option<usize>;

    // -----------------------------------------------------------------
    // Frame conversion (one boundary)
    // -----------------------------------------------------------------

    /// Rewrite a local column position into the underlying layer's frame.
    fn local_to_underlying_column_position(&self, position: usize) -> Option<usize>;
    /// Rewrite an underlying column position into this layer's frame.
    fn underlying_to_local_column_position(&self, underlying_position: usize) -> Option<usize>;
    fn local_to_underlying_row_position(&self, position: usize) -> Option<usize>;
    fn underlying_to_local_row_position(&self, underlying_position: usize) -> Option<usize>;

    /// The underlying layer responsible for `(column_position,
    /// row_position)`, `None` for base layers.
    fn underlying_layer_by_position(
        &self,
        column_position: usize,
        row_position: usize,
    ) -> Option<&dyn Layer>;

    // -----------------------------------------------------------------
    // Sizing
    // -----------------------------------------------------------------

    fn column_width_by_position(&self, position: usize) -> Option<u32>;
    fn row_height_by_position(&self, position: usize) -> Option<u32>;

    /// Cumulative pixel offset of the left edge of `position`.
    /// `position == column_count()` yields the total width.
    fn start_x_of_column_position(&self, position: usize) -> Option<u64>;
    fn start_y_of_row_position(&self, position: usize) -> Option<u64>;

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    /// Dispatch a command. Returns `true` iff some handler here or below
    /// consumed it.
    fn do_command(&mut self, command: &mut dyn LayerCommand) -> bool;
    fn register_command_handler(&mut self, handler: Rc<dyn LayerCommandHandler>);
    fn unregister_command_handler(&mut self, command_type: TypeId);

    // -----------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------

    fn add_layer_listener(&mut self, listener: Rc<RefCell<dyn LayerListener>>);
    /// Notify listeners synchronously and retain the event in the outbox.
    fn fire_layer_event(&mut self, event: Box<dyn LayerEvent>);
    /// Take every event fired since the last drain.
    fn drain_events(&mut self) -> Vec<Box<dyn LayerEvent>>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared plumbing embedded by every concrete layer: identity, handler
/// registry, listener list, event outbox.
pub struct LayerBase {
    id: LayerId,
    handlers: HashMap<TypeId, Rc<dyn LayerCommandHandler>>,
    listeners: Vec<Rc<RefCell<dyn LayerListener>>>,
    outbox: Vec<Box<dyn LayerEvent>>,
}

impl LayerBase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: LayerId::next(),
            handlers: HashMap::default(),
            listeners: Vec::new(),
            outbox: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn register_handler(&mut self, handler: Rc<dyn LayerCommandHandler>) {
        self.handlers.insert(handler.command_type(), handler);
    }

    pub fn unregister_handler(&mut self, command_type: TypeId) {
        self.handlers.remove(&command_type);
    }

    /// The registered handler for an exact command type, if any.
    pub fn handler_for(&self, command_type: TypeId) -> Option<Rc<dyn LayerCommandHandler>> {
        self.handlers.get(&command_type).cloned()
    }

    pub fn add_listener(&mut self, listener: Rc<RefCell<dyn LayerListener>>) {
        self.listeners.push(listener);
    }

    /// Fire synchronously, in listener-registration order, then retain the
    /// event for the enclosing layer to drain.
    pub fn fire(&mut self, event: Box<dyn LayerEvent>) {
        let listeners = self.listeners.clone();
        for listener in listeners {
            listener.borrow_mut().handle_layer_event(&*event);
        }
        self.outbox.push(event);
    }

    pub fn drain(&mut self) -> Vec<Box<dyn LayerEvent>> {
        std::mem::take(&mut self.outbox)
    }
}

impl Default for LayerBase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayerBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerBase")
            .field("id", &self.id)
            .field("handlers", &self.handlers.len())
            .field("listeners", &self.listeners.len())
            .field("outbox", &self.outbox.len())
            .finish()
    }
}
