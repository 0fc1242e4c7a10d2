#![forbid(unsafe_code)]

//! Layer stack: position/index mapping, commands, and events.
//!
//! A grid is a stack of [`Layer`]s. The base [`DataLayer`] owns cell
//! values and sizes; each transformation layer above it (hide/show,
//! reorder, viewport, header) rewrites the coordinate space of the layer
//! beneath. Two coordinate vocabularies run through the stack:
//!
//! - **index** — a column/row's stable identity at the base layer,
//! - **position** — its current visible offset in one layer's frame.
//!
//! Commands descend the stack, converting their position coordinates at
//! each boundary until some layer handles them; events ascend, converting
//! the other way. A coordinate that is not representable in the next frame
//! (hidden, scrolled out) fails conversion and the command or event is
//! dropped whole.
//!
//! ```
//! use stratum_layers::{
//!     ColumnHideShowLayer, ColumnReorderLayer, DataLayer, Layer, VecDataProvider,
//! };
//!
//! let data = DataLayer::new(VecDataProvider::<u32>::new(5, 3));
//! let mut stack = ColumnHideShowLayer::new(ColumnReorderLayer::new(data));
//! stack.hide_column_positions(&[1, 3]);
//! assert_eq!(stack.column_count(), 3);
//! assert_eq!(stack.column_index_by_position(1), Some(2));
//! ```

pub mod command;
pub mod conflation;
pub mod coordinate;
pub mod data;
pub mod event;
pub mod header;
pub mod hideshow;
pub mod layer;
pub mod reorder;
pub mod resize;
pub mod sort;
pub mod viewport;

pub use command::{LayerCommand, VisualRefreshCommand};
pub use conflation::{ApplyTask, ConflaterChain, ConflaterHandle, EventConflater};
pub use coordinate::{CellCoordinate, ColumnPositionCoordinate, LayerId, RowPositionCoordinate};
pub use data::{DataLayer, DataProvider, DataUpdateError, UpdateDataCommand, VecDataProvider};
pub use event::{
    CellUpdateEvent, ColumnReorderEvent, ColumnResizeEvent, HideColumnsEvent, LayerEvent,
    RowResizeEvent, ShowColumnsEvent, VisualRefreshEvent,
};
pub use header::{ColumnHeaderLayer, RenameColumnHeaderCommand};
pub use hideshow::{
    ColumnHideShowLayer, MultiColumnHideCommand, ShowAllColumnsCommand, ShowColumnsCommand,
};
pub use layer::{Layer, LayerCommandHandler, LayerListener};
pub use reorder::{ColumnReorderCommand, ColumnReorderLayer, MultiColumnReorderCommand};
pub use resize::{ColumnResizeCommand, MultiColumnResizeCommand, RowResizeCommand};
pub use sort::{SortDirection, SortModel};
pub use viewport::ViewportLayer;
