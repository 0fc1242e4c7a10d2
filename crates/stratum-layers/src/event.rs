#![forbid(unsafe_code)]

//! Layer events and bottom-up frame conversion.
//!
//! Events describe structural or visual change in the frame of the layer
//! that fired them. As an event ascends the stack, each enclosing layer
//! calls [`LayerEvent::convert_to_local`] to rewrite its positions into its
//! own frame. Positions that are not representable there (hidden, scrolled
//! out) are removed; an event left with nothing to say fails conversion and
//! is dropped — the change is simply not visible in that frame.
//!
//! Conversion mutates the event in place, which is safe because ascent
//! clones per boundary where fan-out is needed and each layer owns the
//! boxed event it is converting.

use std::any::Any;

use stratum_core::Range;

use crate::coordinate::LayerId;
use crate::layer::Layer;

/// A structural or visual change notification.
pub trait LayerEvent: 'static {
    /// Rewrite the event's coordinates into `local_layer`'s frame.
    ///
    /// Returns `false` if the change is not representable there; the caller
    /// must then drop the event.
    fn convert_to_local(&mut self, local_layer: &dyn Layer) -> bool;

    /// Frame the event is currently expressed in.
    fn layer(&self) -> LayerId;

    fn clone_event(&self) -> Box<dyn LayerEvent>;

    fn as_any(&self) -> &dyn Any;
}

/// Collapse a sorted position list into maximal contiguous ranges.
pub(crate) fn positions_to_ranges(mut positions: Vec<usize>) -> Vec<Range> {
    positions.sort_unstable();
    positions.dedup();
    let mut ranges: Vec<Range> = Vec::new();
    for position in positions {
        match ranges.last_mut() {
            Some(last) if last.end == position => last.end += 1,
            _ => ranges.push(Range::new(position, position + 1)),
        }
    }
    ranges
}

/// Map every position in `ranges` through `map`, dropping unmappable ones.
fn convert_ranges(ranges: &[Range], map: impl Fn(usize) -> Option<usize>) -> Vec<Range> {
    let converted: Vec<usize> = ranges
        .iter()
        .flat_map(|r| r.iter())
        .filter_map(&map)
        .collect();
    positions_to_ranges(converted)
}

macro_rules! column_range_event {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            layer: LayerId,
            position_ranges: Vec<Range>,
        }

        impl $name {
            pub fn new(layer: LayerId, positions: Vec<usize>) -> Self {
                Self {
                    layer,
                    position_ranges: positions_to_ranges(positions),
                }
            }

            pub fn from_ranges(layer: LayerId, position_ranges: Vec<Range>) -> Self {
                Self {
                    layer,
                    position_ranges,
                }
            }

            /// Affected column positions, in the event's current frame.
            pub fn position_ranges(&self) -> &[Range] {
                &self.position_ranges
            }
        }

        impl LayerEvent for $name {
            fn convert_to_local(&mut self, local_layer: &dyn Layer) -> bool {
                let converted = convert_ranges(&self.position_ranges, |p| {
                    local_layer.underlying_to_local_column_position(p)
                });
                if converted.is_empty() {
                    return false;
                }
                self.position_ranges = converted;
                self.layer = local_layer.id();
                true
            }

            fn layer(&self) -> LayerId {
                self.layer
            }

            fn clone_event(&self) -> Box<dyn LayerEvent> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

column_range_event!(
    /// Columns were hidden. Carries the affected **before-state** positions
    /// (the positions the columns occupied when the hide was issued).
    HideColumnsEvent
);

column_range_event!(
    /// Previously hidden columns became visible again. Carries the restored
    /// positions in the after-state frame.
    ShowColumnsEvent
);

column_range_event!(
    /// Column widths changed at the given positions.
    ColumnResizeEvent
);

/// Row heights changed at the given positions.
#[derive(Debug, Clone)]
pub struct RowResizeEvent {
    layer: LayerId,
    position_ranges: Vec<Range>,
}

impl RowResizeEvent {
    pub fn new(layer: LayerId, positions: Vec<usize>) -> Self {
        Self {
            layer,
            position_ranges: positions_to_ranges(positions),
        }
    }

    pub fn position_ranges(&self) -> &[Range] {
        &self.position_ranges
    }
}

impl LayerEvent for RowResizeEvent {
    fn convert_to_local(&mut self, local_layer: &dyn Layer) -> bool {
        let converted = convert_ranges(&self.position_ranges, |p| {
            local_layer.underlying_to_local_row_position(p)
        });
        if converted.is_empty() {
            return false;
        }
        self.position_ranges = converted;
        self.layer = local_layer.id();
        true
    }

    fn layer(&self) -> LayerId {
        self.layer
    }

    fn clone_event(&self) -> Box<dyn LayerEvent> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A column block moved. `from_ranges` are the pre-move positions of the
/// moved columns, `to_position` the insertion point, both in the firing
/// layer's frame.
#[derive(Debug, Clone)]
pub struct ColumnReorderEvent {
    layer: LayerId,
    from_ranges: Vec<Range>,
    to_position: usize,
}

impl ColumnReorderEvent {
    pub fn new(layer: LayerId, from_positions: Vec<usize>, to_position: usize) -> Self {
        Self {
            layer,
            from_ranges: positions_to_ranges(from_positions),
            to_position,
        }
    }

    pub fn from_ranges(&self) -> &[Range] {
        &self.from_ranges
    }

    pub fn to_position(&self) -> usize {
        self.to_position
    }
}

impl LayerEvent for ColumnReorderEvent {
    fn convert_to_local(&mut self, local_layer: &dyn Layer) -> bool {
        let from = convert_ranges(&self.from_ranges, |p| {
            local_layer.underlying_to_local_column_position(p)
        });
        let Some(to) = local_layer.underlying_to_local_column_position(self.to_position) else {
            return false;
        };
        if from.is_empty() {
            return false;
        }
        self.from_ranges = from;
        self.to_position = to;
        self.layer = local_layer.id();
        true
    }

    fn layer(&self) -> LayerId {
        self.layer
    }

    fn clone_event(&self) -> Box<dyn LayerEvent> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A single cell's value changed.
#[derive(Debug, Clone)]
pub struct CellUpdateEvent {
    layer: LayerId,
    column_position: usize,
    row_position: usize,
}

impl CellUpdateEvent {
    pub fn new(layer: LayerId, column_position: usize, row_position: usize) -> Self {
        Self {
            layer,
            column_position,
            row_position,
        }
    }

    pub fn column_position(&self) -> usize {
        self.column_position
    }

    pub fn row_position(&self) -> usize {
        self.row_position
    }
}

impl LayerEvent for CellUpdateEvent {
    fn convert_to_local(&mut self, local_layer: &dyn Layer) -> bool {
        let (Some(column), Some(row)) = (
            local_layer.underlying_to_local_column_position(self.column_position),
            local_layer.underlying_to_local_row_position(self.row_position),
        ) else {
            return false;
        };
        self.column_position = column;
        self.row_position = row;
        self.layer = local_layer.id();
        true
    }

    fn layer(&self) -> LayerId {
        self.layer
    }

    fn clone_event(&self) -> Box<dyn LayerEvent> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Everything may have changed; repaint. Carries no positions, so it
/// converts successfully through every frame.
#[derive(Debug, Clone)]
pub struct VisualRefreshEvent {
    layer: LayerId,
}

impl VisualRefreshEvent {
    pub fn new(layer: LayerId) -> Self {
        Self { layer }
    }
}

impl LayerEvent for VisualRefreshEvent {
    fn convert_to_local(&mut self, local_layer: &dyn Layer) -> bool {
        self.layer = local_layer.id();
        true
    }

    fn layer(&self) -> LayerId {
        self.layer
    }

    fn clone_event(&self) -> Box<dyn LayerEvent> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
