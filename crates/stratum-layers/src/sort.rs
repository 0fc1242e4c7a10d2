#![forbid(unsafe_code)]

//! Per-column sort state.
//!
//! [`SortModel`] records which columns participate in sorting, in the order
//! the user added them, together with each column's direction and its rank
//! in the overall sort sequence. The model holds state only; applying the
//! sort to row order is the data layer's concern.
//!
//! Persisted under `.sortingState` as `index:ASC|DESC:order|...` in
//! insertion order. The key is absent when nothing is sorted.

use stratum_core::{Persistable, Properties};

const SORTING_STATE_KEY: &str = ".sortingState";

/// Direction of a column sort. `None` means the column is unsorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortDirection {
    /// Persistence token, `None` for the unsorted direction (which is never
    /// written).
    pub const fn token(self) -> Option<&'static str> {
        match self {
            SortDirection::None => None,
            SortDirection::Ascending => Some("ASC"),
            SortDirection::Descending => Some("DESC"),
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ASC" => Some(SortDirection::Ascending),
            "DESC" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SortEntry {
    index: usize,
    direction: SortDirection,
    order: usize,
}

/// Insertion-ordered multi-column sort state.
#[derive(Debug, Clone, Default)]
pub struct SortModel {
    entries: Vec<SortEntry>,
}

impl SortModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort a column.
    ///
    /// With `accumulate` the column joins the existing sort sequence (or
    /// updates its direction in place, keeping its rank); without it the
    /// column becomes the only sorted one. Passing
    /// [`SortDirection::None`] removes the column from the sequence.
    pub fn sort(&mut self, index: usize, direction: SortDirection, accumulate: bool) {
        if !accumulate {
            self.entries.clear();
        }
        if direction == SortDirection::None {
            self.unsort(index);
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.index == index) {
            entry.direction = direction;
            return;
        }
        let order = self.entries.len();
        self.entries.push(SortEntry {
            index,
            direction,
            order,
        });
    }

    /// Remove one column from the sort sequence, re-ranking the rest.
    pub fn unsort(&mut self, index: usize) {
        let Some(removed) = self.entries.iter().find(|e| e.index == index).map(|e| e.order)
        else {
            return;
        };
        self.entries.retain(|e| e.index != index);
        for entry in &mut self.entries {
            if entry.order > removed {
                entry.order -= 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_sorted(&self, index: usize) -> bool {
        self.entries.iter().any(|e| e.index == index)
    }

    /// Direction of a column, `SortDirection::None` when unsorted.
    pub fn sort_direction(&self, index: usize) -> SortDirection {
        self.entries
            .iter()
            .find(|e| e.index == index)
            .map_or(SortDirection::None, |e| e.direction)
    }

    /// Rank of a column in the sort sequence, `None` when unsorted.
    pub fn sort_order(&self, index: usize) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.index == index)
            .map(|e| e.order)
    }

    /// Sorted column indexes in insertion order.
    pub fn sorted_column_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.index)
    }

    pub fn sorted_column_count(&self) -> usize {
        self.entries.len()
    }
}

impl Persistable for SortModel {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        let key = format!("{prefix}{SORTING_STATE_KEY}");
        if self.entries.is_empty() {
            properties.remove(&key);
            return;
        }
        let mut value = String::new();
        for entry in &self.entries {
            if let Some(token) = entry.direction.token() {
                value.push_str(&format!("{}:{}:{}|", entry.index, token, entry.order));
            }
        }
        properties.set(key, value);
    }

    fn load_state(&mut self, prefix: &str, properties: &Properties) {
        self.entries.clear();
        let key = format!("{prefix}{SORTING_STATE_KEY}");
        let Some(value) = properties.get(&key) else {
            return;
        };
        for token in value.split('|').filter(|t| !t.is_empty()) {
            let mut parts = token.split(':');
            let parsed = match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(index), Some(direction), Some(order), None) => index
                    .parse::<usize>()
                    .ok()
                    .zip(SortDirection::from_token(direction))
                    .zip(order.parse::<usize>().ok()),
                _ => None,
            };
            match parsed {
                Some(((index, direction), order)) => self.entries.push(SortEntry {
                    index,
                    direction,
                    order,
                }),
                None => tracing::warn!(token, "malformed sorting-state entry; skipped"),
            }
        }
    }
}
