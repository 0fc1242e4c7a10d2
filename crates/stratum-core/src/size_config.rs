#![forbid(unsafe_code)]

//! Per-index size configuration with cached aggregates.
//!
//! [`SizeConfig`] stores a uniform default size plus sparse per-index
//! overrides. It is designed for very large axes (millions of rows or
//! columns): nothing here ever materializes an array of length `n`.
//! The aggregate of the first `n` sizes is
//!
//! ```text
//! n * default_size + Σ (override − default_size)  for overridden index < n
//! ```
//!
//! computed from a prefix-delta cache over the sorted override map. The
//! cache is invalidated by any mutation and rebuilt lazily on the next
//! aggregate read.
//!
//! # Invariants
//!
//! 1. Effective size of an index = override if present, else the default.
//! 2. Effective resizability = per-index flag if present, else the default.
//! 3. `aggregate_size(n)` equals the sum of the first `n` effective sizes;
//!    `aggregate_size(0) == 0`.
//! 4. `is_all_positions_same_size()` holds iff no override is present.
//!
//! Reads go through `&self`, so the lazy cache lives in a `RefCell`. The
//! surrounding layer stack is single-threaded by contract, which is why no
//! lock is needed.

use std::cell::RefCell;
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::persist::{Persistable, Properties};

const KEY_DEFAULT_SIZE: &str = "defaultSize";
const KEY_RESIZABLE_DEFAULT: &str = "resizableByDefault";
const KEY_SIZES: &str = "sizes";
const KEY_RESIZABLE_INDEXES: &str = "resizableIndexes";

/// Sparse size overrides atop a uniform default size.
#[derive(Debug, Clone)]
pub struct SizeConfig {
    default_size: u32,
    /// Overrides sorted by index; range queries drive the aggregate cache.
    overrides: BTreeMap<usize, u32>,
    resizable_by_default: bool,
    resizable: FxHashMap<usize, bool>,
    /// `(index, cumulative delta through this index)` pairs, sorted by
    /// index. `None` = stale, rebuilt on next aggregate read.
    prefix_deltas: RefCell<Option<Vec<(usize, i64)>>>,
}

impl SizeConfig {
    /// Create a configuration where every index has `default_size`.
    pub fn new(default_size: u32) -> Self {
        Self {
            default_size,
            overrides: BTreeMap::new(),
            resizable_by_default: true,
            resizable: FxHashMap::default(),
            prefix_deltas: RefCell::new(None),
        }
    }

    /// The uniform default size.
    #[inline]
    pub fn default_size(&self) -> u32 {
        self.default_size
    }

    /// Replace the uniform default size.
    pub fn set_default_size(&mut self, size: u32) {
        self.default_size = size;
        self.invalidate();
    }

    /// Effective size of `index`: override if present, else the default.
    #[inline]
    pub fn size(&self, index: usize) -> u32 {
        self.overrides.get(&index).copied().unwrap_or(self.default_size)
    }

    /// Record a size override for `index`.
    pub fn set_size(&mut self, index: usize, size: u32) {
        self.overrides.insert(index, size);
        self.invalidate();
    }

    /// Remove the override for `index`, restoring the default.
    pub fn reset_size(&mut self, index: usize) {
        if self.overrides.remove(&index).is_some() {
            self.invalidate();
        }
    }

    /// Sum of the effective sizes of indices `[0, n)`.
    pub fn aggregate_size(&self, n: usize) -> u64 {
        if n == 0 {
            return 0;
        }
        let base = n as u64 * u64::from(self.default_size);
        let mut cache = self.prefix_deltas.borrow_mut();
        let deltas = cache.get_or_insert_with(|| self.build_prefix_deltas());
        // Cumulative delta of all overridden indices below n.
        let covered = deltas.partition_point(|&(index, _)| index < n);
        let delta = if covered == 0 { 0 } else { deltas[covered - 1].1 };
        // Effective sizes are non-negative, so the sum cannot go below 0.
        (base as i64 + delta).max(0) as u64
    }

    /// True iff no per-index override is present.
    #[inline]
    pub fn is_all_positions_same_size(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Default resizability for indices without a per-index flag.
    #[inline]
    pub fn is_resizable_by_default(&self) -> bool {
        self.resizable_by_default
    }

    /// Set the default resizability.
    pub fn set_resizable_by_default(&mut self, resizable: bool) {
        self.resizable_by_default = resizable;
        self.invalidate();
    }

    /// Effective resizability of `index`: per-index flag else the default.
    #[inline]
    pub fn is_position_resizable(&self, index: usize) -> bool {
        self.resizable
            .get(&index)
            .copied()
            .unwrap_or(self.resizable_by_default)
    }

    /// Record a per-index resizability flag.
    pub fn set_position_resizable(&mut self, index: usize, resizable: bool) {
        self.resizable.insert(index, resizable);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        *self.prefix_deltas.get_mut() = None;
    }

    fn build_prefix_deltas(&self) -> Vec<(usize, i64)> {
        let default = i64::from(self.default_size);
        let mut cumulative = 0i64;
        self.overrides
            .iter()
            .map(|(&index, &size)| {
                cumulative += i64::from(size) - default;
                (index, cumulative)
            })
            .collect()
    }
}

impl Persistable for SizeConfig {
    fn save_state(&self, prefix: &str, properties: &mut Properties) {
        properties.set(
            format!("{prefix}.{KEY_DEFAULT_SIZE}"),
            self.default_size.to_string(),
        );
        properties.set(
            format!("{prefix}.{KEY_RESIZABLE_DEFAULT}"),
            self.resizable_by_default.to_string(),
        );
        if !self.overrides.is_empty() {
            let mut value = String::new();
            for (index, size) in &self.overrides {
                value.push_str(&format!("{index}:{size},"));
            }
            properties.set(format!("{prefix}.{KEY_SIZES}"), value);
        }
        if !self.resizable.is_empty() {
            let mut flags: Vec<(usize, bool)> =
                self.resizable.iter().map(|(&i, &r)| (i, r)).collect();
            flags.sort_by_key(|&(i, _)| i);
            let mut value = String::new();
            for (index, resizable) in flags {
                value.push_str(&format!("{index}:{resizable},"));
            }
            properties.set(format!("{prefix}.{KEY_RESIZABLE_INDEXES}"), value);
        }
    }

    fn load_state(&mut self, prefix: &str, properties: &Properties) {
        if let Some(value) = properties.get(&format!("{prefix}.{KEY_DEFAULT_SIZE}"))
            && let Ok(size) = value.parse()
        {
            self.default_size = size;
        }
        if let Some(value) = properties.get(&format!("{prefix}.{KEY_RESIZABLE_DEFAULT}"))
            && let Ok(flag) = value.parse()
        {
            self.resizable_by_default = flag;
        }
        if let Some(value) = properties.get(&format!("{prefix}.{KEY_SIZES}")) {
            self.overrides.clear();
            // Malformed tokens are skipped; the rest still load.
            for token in value.split(',').filter(|t| !t.is_empty()) {
                if let Some((index, size)) = token.split_once(':')
                    && let (Ok(index), Ok(size)) = (index.parse(), size.parse())
                {
                    self.overrides.insert(index, size);
                }
            }
        }
        if let Some(value) = properties.get(&format!("{prefix}.{KEY_RESIZABLE_INDEXES}")) {
            self.resizable.clear();
            for token in value.split(',').filter(|t| !t.is_empty()) {
                if let Some((index, flag)) = token.split_once(':')
                    && let (Ok(index), Ok(flag)) = (index.parse(), flag.parse())
                {
                    self.resizable.insert(index, flag);
                }
            }
        }
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::SizeConfig;
    use crate::persist::{Persistable, Properties};

    #[test]
    fn uniform_aggregate() {
        let config = SizeConfig::new(100);
        assert_eq!(config.aggregate_size(0), 0);
        assert_eq!(config.aggregate_size(10), 1000);
        assert!(config.is_all_positions_same_size());
    }

    #[test]
    fn overrides_change_size_and_aggregate() {
        let mut config = SizeConfig::new(100);
        config.set_size(5, 120);
        assert_eq!(config.size(5), 120);
        assert!(!config.is_all_positions_same_size());

        config.set_size(0, 10);
        assert_eq!(config.aggregate_size(1), 10);
        assert_eq!(config.aggregate_size(5), 410);
        assert_eq!(config.aggregate_size(10), 930);
    }

    #[test]
    fn aggregate_recomputes_after_each_mutation() {
        let mut config = SizeConfig::new(50);
        assert_eq!(config.aggregate_size(4), 200);
        config.set_size(2, 80);
        assert_eq!(config.aggregate_size(4), 230);
        config.reset_size(2);
        assert_eq!(config.aggregate_size(4), 200);
        config.set_default_size(10);
        assert_eq!(config.aggregate_size(4), 40);
    }

    #[test]
    fn aggregate_ignores_overrides_at_or_past_n() {
        let mut config = SizeConfig::new(100);
        config.set_size(7, 500);
        assert_eq!(config.aggregate_size(7), 700);
        assert_eq!(config.aggregate_size(8), 1200);
    }

    #[test]
    fn sparse_overrides_on_a_huge_axis() {
        let mut config = SizeConfig::new(20);
        config.set_size(1_000_000, 120);
        config.set_size(5, 0);
        let n = 2_000_000usize;
        let expected = n as u64 * 20 - 20 + 100;
        assert_eq!(config.aggregate_size(n), expected);
    }

    #[test]
    fn resizability_flags() {
        let mut config = SizeConfig::new(100);
        assert!(config.is_position_resizable(3));
        config.set_resizable_by_default(false);
        assert!(!config.is_position_resizable(3));
        config.set_position_resizable(3, true);
        assert!(config.is_position_resizable(3));
        assert!(!config.is_position_resizable(4));
    }

    #[test]
    fn persistence_round_trip() {
        let mut config = SizeConfig::new(100);
        config.set_size(2, 35);
        config.set_size(0, 10);
        config.set_resizable_by_default(false);
        config.set_position_resizable(1, true);

        let mut properties = Properties::new();
        config.save_state("body.columnWidth", &mut properties);
        assert_eq!(
            properties.get("body.columnWidth.sizes"),
            Some("0:10,2:35,")
        );

        let mut loaded = SizeConfig::new(1);
        loaded.load_state("body.columnWidth", &properties);
        assert_eq!(loaded.default_size(), 100);
        assert_eq!(loaded.size(0), 10);
        assert_eq!(loaded.size(2), 35);
        assert_eq!(loaded.size(7), 100);
        assert!(!loaded.is_resizable_by_default());
        assert!(loaded.is_position_resizable(1));
        assert_eq!(loaded.aggregate_size(3), 145);
    }

    #[test]
    fn malformed_size_tokens_are_skipped() {
        let mut properties = Properties::new();
        properties.set("p.sizes".to_string(), "0:10,bogus,2:x,3:40,".to_string());
        let mut config = SizeConfig::new(100);
        config.load_state("p", &properties);
        assert_eq!(config.size(0), 10);
        assert_eq!(config.size(2), 100);
        assert_eq!(config.size(3), 40);
    }

    proptest! {
        #[test]
        fn aggregate_matches_naive_sum(
            default in 0u32..200,
            overrides in proptest::collection::btree_map(0usize..64, 0u32..400, 0..12),
            n in 0usize..64,
        ) {
            let mut config = SizeConfig::new(default);
            for (&index, &size) in &overrides {
                config.set_size(index, size);
            }
            let naive: u64 = (0..n).map(|i| u64::from(config.size(i))).sum();
            prop_assert_eq!(config.aggregate_size(n), naive);
        }
    }
}
