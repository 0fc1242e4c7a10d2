#![forbid(unsafe_code)]

//! Half-open integer intervals.
//!
//! [`Range`] is the compact representation for a contiguous block of
//! positions: selection spans, changed-region payloads in layer events,
//! hidden-position tracking. It is a plain value type; a `Range` with
//! `start >= end` is empty and contains nothing.
//!
//! # Invariants
//!
//! 1. `contains(i)` ⇔ `start <= i < end`.
//! 2. Equality is structural.
//! 3. [`sort_by_start`](Range::sort_by_start) is stable: ranges with equal
//!    `start` keep their original relative order.

/// A half-open interval `[start, end)` over positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    /// First contained position (inclusive).
    pub start: usize,
    /// First position past the interval (exclusive).
    pub end: usize,
}

impl Range {
    /// Create a new range.
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Check if a position lies inside the range.
    #[inline]
    pub const fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end
    }

    /// Check if the range contains no positions.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of contained positions.
    #[inline]
    pub const fn len(&self) -> usize {
        if self.is_empty() { 0 } else { self.end - self.start }
    }

    /// Iterate over every contained position.
    ///
    /// Intended for small ranges (selection enumeration, event payloads);
    /// layer-wide operations work on the interval bounds instead.
    pub fn iter(&self) -> impl Iterator<Item = usize> + use<> {
        let (start, end) = (self.start, self.end.max(self.start));
        start..end
    }

    /// Sort a slice of ranges by `start`, ascending.
    ///
    /// Stable: ranges sharing a `start` keep their insertion order.
    pub fn sort_by_start(ranges: &mut [Range]) {
        ranges.sort_by_key(|r| r.start);
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

#[cfg(test)]
mod tests {
    use super::Range;

    #[test]
    fn contains_matches_half_open_bounds() {
        let r = Range::new(3, 7);
        assert!(!r.contains(2));
        assert!(r.contains(3));
        assert!(r.contains(6));
        assert!(!r.contains(7));
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Range::new(3, 5), Range::new(3, 5));
        assert_ne!(Range::new(3, 5), Range::new(3, 6));
    }

    #[test]
    fn empty_range_contains_nothing() {
        let r = Range::new(5, 5);
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert!(!r.contains(5));
        assert_eq!(r.iter().count(), 0);

        let inverted = Range::new(7, 3);
        assert!(inverted.is_empty());
        assert!(!inverted.contains(5));
        assert_eq!(inverted.iter().count(), 0);
    }

    #[test]
    fn sort_by_start_is_stable() {
        let mut ranges = vec![
            Range::new(3, 5),
            Range::new(3, 7),
            Range::new(20, 25),
            Range::new(2, 16),
        ];
        Range::sort_by_start(&mut ranges);
        let starts: Vec<usize> = ranges.iter().map(|r| r.start).collect();
        assert_eq!(starts, [2, 3, 3, 20]);
        // The two start=3 ranges keep their insertion order.
        assert_eq!(ranges[1], Range::new(3, 5));
        assert_eq!(ranges[2], Range::new(3, 7));
    }

    #[test]
    fn iter_enumerates_members() {
        let members: Vec<usize> = Range::new(4, 8).iter().collect();
        assert_eq!(members, [4, 5, 6, 7]);
    }
}
