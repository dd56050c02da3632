//! Index of the grid cells that currently hold fluid.

use std::ops::Range;

use super::MaterialGrid;

/// Marks an entry whose cell stopped being fluid during a tick.
pub(crate) const TOMBSTONE: usize = usize::MAX;

/// Cell indices of every fluid in the grid.
///
/// The fluid rule only ever visits these cells. Between ticks the set is
/// compacted and sorted by [`FluidSet::prepare`] so each worker band owns a
/// contiguous span of entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FluidSet {
    entries: Vec<usize>,
}

impl FluidSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a cell index.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        self.entries.push(index);
    }

    /// Number of entries, including tombstones not yet compacted.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live cell indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().copied().filter(|&i| i != TOMBSTONE)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Compacts the set against the grid.
    ///
    /// Tombstones, entries that no longer point at fluid and duplicates are
    /// removed, and the rest is sorted by cell index.
    pub fn prepare(&mut self, grid: &MaterialGrid) {
        let cells = grid.cells();
        self.entries
            .retain(|&i| i != TOMBSTONE && cells.get(i).is_some_and(|c| c.is_fluid()));
        self.entries.sort_unstable();
        self.entries.dedup();
    }

    /// Returns the entry span whose cell indices fall into `cells`.
    ///
    /// Only meaningful right after [`FluidSet::prepare`].
    #[must_use]
    pub fn span(&self, cells: Range<usize>) -> Range<usize> {
        let start = self.entries.partition_point(|&i| i < cells.start);
        let end = self.entries.partition_point(|&i| i < cells.end);
        start..end
    }

    #[inline]
    pub(crate) fn entries_mut(&mut self) -> &mut [usize] {
        &mut self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, TextureKind};

    #[test]
    fn test_prepare_compacts() {
        let mut grid = MaterialGrid::new(4, 4, 0);
        grid.set(1, 1, Cell::of_kind(TextureKind::Water));
        grid.set(2, 3, Cell::of_kind(TextureKind::Lava));

        let mut set = FluidSet::new();
        let a = grid.index(2, 3).unwrap_or_default();
        let b = grid.index(1, 1).unwrap_or_default();
        set.insert(a);
        set.insert(b);
        set.insert(b);
        set.insert(TOMBSTONE);
        set.insert(0); // not fluid

        set.prepare(&grid);
        assert_eq!(set.entries_mut(), &[b, a]);
    }

    #[test]
    fn test_span_by_rows() {
        let mut grid = MaterialGrid::new(4, 4, 0);
        for y in 0..4 {
            grid.set(0, y, Cell::of_kind(TextureKind::Water));
        }
        let mut set = FluidSet::new();
        for y in 0..4 {
            set.insert(grid.index(0, y).unwrap_or_default());
        }
        set.prepare(&grid);

        // Rows 1..3 are cells 4..12.
        assert_eq!(set.span(4..12), 1..3);
        assert_eq!(set.span(0..16), 0..4);
        assert_eq!(set.span(16..20), 4..4);
    }

    #[test]
    fn test_iter_skips_tombstones() {
        let mut set = FluidSet::new();
        set.insert(3);
        set.insert(TOMBSTONE);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3]);
        assert_eq!(set.len(), 2);
    }
}
