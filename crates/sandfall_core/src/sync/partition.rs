//! # Work Partitioner
//!
//! Cuts the grid into full-width row bands, one task per band.
//!
//! The fluid rule writes up to one row below the cell it steps. A band
//! therefore never simulates its own last row: that row is a halo, stepped
//! by the driver in a serial pass after the barrier. The last band has no
//! band below it and simulates all of its rows.
//!
//! ```text
//!   row 0  ┌──────────────┐
//!          │   band 0     │  simulated by a worker
//!          ├ ─ ─ halo ─ ─ ┤  stepped serially after the barrier
//!          │   band 1     │
//!          ├ ─ ─ halo ─ ─ ┤
//!          │   band 2     │  (no halo)
//!   height └──────────────┘
//! ```
//!
//! Every cell a band's task can touch lies in `[y0, y1)` of that band, so
//! tasks of one tick never share a cell.

use std::ops::Range;

use super::queue::{Region, SimulateTask, WorkItem};
use crate::grid::FluidSet;

/// One row band.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    /// Rows owned by the band.
    pub rows: Range<u32>,
    /// The band's halo row, if it is not the last band.
    pub halo: Option<u32>,
}

impl Partition {
    /// Rows the worker steps in parallel.
    #[must_use]
    pub fn simulated_rows(&self) -> Range<u32> {
        match self.halo {
            Some(halo) => self.rows.start..halo,
            None => self.rows.clone(),
        }
    }

    /// Rows the worker may read or write.
    #[must_use]
    pub fn touched_rows(&self) -> Range<u32> {
        self.rows.clone()
    }

    /// Full-width region of the owned rows.
    #[must_use]
    pub fn region(&self, width: u32) -> Region {
        Region::rows(self.rows.clone(), width)
    }
}

/// The bands of one grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partitioning {
    width: u32,
    height: u32,
    bands: Vec<Partition>,
}

impl Partitioning {
    /// All bands, top to bottom.
    #[must_use]
    pub fn bands(&self) -> &[Partition] {
        &self.bands
    }

    /// Number of bands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Returns true for an empty grid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Grid width the bands were cut for.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height the bands were cut for.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Halo rows, top to bottom.
    pub fn halo_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.bands.iter().filter_map(|band| band.halo)
    }

    /// Regions owned by each band.
    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.bands.iter().map(|band| band.region(self.width))
    }

    /// Builds one simulate item per band from a prepared fluid set.
    ///
    /// Each task carries its band region and the span of `fluids` whose
    /// cells lie in the band's simulated rows.
    pub fn tasks<'a>(&'a self, fluids: &'a FluidSet) -> impl Iterator<Item = WorkItem> + 'a {
        self.bands.iter().map(move |band| {
            let simulated = Region::rows(band.simulated_rows(), self.width);
            let span = fluids.span(simulated.cell_range(self.width));
            WorkItem::Simulate(SimulateTask::new(band.region(self.width), span))
        })
    }

    /// Fluid-set spans of the halo rows, top to bottom.
    #[must_use]
    pub fn halo_spans(&self, fluids: &FluidSet) -> Vec<Range<usize>> {
        self.halo_rows()
            .map(|row| fluids.span(Region::rows(row..row + 1, self.width).cell_range(self.width)))
            .collect()
    }
}

/// Splits `height` rows into at most `n_pieces` contiguous bands.
///
/// # Arguments
///
/// * `height` - Grid height in rows
/// * `width` - Grid width in cells
/// * `n_pieces` - Requested band count; clamped to `1..=height`
///
/// # Returns
///
/// Bands covering every row exactly once. The first `height % pieces`
/// bands get one extra row.
#[must_use]
pub fn partition(height: u32, width: u32, n_pieces: usize) -> Partitioning {
    if height == 0 {
        return Partitioning {
            width,
            height,
            bands: Vec::new(),
        };
    }

    let pieces = u32::try_from(n_pieces).unwrap_or(u32::MAX).clamp(1, height);
    let base = height / pieces;
    let extra = height % pieces;

    let mut bands = Vec::with_capacity(pieces as usize);
    let mut y = 0;
    for i in 0..pieces {
        let rows = base + u32::from(i < extra);
        let end = y + rows;
        let halo = (end < height).then(|| end - 1);
        bands.push(Partition { rows: y..end, halo });
        y = end;
    }

    Partitioning {
        width,
        height,
        bands,
    }
}
