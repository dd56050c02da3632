//! # Fluid Rule
//!
//! The falling-sand cellular automaton. One call to [`FluidRule::step`]
//! advances one fluid cell. A move touches two cells, a quench one more.
//!
//! ## Neighbour Scan
//!
//! ```text
//!        .   f   .
//!        3   *   4        f = fluid cell
//!        1   0   2        digits = scan order
//! ```
//!
//! The first in-bounds `Void` neighbour is the movement target, the first
//! in-bounds `Fluid` neighbour is the collision partner. The two are checked
//! independently: water meeting lava turns the lava into obsidian and then
//! still falls if it has a target.

use std::ops::AddAssign;

use crate::grid::{Cell, Material, MaterialGrid, TextureKind, TOMBSTONE};
use crate::texture::TextureSampler;

/// Neighbour offsets in scan order: below, below-left, below-right, left, right.
pub const NEIGHBOURS: [(i32, i32); 5] = [(0, 1), (-1, 1), (1, 1), (-1, 0), (1, 0)];

/// Read/write access to cells by coordinate.
///
/// Implemented by the full grid and by the row-band views handed to workers,
/// so the rule is written once.
pub trait CellAccess {
    /// Width of the underlying grid.
    fn width(&self) -> u32;

    /// Height of the underlying grid.
    fn height(&self) -> u32;

    /// Reads a cell. `None` means out of reach.
    fn cell(&self, x: i32, y: i32) -> Option<Cell>;

    /// Replaces a cell. Only called with coordinates `cell` accepted.
    fn put(&mut self, x: i32, y: i32, cell: Cell);
}

impl CellAccess for MaterialGrid {
    #[inline]
    fn width(&self) -> u32 {
        MaterialGrid::width(self)
    }

    #[inline]
    fn height(&self) -> u32 {
        MaterialGrid::height(self)
    }

    #[inline]
    fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.get(x, y)
    }

    #[inline]
    fn put(&mut self, x: i32, y: i32, cell: Cell) {
        self.set(x, y, cell);
    }
}

/// What happened to one fluid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The cell is no longer fluid. Its entry should be dropped.
    Pruned,
    /// The fluid did not move. `quenched` is set if it turned a lava
    /// neighbour into obsidian.
    Stayed {
        /// A lava partner solidified.
        quenched: bool,
    },
    /// The fluid moved to the given cell index.
    Moved {
        /// New cell index.
        to: usize,
        /// A lava partner solidified before the move.
        quenched: bool,
    },
    /// The cell was lava touching water and is now obsidian.
    Solidified,
}

/// Counters for one pass over a span of fluid entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpanStats {
    /// Entries stepped.
    pub visited: u64,
    /// Fluids that moved.
    pub moved: u64,
    /// Entries dropped because the cell was no longer fluid.
    pub pruned: u64,
    /// Lava neighbours turned to obsidian by water.
    pub quenched: u64,
    /// Lava cells that turned to obsidian themselves.
    pub solidified: u64,
}

impl AddAssign for SpanStats {
    fn add_assign(&mut self, rhs: Self) {
        self.visited += rhs.visited;
        self.moved += rhs.moved;
        self.pruned += rhs.pruned;
        self.quenched += rhs.quenched;
        self.solidified += rhs.solidified;
    }
}

/// The fluid cellular automaton.
#[derive(Clone, Copy)]
pub struct FluidRule<'a> {
    sampler: &'a dyn TextureSampler,
}

impl<'a> FluidRule<'a> {
    /// Creates the rule with the sampler used for resampled colors.
    #[must_use]
    pub fn new(sampler: &'a dyn TextureSampler) -> Self {
        Self { sampler }
    }

    /// Advances one fluid cell.
    ///
    /// # Arguments
    ///
    /// * `index` - Flat index of the cell in the grid
    /// * `cells` - Grid or band view to read and write
    ///
    /// # Returns
    ///
    /// The outcome, which tells the caller how to update the fluid entry.
    pub fn step<A: CellAccess + ?Sized>(&self, index: usize, cells: &mut A) -> StepOutcome {
        let width = cells.width() as usize;
        if width == 0 {
            return StepOutcome::Pruned;
        }
        let (x, y) = ((index % width) as i32, (index / width) as i32);

        let Some(me) = cells.cell(x, y) else {
            return StepOutcome::Pruned;
        };
        if !me.is_fluid() {
            return StepOutcome::Pruned;
        }

        let mut target = None;
        let mut partner = None;
        for (dx, dy) in NEIGHBOURS {
            let (nx, ny) = (x + dx, y + dy);
            let Some(n) = cells.cell(nx, ny) else {
                continue;
            };
            if target.is_none() && n.is_void() {
                target = Some((nx, ny));
            }
            if partner.is_none() && n.is_fluid() {
                partner = Some((nx, ny, n));
            }
            if target.is_some() && partner.is_some() {
                break;
            }
        }

        let mut quenched = false;
        if let Some((px, py, p)) = partner {
            match (me.texture_kind, p.texture_kind) {
                (TextureKind::Water, TextureKind::Lava) => {
                    cells.put(px, py, self.obsidian(p, px, py));
                    quenched = true;
                }
                (TextureKind::Lava, TextureKind::Water) => {
                    cells.put(x, y, self.obsidian(me, x, y));
                    return StepOutcome::Solidified;
                }
                _ => {}
            }
        }

        // The partner was fluid, so the target is still void.
        let Some((tx, ty)) = target else {
            return StepOutcome::Stayed { quenched };
        };
        // The destination keeps its own cached noise; everything else travels.
        let dest_noise = cells.cell(tx, ty).map_or(0, |c| c.noise_value);
        cells.put(tx, ty, me.with_noise(dest_noise));
        let vacated = Cell::VOID
            .with_noise(me.noise_value)
            .with_color(self.sampler.sample_color(TextureKind::Air, x, y));
        cells.put(x, y, vacated);

        StepOutcome::Moved {
            to: tx as usize + ty as usize * width,
            quenched,
        }
    }

    /// Steps every entry of a span in ascending cell order.
    ///
    /// Entries of cells that stopped being fluid become tombstones, entries
    /// of moved fluids are repointed to the new cell.
    pub fn step_span<A: CellAccess + ?Sized>(&self, entries: &mut [usize], cells: &mut A) -> SpanStats {
        let mut stats = SpanStats::default();
        for entry in entries {
            if *entry == TOMBSTONE {
                continue;
            }
            stats.visited += 1;
            match self.step(*entry, cells) {
                StepOutcome::Pruned => {
                    *entry = TOMBSTONE;
                    stats.pruned += 1;
                }
                StepOutcome::Solidified => {
                    *entry = TOMBSTONE;
                    stats.solidified += 1;
                }
                StepOutcome::Stayed { quenched } => {
                    stats.quenched += u64::from(quenched);
                }
                StepOutcome::Moved { to, quenched } => {
                    *entry = to;
                    stats.moved += 1;
                    stats.quenched += u64::from(quenched);
                }
            }
        }
        stats
    }

    fn obsidian(&self, from: Cell, x: i32, y: i32) -> Cell {
        Cell::new(Material::Solid, TextureKind::Obsidian)
            .with_noise(from.noise_value)
            .with_color(self.sampler.sample_color(TextureKind::Obsidian, x, y))
    }
}
