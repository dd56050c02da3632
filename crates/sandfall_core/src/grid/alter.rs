//! # Terrain Brushes
//!
//! Circular edits of the grid: digging, pouring water or lava, stamping
//! generated features. Only legal between ticks.

use super::{Cell, FluidSet, Material, MaterialGrid, TextureKind};
use crate::texture::TextureSampler;

/// A circular terrain edit.
///
/// The material written is always `Material::for_kind(texture_kind)`, so a
/// brush cannot produce a water cell that is not fluid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Brush {
    /// Texture written into every affected cell.
    pub texture_kind: TextureKind,
    /// Cells strictly closer than this to the center are affected.
    pub radius: u16,
    /// Center X.
    pub cx: i32,
    /// Center Y.
    pub cy: i32,
    /// If false, `SolidIndestructible` cells are left alone.
    pub allow_indestructible: bool,
}

impl Brush {
    /// Water brush radius.
    pub const FLUID_RADIUS: u16 = 8;
    /// Erase brush radius.
    pub const ERASE_RADIUS: u16 = 12;

    /// Creates a brush.
    #[must_use]
    pub const fn new(kind: TextureKind, radius: u16, cx: i32, cy: i32) -> Self {
        Self {
            texture_kind: kind,
            radius,
            cx,
            cy,
            allow_indestructible: false,
        }
    }

    /// Pours water.
    #[must_use]
    pub const fn water(cx: i32, cy: i32) -> Self {
        Self::new(TextureKind::Water, Self::FLUID_RADIUS, cx, cy)
    }

    /// Pours lava.
    #[must_use]
    pub const fn lava(cx: i32, cy: i32) -> Self {
        Self::new(TextureKind::Lava, Self::FLUID_RADIUS, cx, cy)
    }

    /// Digs a hole of air.
    #[must_use]
    pub const fn erase(cx: i32, cy: i32) -> Self {
        Self::new(TextureKind::Air, Self::ERASE_RADIUS, cx, cy)
    }

    /// Material written into every affected cell.
    #[must_use]
    pub const fn material(&self) -> Material {
        Material::for_kind(self.texture_kind)
    }

    /// Returns true if the brush pours water or lava.
    #[must_use]
    pub const fn pours_fluid(&self) -> bool {
        matches!(self.texture_kind, TextureKind::Water | TextureKind::Lava)
    }

    /// Lets the brush overwrite indestructible cells.
    #[must_use]
    pub const fn allow_indestructible(mut self, allow: bool) -> Self {
        self.allow_indestructible = allow;
        self
    }
}

/// Applies a brush to the grid.
///
/// Every in-bounds cell within the brush circle is replaced by the brush
/// material and kind, keeping its cached noise value, and its color is
/// resampled. Cells that become fluid are registered in `fluids`.
///
/// # Arguments
///
/// * `grid` - Grid to edit
/// * `fluids` - Fluid index kept in step with the grid
/// * `sampler` - Texture source for the new colors
/// * `brush` - The edit
///
/// # Returns
///
/// Number of cells replaced.
pub fn alter(
    grid: &mut MaterialGrid,
    fluids: &mut FluidSet,
    sampler: &dyn TextureSampler,
    brush: &Brush,
) -> usize {
    let template = Cell::of_kind(brush.texture_kind);
    let mut changed = 0;

    for (x, y) in grid.circle(brush.cx, brush.cy, brush.radius) {
        let Some(index) = grid.index(x, y) else {
            continue;
        };
        let old = grid.cells[index];
        if old.is_indestructible() && !brush.allow_indestructible {
            continue;
        }

        let color = sampler.sample_color(template.texture_kind, x, y);
        grid.cells[index] = template.with_noise(old.noise_value).with_color(color);
        if brush.pours_fluid() && !old.is_fluid() {
            fluids.insert(index);
        }
        changed += 1;
    }

    tracing::trace!(
        kind = ?brush.texture_kind,
        cx = brush.cx,
        cy = brush.cy,
        radius = brush.radius,
        changed,
        "Applied brush"
    );
    changed
}
