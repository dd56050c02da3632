//! # Material Grid
//!
//! The authoritative pixel world: a single flat buffer of `width * height`
//! cells indexed as `x + y * width`.
//!
//! ## Cell Format
//!
//! ```text
//! ┌──────────┬──────────────┬─────────────┬──────────────┐
//! │ material │ texture_kind │ noise_value │ color (ARGB) │
//! │   u8     │     u8       │     u8      │     u32      │
//! └──────────┴──────────────┴─────────────┴──────────────┘
//! ```
//!
//! `material` is the coarse physical category the fluid rule reasons about,
//! `texture_kind` selects the texture (and the collision pairing), the noise
//! value is cached from generation and the color is cached from the texture
//! sampler so rendering never re-samples.

mod alter;
mod fluid_set;

pub use alter::{alter, Brush};
pub use fluid_set::FluidSet;
pub(crate) use fluid_set::TOMBSTONE;

use bytemuck::{Pod, Zeroable};

use crate::texture::PixelSink;

/// Coarse physical category of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Material {
    /// Empty space. Fluids flow into it.
    #[default]
    Void = 0,
    /// Destructible solid (dirt, moss, obsidian).
    Solid = 1,
    /// Solid that brushes and fluids cannot replace (rock).
    SolidIndestructible = 2,
    /// Participates in the falling-sand rule.
    Fluid = 3,
}

impl Material {
    /// Returns the material a texture kind naturally belongs to.
    #[inline]
    #[must_use]
    pub const fn for_kind(kind: TextureKind) -> Self {
        match kind {
            TextureKind::Air => Self::Void,
            TextureKind::Dirt | TextureKind::Moss | TextureKind::Obsidian => Self::Solid,
            TextureKind::Rock => Self::SolidIndestructible,
            TextureKind::Water | TextureKind::Lava => Self::Fluid,
        }
    }
}

/// Texture of a cell. Drives color sampling and collision rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureKind {
    /// Empty air.
    #[default]
    Air = 0,
    /// Diggable terrain.
    Dirt = 1,
    /// Indestructible boulders.
    Rock = 2,
    /// Dirt overgrown with moss.
    Moss = 3,
    /// Lava quenched by water.
    Obsidian = 4,
    /// Water fluid.
    Water = 20,
    /// Lava fluid.
    Lava = 21,
}

impl TextureKind {
    /// Every texture kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Air,
        Self::Dirt,
        Self::Rock,
        Self::Moss,
        Self::Obsidian,
        Self::Water,
        Self::Lava,
    ];

    /// Returns true for the kinds that flow.
    #[inline]
    #[must_use]
    pub const fn is_fluid(self) -> bool {
        matches!(self, Self::Water | Self::Lava)
    }
}

/// Packed ARGB color (`0xAARRGGBB`).
///
/// Alpha 0 means "transparent": the renderer leaves the target pixel alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Color(pub u32);

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self(0);

    /// Builds a color from its four channels.
    #[inline]
    #[must_use]
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Builds an opaque color.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_argb(0xFF, r, g, b)
    }

    /// Raw `0xAARRGGBB` value.
    #[inline]
    #[must_use]
    pub const fn argb(self) -> u32 {
        self.0
    }

    /// Alpha channel.
    #[inline]
    #[must_use]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel.
    #[inline]
    #[must_use]
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    #[inline]
    #[must_use]
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    #[inline]
    #[must_use]
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Returns true if drawing this color must not overwrite the target.
    #[inline]
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.alpha() == 0
    }
}

/// A single pixel of the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Physical category.
    pub material: Material,
    /// Texture / collision kind.
    pub texture_kind: TextureKind,
    /// Noise sample cached at generation time (0..=255).
    pub noise_value: u8,
    /// Cached texture color for this cell's coordinates.
    pub color: Color,
}

impl Cell {
    /// Empty air with no cached noise or color.
    pub const VOID: Self = Self {
        material: Material::Void,
        texture_kind: TextureKind::Air,
        noise_value: 0,
        color: Color::TRANSPARENT,
    };

    /// Returns [`Cell::VOID`].
    #[inline]
    #[must_use]
    pub const fn void() -> Self {
        Self::VOID
    }

    /// Creates a cell. A `Void` material always carries the `Air` texture.
    #[inline]
    #[must_use]
    pub const fn new(material: Material, texture_kind: TextureKind) -> Self {
        let texture_kind = if matches!(material, Material::Void) {
            TextureKind::Air
        } else {
            texture_kind
        };
        Self {
            material,
            texture_kind,
            noise_value: 0,
            color: Color::TRANSPARENT,
        }
    }

    /// Creates a cell whose material follows from its texture kind.
    #[inline]
    #[must_use]
    pub const fn of_kind(kind: TextureKind) -> Self {
        Self::new(Material::for_kind(kind), kind)
    }

    /// Returns this cell with the given cached noise value.
    #[inline]
    #[must_use]
    pub const fn with_noise(mut self, noise_value: u8) -> Self {
        self.noise_value = noise_value;
        self
    }

    /// Returns this cell with the given cached color.
    #[inline]
    #[must_use]
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Returns true for empty space.
    #[inline]
    #[must_use]
    pub const fn is_void(self) -> bool {
        matches!(self.material, Material::Void)
    }

    /// Returns true for cells that take part in the fluid rule.
    #[inline]
    #[must_use]
    pub const fn is_fluid(self) -> bool {
        matches!(self.material, Material::Fluid)
    }

    /// Returns true for cells that brushes may not replace.
    #[inline]
    #[must_use]
    pub const fn is_indestructible(self) -> bool {
        matches!(self.material, Material::SolidIndestructible)
    }
}

/// The flat material grid.
///
/// Owned exclusively by the simulation. Workers only ever see disjoint row
/// bands of it, see [`crate::sync::SharedWorld`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialGrid {
    /// Width in cells.
    width: u32,
    /// Height in cells.
    height: u32,
    /// Seed of the generation run that produced this grid.
    seed: u32,
    /// Cell data, indexed as `x + y * width`.
    cells: Vec<Cell>,
}

impl MaterialGrid {
    /// Creates a grid filled with [`Cell::VOID`].
    #[must_use]
    pub fn new(width: u32, height: u32, seed: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            seed,
            cells: vec![Cell::VOID; len],
        }
    }

    /// Width in cells.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Seed this grid was generated from.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the grid has no cells.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Converts coordinates to a flat index, or `None` if out of bounds.
    #[inline]
    #[must_use]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        (x < self.width && y < self.height).then(|| x as usize + y as usize * self.width as usize)
    }

    /// Converts a flat index back to coordinates.
    ///
    /// The index is not validated; callers pass indices from this grid.
    #[inline]
    #[must_use]
    pub fn coords(&self, index: usize) -> (i32, i32) {
        let width = self.width.max(1) as usize;
        ((index % width) as i32, (index / width) as i32)
    }

    /// Gets the cell at the given coordinates.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Replaces the cell at the given coordinates.
    ///
    /// Returns false (and writes nothing) if the coordinates are out of bounds.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = cell;
                true
            }
            None => false,
        }
    }

    /// Gets the cell at a flat index.
    #[inline]
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row of cells.
    #[must_use]
    pub fn row(&self, y: u32) -> &[Cell] {
        if y >= self.height {
            return &[];
        }
        let width = self.width as usize;
        let start = y as usize * width;
        &self.cells[start..start + width]
    }

    /// Mutable access to the cell buffer for the shared world view.
    #[inline]
    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Iterates the in-bounds coordinates strictly inside a circle.
    ///
    /// Cells are visited row by row over the circle's bounding box and kept
    /// when `dx² + dy² < radius²`. Out-of-bounds cells are skipped, never
    /// wrapped, so any center and radius is safe.
    pub fn circle(&self, cx: i32, cy: i32, radius: u16) -> impl Iterator<Item = (i32, i32)> {
        let r = i64::from(radius);
        let (cx, cy) = (i64::from(cx), i64::from(cy));
        let y_range = (cy - r).max(0)..(cy + r).min(i64::from(self.height));
        let x_range = (cx - r).max(0)..(cx + r).min(i64::from(self.width));

        y_range.flat_map(move |y| {
            x_range.clone().filter_map(move |x| {
                let (dx, dy) = (x - cx, y - cy);
                (dx * dx + dy * dy < r * r).then_some((x as i32, y as i32))
            })
        })
    }

    /// Counts the cells of a given texture kind.
    #[must_use]
    pub fn count_kind(&self, kind: TextureKind) -> usize {
        self.cells.iter().filter(|c| c.texture_kind == kind).count()
    }

    /// Counts the cells currently marked fluid.
    #[must_use]
    pub fn count_fluid(&self) -> usize {
        self.cells.iter().filter(|c| c.is_fluid()).count()
    }

    /// FNV-1a checksum over every cell. Equal grids hash equal.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0100_0000_01b3;

        let mut hash = FNV_OFFSET;
        let mut feed = |byte: u8| {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        };
        for cell in &self.cells {
            feed(cell.material as u8);
            feed(cell.texture_kind as u8);
            feed(cell.noise_value);
            for byte in cell.color.0.to_le_bytes() {
                feed(byte);
            }
        }
        hash
    }

    /// Blits every non-transparent cell color into a pixel sink.
    pub fn render(&self, sink: &mut dyn PixelSink) {
        let width = self.width as usize;
        if width == 0 {
            return;
        }
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.color.is_transparent() {
                continue;
            }
            sink.draw_pixel((i % width) as i32, (i / width) as i32, cell.color);
        }
    }
}

/// A generated world: the grid plus the index of its fluid cells.
#[derive(Clone, Debug)]
pub struct World {
    /// The material grid.
    pub grid: MaterialGrid,
    /// Every fluid cell of `grid`.
    pub fluids: FluidSet,
}

impl World {
    /// Creates an empty world of the given size.
    #[must_use]
    pub fn empty(width: u32, height: u32, seed: u32) -> Self {
        Self {
            grid: MaterialGrid::new(width, height, seed),
            fluids: FluidSet::new(),
        }
    }

    /// Writes a cell and registers it in the fluid index if it is a new fluid.
    ///
    /// Returns false if the coordinates are out of bounds.
    pub fn put(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        let Some(index) = self.grid.index(x, y) else {
            return false;
        };
        let was_fluid = self.grid.cells[index].is_fluid();
        self.grid.cells[index] = cell;
        if cell.is_fluid() && !was_fluid {
            self.fluids.insert(index);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_forces_air() {
        let cell = Cell::new(Material::Void, TextureKind::Dirt);
        assert_eq!(cell.texture_kind, TextureKind::Air);
        assert!(cell.is_void());
    }

    #[test]
    fn test_material_for_kind() {
        assert_eq!(Material::for_kind(TextureKind::Water), Material::Fluid);
        assert_eq!(Material::for_kind(TextureKind::Rock), Material::SolidIndestructible);
        assert_eq!(Material::for_kind(TextureKind::Obsidian), Material::Solid);
        assert_eq!(Material::for_kind(TextureKind::Air), Material::Void);
    }

    #[test]
    fn test_color_channels() {
        let c = Color::from_argb(0x80, 0x11, 0x22, 0x33);
        assert_eq!(c.argb(), 0x8011_2233);
        assert_eq!((c.alpha(), c.red(), c.green(), c.blue()), (0x80, 0x11, 0x22, 0x33));
        assert!(Color::TRANSPARENT.is_transparent());
        assert!(!Color::rgb(1, 2, 3).is_transparent());
    }

    #[test]
    fn test_indexing_bounds() {
        let grid = MaterialGrid::new(4, 3, 0);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.index(3, 2), Some(11));
        assert_eq!(grid.index(4, 0), None);
        assert_eq!(grid.index(0, 3), None);
        assert_eq!(grid.index(-1, 0), None);
        assert_eq!(grid.coords(7), (3, 1));
    }

    #[test]
    fn test_set_out_of_bounds_is_noop() {
        let mut grid = MaterialGrid::new(2, 2, 0);
        let before = grid.clone();
        assert!(!grid.set(5, 5, Cell::of_kind(TextureKind::Dirt)));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_circle_is_strict_and_clipped() {
        let grid = MaterialGrid::new(10, 10, 0);

        // Radius 1 is exactly the center cell.
        let cells: Vec<_> = grid.circle(5, 5, 1).collect();
        assert_eq!(cells, vec![(5, 5)]);

        // Radius 2 keeps the full 3x3 block; (±2, 0) sits exactly on the edge.
        assert_eq!(grid.circle(5, 5, 2).count(), 9);

        // Far away circles touch nothing.
        assert_eq!(grid.circle(-500, -500, 20).count(), 0);

        // Every produced coordinate is in bounds.
        assert!(grid
            .circle(0, 0, 1000)
            .all(|(x, y)| grid.index(x, y).is_some()));
        assert_eq!(grid.circle(0, 0, 1000).count(), 100);
    }

    #[test]
    fn test_checksum_tracks_content() {
        let mut a = MaterialGrid::new(8, 8, 1);
        let b = a.clone();
        assert_eq!(a.checksum(), b.checksum());

        a.set(3, 3, Cell::of_kind(TextureKind::Water));
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_world_put_registers_new_fluids_once() {
        let mut world = World::empty(4, 4, 0);
        assert!(world.put(1, 1, Cell::of_kind(TextureKind::Water)));
        assert!(world.put(1, 1, Cell::of_kind(TextureKind::Lava)));
        assert_eq!(world.fluids.len(), 1);
        assert!(!world.put(9, 9, Cell::of_kind(TextureKind::Water)));
    }

    #[test]
    fn test_row_access() {
        let mut grid = MaterialGrid::new(3, 2, 0);
        grid.set(2, 1, Cell::of_kind(TextureKind::Dirt));
        assert_eq!(grid.row(1)[2].texture_kind, TextureKind::Dirt);
        assert!(grid.row(5).is_empty());
    }
}
