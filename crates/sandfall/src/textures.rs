//! # Procedural Textures
//!
//! Built-in [`TextureSampler`] for running without texture files.
//!
//! Every kind is a 16x16 tile that repeats across the world: a base color
//! with per-texel brightness jitter from a small integer hash. Air is fully
//! transparent, so drawing it leaves the background untouched.

use sandfall_core::{Color, TextureKind, TextureSampler};

/// Edge length of one texture tile in cells.
pub const TILE_SIZE: i32 = 16;

/// Deterministic tiling textures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProceduralTextures {
    variant: u32,
}

impl ProceduralTextures {
    /// Creates a texture set. Different variants jitter differently.
    #[must_use]
    pub const fn new(variant: u32) -> Self {
        Self { variant }
    }

    /// Base color and jitter amplitude of a kind.
    #[must_use]
    pub const fn palette(kind: TextureKind) -> (Color, u8) {
        match kind {
            TextureKind::Air => (Color::TRANSPARENT, 0),
            TextureKind::Dirt => (Color::rgb(0x8B, 0x5A, 0x2B), 24),
            TextureKind::Rock => (Color::rgb(0x6E, 0x6E, 0x73), 28),
            TextureKind::Moss => (Color::rgb(0x4F, 0x7A, 0x28), 20),
            TextureKind::Obsidian => (Color::rgb(0x2A, 0x1E, 0x3A), 12),
            TextureKind::Water => (Color::rgb(0x2F, 0x6F, 0xD8), 16),
            TextureKind::Lava => (Color::rgb(0xE8, 0x4A, 0x10), 40),
        }
    }

    #[inline]
    fn texel_hash(&self, kind: TextureKind, tx: i32, ty: i32) -> u32 {
        // Only the tile coordinates feed the hash; they are in 0..TILE_SIZE.
        let mut h = self.variant ^ (u32::from(kind as u8) << 24);
        h ^= (tx as u32) | ((ty as u32) << 8);
        h = h.wrapping_mul(0x9E37_79B1);
        h ^= h >> 15;
        h = h.wrapping_mul(0x85EB_CA6B);
        h ^ (h >> 13)
    }
}

impl TextureSampler for ProceduralTextures {
    fn sample_color(&self, kind: TextureKind, x: i32, y: i32) -> Color {
        let (base, jitter) = Self::palette(kind);
        if base.is_transparent() {
            return Color::TRANSPARENT;
        }

        let tx = x.rem_euclid(TILE_SIZE);
        let ty = y.rem_euclid(TILE_SIZE);
        let span = i32::from(jitter) * 2 + 1;
        let offset = (self.texel_hash(kind, tx, ty) % span as u32) as i32 - i32::from(jitter);

        let shade = |channel: u8| (i32::from(channel) + offset).clamp(0, 255) as u8;
        Color::rgb(shade(base.red()), shade(base.green()), shade(base.blue()))
    }
}
