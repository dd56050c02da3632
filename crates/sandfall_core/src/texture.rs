//! # Texture and Pixel Seams
//!
//! The engine never owns images or windows. Texture colors come in through
//! [`TextureSampler`] and rendered pixels go out through [`PixelSink`].

use crate::grid::{Color, TextureKind};

/// Supplies the cached color of a cell.
///
/// Implementations must be pure: the same `(kind, x, y)` always yields the
/// same color. Workers call this concurrently.
pub trait TextureSampler: Send + Sync {
    /// Returns the ARGB color for a texture kind at world coordinates.
    ///
    /// # Arguments
    ///
    /// * `kind` - Texture of the cell
    /// * `x`, `y` - World coordinates; implementations tile as they see fit
    fn sample_color(&self, kind: TextureKind, x: i32, y: i32) -> Color;
}

impl<F> TextureSampler for F
where
    F: Fn(TextureKind, i32, i32) -> Color + Send + Sync,
{
    #[inline]
    fn sample_color(&self, kind: TextureKind, x: i32, y: i32) -> Color {
        self(kind, x, y)
    }
}

/// Receives rendered pixels.
pub trait PixelSink {
    /// Draws one pixel. Never called for transparent colors.
    fn draw_pixel(&mut self, x: i32, y: i32, argb: Color);
}
