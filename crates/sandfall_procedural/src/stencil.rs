//! # Object Stencils
//!
//! Alpha-tested footprints stamped onto the terrain as indestructible rock.

use crate::error::{ConfigError, ConfigResult};

/// A rectangular solid/empty mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stencil {
    width: u32,
    height: u32,
    mask: Vec<bool>,
}

impl Stencil {
    /// Default boulder width.
    pub const BOULDER_WIDTH: u32 = 20;
    /// Default boulder height.
    pub const BOULDER_HEIGHT: u32 = 14;

    /// Builds a stencil from ARGB pixels. Any alpha above zero is solid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StencilSize`] if `pixels` does not hold
    /// exactly `width * height` entries.
    pub fn from_argb(width: u32, height: u32, pixels: &[u32]) -> ConfigResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ConfigError::StencilSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            mask: pixels.iter().map(|&argb| argb >> 24 != 0).collect(),
        })
    }

    /// Procedural boulder: the ellipse inscribed in the rectangle.
    #[must_use]
    pub fn boulder(width: u32, height: u32) -> Self {
        let (rx, ry) = (width as f32 / 2.0, height as f32 / 2.0);
        let mut mask = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let dx = (x as f32 + 0.5 - rx) / rx;
                let dy = (y as f32 + 0.5 - ry) / ry;
                mask.push(dx * dx + dy * dy <= 1.0);
            }
        }
        Self {
            width,
            height,
            mask,
        }
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns true if the stencil is solid at the given offset.
    #[must_use]
    pub fn is_solid(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.mask[(x + y * self.width) as usize]
    }

    /// Number of solid cells.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.mask.iter().filter(|&&solid| solid).count()
    }

    /// Offsets of the solid cells, relative to the stencil center.
    pub fn solid_offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (half_w, half_h) = ((self.width / 2) as i32, (self.height / 2) as i32);
        let width = self.width.max(1) as usize;
        self.mask
            .iter()
            .enumerate()
            .filter(|&(_, &solid)| solid)
            .map(move |(i, _)| ((i % width) as i32 - half_w, (i / width) as i32 - half_h))
    }
}

impl Default for Stencil {
    fn default() -> Self {
        Self::boulder(Self::BOULDER_WIDTH, Self::BOULDER_HEIGHT)
    }
}
