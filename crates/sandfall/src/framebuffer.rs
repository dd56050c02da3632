//! CPU framebuffer that the grid renders into.

use sandfall_core::{Color, PixelSink};

/// Row-major ARGB pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl FrameBuffer {
    /// Creates a buffer filled with `background`.
    #[must_use]
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Fills every pixel with `color`.
    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Pixel at (x, y), if inside the buffer.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Raw bytes for handing the frame to a presenter.
    ///
    /// Each pixel is one native-endian `u32` in ARGB order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height)?;
        Some(x as usize + y as usize * self.width as usize)
    }
}

impl PixelSink for FrameBuffer {
    #[inline]
    fn draw_pixel(&mut self, x: i32, y: i32, argb: Color) {
        if argb.is_transparent() {
            return;
        }
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = argb;
        }
    }
}
