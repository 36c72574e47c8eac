// SPDX-License-Identifier: MIT OR Apache-2.0
//! Owned BGRA8 pixel surface.

/// Colour in BGRA byte order
pub type Bgra = [u8; 4];

/// Opaque black
pub const BLACK: Bgra = [0, 0, 0, 0xFF];

/// Axis-aligned rectangle with exclusive right/bottom edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    /// First column inside
    pub left: i64,
    /// First row inside
    pub top: i64,
    /// First column outside
    pub right: i64,
    /// First row outside
    pub bottom: i64,
}

impl ClipRect {
    /// Rectangle from position and size
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            right: left + width.max(0),
            bottom: top + height.max(0),
        }
    }

    /// Overlap of two rectangles (possibly empty)
    pub fn intersect(&self, other: &ClipRect) -> ClipRect {
        ClipRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }

    /// Whether no pixel is inside
    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }
}

/// A contiguous BGRA8 buffer with stride `width * 4`.
///
/// The renderer owns one surface per render call; nothing else writes to it
/// while a pass is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// Transparent surface of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Surface filled with one colour
    pub fn filled(width: u32, height: u32, color: Bgra) -> Self {
        let mut surface = Self::new(width, height);
        surface.fill(color);
        surface
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Canvas bounds
    pub fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width as i64, self.height as i64)
    }

    /// Raw BGRA bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable raw BGRA bytes
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Byte offset of a pixel, if it lies on the surface
    pub fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.stride() + x as usize * 4)
    }

    /// Read one pixel
    pub fn pixel(&self, x: i64, y: i64) -> Option<Bgra> {
        let offset = self.offset(x, y)?;
        let mut color = [0; 4];
        color.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(color)
    }

    /// Write one pixel; off-surface writes are dropped
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Bgra) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset..offset + 4].copy_from_slice(&color);
        }
    }

    /// Fill the whole surface
    pub fn fill(&mut self, color: Bgra) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Fill a rectangle, clipped to the surface
    pub fn fill_rect(&mut self, rect: ClipRect, color: Bgra) {
        let rect = rect.intersect(&self.bounds());
        if rect.is_empty() {
            return;
        }
        let stride = self.stride();
        for y in rect.top..rect.bottom {
            let row = y as usize * stride;
            let start = row + rect.left as usize * 4;
            let end = row + rect.right as usize * 4;
            for pixel in self.pixels[start..end].chunks_exact_mut(4) {
                pixel.copy_from_slice(&color);
            }
        }
    }

    /// Copy of the pixels in RGBA order
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = self.pixels.clone();
        for pixel in rgba.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
        rgba
    }
}
