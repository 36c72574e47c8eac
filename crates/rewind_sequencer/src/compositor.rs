// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compositing of frame and cursor payloads onto a [`Surface`].
//!
//! Every destination pixel is mapped back into the stored bitmap (undoing
//! rotation and resize), then blended according to the record's encoding.
//! Destination pixels are always inside the surface; source reads that fall
//! outside the payload skip that pixel.

use crate::error::RenderError;
use crate::surface::{ClipRect, Surface};
use rewind_cache::{CursorRecord, CursorType, FrameRecord, Raster, SubSequence, SubSequenceBody};
use serde::{Deserialize, Serialize};

/// Resampling used when a record is drawn at a size other than its stored size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderQuality {
    /// Nearest neighbour everywhere
    #[default]
    Fast,
    /// Bilinear for colour payloads; masks stay nearest neighbour
    High,
}

/// Pixel counts of one composite call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Destination pixels written
    pub drawn: u64,
    /// Destination pixels inside the clip that were left untouched
    pub skipped: u64,
}

/// Where the owning sequence places its records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Horizontal offset added to record positions
    pub left: i64,
    /// Vertical offset added to record positions
    pub top: i64,
    /// Canvas region records may draw into (the surface bounds are always applied)
    pub clip: Option<ClipRect>,
    /// Opacity applied to frames
    pub opacity: f64,
}

impl Placement {
    /// Offset only, clipped by the surface
    pub fn at(left: i64, top: i64) -> Self {
        Self {
            left,
            top,
            clip: None,
            opacity: 1.0,
        }
    }

    /// Restrict drawing to a rectangle
    pub fn clipped_to(mut self, clip: ClipRect) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Set frame opacity
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    fn clip_for(&self, surface: &Surface) -> ClipRect {
        match self.clip {
            Some(clip) => clip.intersect(&surface.bounds()),
            None => surface.bounds(),
        }
    }
}

/// Destination rectangle of one record, already clipped
struct DrawArea {
    origin_x: i64,
    origin_y: i64,
    visible: ClipRect,
}

impl DrawArea {
    fn new(origin_x: i64, origin_y: i64, width: u16, height: u16, clip: ClipRect) -> Self {
        let full = ClipRect::new(origin_x, origin_y, width as i64, height as i64);
        Self {
            origin_x,
            origin_y,
            visible: full.intersect(&clip),
        }
    }
}

/// Maps destination pixels back into the stored bitmap
struct SourceMap {
    width: f64,
    height: f64,
    scale_x: f64,
    scale_y: f64,
    source_width: u32,
    source_height: u32,
    rotation: Option<(f64, f64)>,
}

impl SourceMap {
    fn new(raster: &Raster) -> Self {
        let width = raster.width.max(1) as f64;
        let height = raster.height.max(1) as f64;
        let rotation = raster
            .is_rotated()
            .then(|| raster.angle.to_radians().sin_cos());
        Self {
            width,
            height,
            scale_x: raster.original_width as f64 / width,
            scale_y: raster.original_height as f64 / height,
            source_width: raster.original_width as u32,
            source_height: raster.original_height as u32,
            rotation,
        }
    }

    /// Continuous source position of a destination pixel centre
    fn source_point(&self, dx: u32, dy: u32) -> Option<(f64, f64)> {
        let mut x = dx as f64 + 0.5;
        let mut y = dy as f64 + 0.5;

        if let Some((sin, cos)) = self.rotation {
            // Undo a clockwise rotation about the bitmap centre
            let (cx, cy) = (self.width / 2.0, self.height / 2.0);
            let (rx, ry) = (x - cx, y - cy);
            x = cx + rx * cos + ry * sin;
            y = cy - rx * sin + ry * cos;
            if x < 0.0 || y < 0.0 || x >= self.width || y >= self.height {
                return None;
            }
        }

        Some((x * self.scale_x, y * self.scale_y))
    }

    fn nearest(&self, dx: u32, dy: u32) -> Option<(u32, u32)> {
        let (x, y) = self.source_point(dx, dy)?;
        let sx = (x.floor() as u32).min(self.source_width.saturating_sub(1));
        let sy = (y.floor() as u32).min(self.source_height.saturating_sub(1));
        Some((sx, sy))
    }
}

/// Reads pixels out of a byte-aligned payload
struct Texels<'a> {
    payload: &'a [u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
}

impl<'a> Texels<'a> {
    fn new(payload: &'a [u8], raster: &Raster) -> Self {
        Self {
            payload,
            width: raster.original_width as usize,
            height: raster.original_height as usize,
            bytes_per_pixel: raster.bytes_per_pixel(),
        }
    }

    fn get(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        let index = (y * self.width + x) * self.bytes_per_pixel;
        let bytes = self.payload.get(index..index + self.bytes_per_pixel)?;
        Some(match bytes {
            [b, g, r] => [*b, *g, *r, 0xFF],
            [b, g, r, a] => [*b, *g, *r, *a],
            _ => return None,
        })
    }

    fn nearest(&self, map: &SourceMap, dx: u32, dy: u32) -> Option<[u8; 4]> {
        let (sx, sy) = map.nearest(dx, dy)?;
        self.get(sx as usize, sy as usize)
    }

    fn bilinear(&self, map: &SourceMap, dx: u32, dy: u32) -> Option<[u8; 4]> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let (x, y) = map.source_point(dx, dy)?;
        let fx = (x - 0.5).clamp(0.0, (self.width - 1) as f64);
        let fy = (y - 0.5).clamp(0.0, (self.height - 1) as f64);
        let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(self.width - 1), (y0 + 1).min(self.height - 1));
        let (tx, ty) = (fx - x0 as f64, fy - y0 as f64);

        let top_left = self.get(x0, y0)?;
        let top_right = self.get(x1, y0)?;
        let bottom_left = self.get(x0, y1)?;
        let bottom_right = self.get(x1, y1)?;

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = top_left[c] as f64 * (1.0 - tx) + top_right[c] as f64 * tx;
            let bottom = bottom_left[c] as f64 * (1.0 - tx) + bottom_right[c] as f64 * tx;
            out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
        }
        Some(out)
    }

    fn sample(&self, map: &SourceMap, quality: RenderQuality, dx: u32, dy: u32) -> Option<[u8; 4]> {
        match quality {
            RenderQuality::Fast => self.nearest(map, dx, dy),
            RenderQuality::High => self.bilinear(map, dx, dy),
        }
    }
}

/// Visit every visible destination pixel; `blend` returns whether it wrote
fn composite_with<F>(surface: &mut Surface, area: &DrawArea, mut blend: F) -> CompositeStats
where
    F: FnMut(u32, u32, &mut [u8]) -> bool,
{
    let mut stats = CompositeStats::default();
    if area.visible.is_empty() {
        return stats;
    }

    let stride = surface.stride();
    let pixels = surface.pixels_mut();
    for y in area.visible.top..area.visible.bottom {
        let dy = (y - area.origin_y) as u32;
        let row = y as usize * stride;
        for x in area.visible.left..area.visible.right {
            let dx = (x - area.origin_x) as u32;
            let offset = row + x as usize * 4;
            if blend(dx, dy, &mut pixels[offset..offset + 4]) {
                stats.drawn += 1;
            } else {
                stats.skipped += 1;
            }
        }
    }
    stats
}

/// Bytes per row of one monochrome mask
fn mask_stride(raster: &Raster) -> usize {
    let rows = raster.original_height as u64 * 2;
    let from_length = if rows == 0 { 0 } else { raster.data_length / rows };
    if from_length > 0 {
        from_length as usize
    } else {
        (raster.original_width as usize).div_ceil(8)
    }
}

/// Draw a cursor record at its hotspot-adjusted position
pub fn composite_cursor(
    surface: &mut Surface,
    cursor: &CursorRecord,
    payload: &[u8],
    placement: &Placement,
    quality: RenderQuality,
) -> Result<CompositeStats, RenderError> {
    let raster = &cursor.raster;
    // Masks are bit planes whatever the header says; only BGRA texels need 4x8
    let is_bgra = (raster.channel_count, raster.bits_per_channel) == (4, 8);
    if cursor.cursor_type != CursorType::Monochrome && !is_bgra {
        return Err(RenderError::UnsupportedFormat {
            channels: raster.channel_count,
            bits: raster.bits_per_channel,
            what: "cursor",
        });
    }

    let area = DrawArea::new(
        placement.left + raster.left as i64 - cursor.x_hotspot as i64,
        placement.top + raster.top as i64 - cursor.y_hotspot as i64,
        raster.width,
        raster.height,
        placement.clip_for(surface),
    );
    let map = SourceMap::new(raster);

    let stats = match cursor.cursor_type {
        CursorType::Monochrome => {
            let stride = mask_stride(raster);
            let xor_base = raster.original_height as usize * stride;
            composite_with(surface, &area, |dx, dy, dst| {
                let Some((sx, sy)) = map.nearest(dx, dy) else {
                    return false;
                };
                let byte = sy as usize * stride + sx as usize / 8;
                let bit = 0x80u8 >> (sx % 8);
                let (Some(&and), Some(&xor)) = (payload.get(byte), payload.get(xor_base + byte)) else {
                    return false;
                };

                let and_mask = if and & bit != 0 { 0xFF } else { 0x00 };
                let xor_mask = if xor & bit != 0 { 0xFF } else { 0x00 };
                for channel in &mut dst[..3] {
                    *channel = (*channel & and_mask) ^ xor_mask;
                }
                dst[3] = 0xFF;
                true
            })
        }
        CursorType::Color => {
            let texels = Texels::new(payload, raster);
            composite_with(surface, &area, |dx, dy, dst| {
                let Some(src) = texels.sample(&map, quality, dx, dy) else {
                    return false;
                };
                if src[3] == 0 {
                    return false;
                }

                // 0..=256 scale: an opaque source replaces the destination exactly
                let alpha = src[3] as u32 + 1;
                let inverse = 256 - alpha;
                for c in 0..3 {
                    dst[c] = ((alpha * src[c] as u32 + inverse * dst[c] as u32) >> 8) as u8;
                }
                true
            })
        }
        CursorType::MaskedColor => {
            let texels = Texels::new(payload, raster);
            composite_with(surface, &area, |dx, dy, dst| {
                let Some(src) = texels.nearest(&map, dx, dy) else {
                    return false;
                };
                if src[3] == 0 {
                    dst[..3].copy_from_slice(&src[..3]);
                } else {
                    for c in 0..3 {
                        dst[c] ^= src[c];
                    }
                }
                true
            })
        }
    };

    Ok(stats)
}

/// Draw a frame record with the placement's opacity
pub fn composite_frame(
    surface: &mut Surface,
    frame: &FrameRecord,
    payload: &[u8],
    placement: &Placement,
    quality: RenderQuality,
) -> Result<CompositeStats, RenderError> {
    let raster = &frame.raster;
    if raster.bits_per_channel != 8 || !matches!(raster.channel_count, 3 | 4) {
        return Err(RenderError::UnsupportedFormat {
            channels: raster.channel_count,
            bits: raster.bits_per_channel,
            what: "frame",
        });
    }

    let weight = (placement.opacity.clamp(0.0, 1.0) * 256.0).round() as u32;
    if weight == 0 {
        return Ok(CompositeStats::default());
    }
    let inverse = 256 - weight;

    let area = DrawArea::new(
        placement.left + raster.left as i64,
        placement.top + raster.top as i64,
        raster.width,
        raster.height,
        placement.clip_for(surface),
    );
    let map = SourceMap::new(raster);
    let texels = Texels::new(payload, raster);

    // Captured frames are opaque; their alpha byte is ignored
    Ok(composite_with(surface, &area, |dx, dy, dst| {
        let Some(src) = texels.sample(&map, quality, dx, dy) else {
            return false;
        };
        for c in 0..3 {
            dst[c] = ((weight * src[c] as u32 + inverse * dst[c] as u32) >> 8) as u8;
        }
        dst[3] = 0xFF;
        true
    }))
}

/// Draw any record; key records have nothing to draw
pub fn composite_record(
    surface: &mut Surface,
    record: &SubSequence,
    payload: &[u8],
    placement: &Placement,
    quality: RenderQuality,
) -> Result<CompositeStats, RenderError> {
    match &record.body {
        SubSequenceBody::Frame(frame) => composite_frame(surface, frame, payload, placement, quality),
        SubSequenceBody::Cursor(cursor) => composite_cursor(surface, cursor, payload, placement, quality),
        SubSequenceBody::Key(_) => Ok(CompositeStats::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Bgra;
    use rewind_cache::{MouseButtons, RecordOrigin};

    const BG: Bgra = [10, 120, 200, 0x80];

    fn cursor(cursor_type: CursorType, width: u16, height: u16, payload_len: usize) -> CursorRecord {
        let mut raster = Raster::bgra(width, height);
        if cursor_type == CursorType::Monochrome {
            raster.channel_count = 1;
            raster.bits_per_channel = 1;
        }
        raster.data_length = payload_len as u64;
        CursorRecord {
            raster,
            cursor_type,
            x_hotspot: 0,
            y_hotspot: 0,
            buttons: MouseButtons::default(),
            mouse_wheel_delta: 0,
            origin: RecordOrigin::Recorded,
        }
    }

    /// 8x2 monochrome payload: AND rows then XOR rows, one byte each
    fn mono_payload(and: u8, xor: u8) -> Vec<u8> {
        vec![and, and, xor, xor]
    }

    #[test]
    fn test_monochrome_transparent_keeps_background() {
        let mut surface = Surface::filled(8, 2, BG);
        let payload = mono_payload(0xFF, 0x00);
        let record = cursor(CursorType::Monochrome, 8, 2, payload.len());

        let stats = composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();
        assert_eq!(stats.drawn, 16);
        for y in 0..2 {
            for x in 0..8 {
                assert_eq!(surface.pixel(x, y), Some([10, 120, 200, 0xFF]));
            }
        }
    }

    #[test]
    fn test_monochrome_masks() {
        let mut surface = Surface::filled(8, 2, BG);
        // Bit 7 (x=0): AND 0 XOR 0 -> black; bit 6 (x=1): AND 0 XOR 1 -> white;
        // bit 5 (x=2): AND 1 XOR 1 -> inverted; rest transparent
        let payload = mono_payload(0b0011_1111, 0b0110_0000);
        let record = cursor(CursorType::Monochrome, 8, 2, payload.len());
        composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();

        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0xFF]));
        assert_eq!(surface.pixel(1, 0), Some([0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(surface.pixel(2, 0), Some([!10, !120, !200, 0xFF]));
        assert_eq!(surface.pixel(3, 1), Some([10, 120, 200, 0xFF]));
    }

    #[test]
    fn test_monochrome_with_bgra_header() {
        let mut surface = Surface::filled(8, 2, BG);
        let payload = mono_payload(0b0011_1111, 0b0110_0000);
        let mut record = cursor(CursorType::Monochrome, 8, 2, payload.len());
        record.raster.channel_count = 4;
        record.raster.bits_per_channel = 8;

        let stats = composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();
        assert_eq!(stats.drawn, 16);
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0xFF]));
        assert_eq!(surface.pixel(1, 0), Some([0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(surface.pixel(2, 1), Some([!10, !120, !200, 0xFF]));
    }

    #[test]
    fn test_monochrome_stride_follows_data_length() {
        // 3 pixels wide, rows padded to 2 bytes
        let mut surface = Surface::filled(3, 1, BG);
        let payload = vec![0x00, 0xAA, 0xE0, 0xAA];
        let record = cursor(CursorType::Monochrome, 3, 1, payload.len());
        composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();
        for x in 0..3 {
            assert_eq!(surface.pixel(x, 0), Some([0xFF, 0xFF, 0xFF, 0xFF]));
        }
    }

    #[test]
    fn test_color_alpha_extremes() {
        let mut surface = Surface::filled(2, 1, BG);
        let payload = vec![1, 2, 3, 0, 50, 60, 70, 255];
        let record = cursor(CursorType::Color, 2, 1, payload.len());
        let stats = composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();

        assert_eq!(surface.pixel(0, 0), Some(BG));
        assert_eq!(surface.pixel(1, 0), Some([50, 60, 70, BG[3]]));
        assert_eq!(stats, CompositeStats { drawn: 1, skipped: 1 });
    }

    #[test]
    fn test_color_partial_alpha_uses_256_scale() {
        let mut surface = Surface::filled(1, 1, [0, 100, 200, 255]);
        let payload = vec![255, 0, 100, 127];
        let record = cursor(CursorType::Color, 1, 1, payload.len());
        composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();

        // alpha' = 128, inv = 128
        let expect = |s: u32, d: u32| ((128 * s + 128 * d) >> 8) as u8;
        assert_eq!(surface.pixel(0, 0), Some([expect(255, 0), expect(0, 100), expect(100, 200), 255]));
    }

    #[test]
    fn test_masked_color_copy_and_xor() {
        let mut surface = Surface::filled(2, 1, BG);
        let payload = vec![1, 2, 3, 0, 0xFF, 0x0F, 0xF0, 1];
        let record = cursor(CursorType::MaskedColor, 2, 1, payload.len());
        composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();

        assert_eq!(surface.pixel(0, 0), Some([1, 2, 3, BG[3]]));
        assert_eq!(surface.pixel(1, 0), Some([10 ^ 0xFF, 120 ^ 0x0F, 200 ^ 0xF0, BG[3]]));
    }

    #[test]
    fn test_hotspot_and_negative_position_clip() {
        let mut surface = Surface::filled(4, 4, BG);
        let payload: Vec<u8> = std::iter::repeat([9, 9, 9, 255]).take(9).flatten().collect();
        let mut record = cursor(CursorType::Color, 3, 3, payload.len());
        record.raster.left = 0;
        record.raster.top = 0;
        record.x_hotspot = 1;
        record.y_hotspot = 2;

        let stats = composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();
        // Origin (-1, -2): only the 2x1 bottom-right part is visible
        assert_eq!(stats.drawn, 2);
        assert_eq!(surface.pixel(0, 0), Some([9, 9, 9, BG[3]]));
        assert_eq!(surface.pixel(1, 0), Some([9, 9, 9, BG[3]]));
        assert_eq!(surface.pixel(2, 0), Some(BG));
        assert_eq!(surface.pixel(0, 1), Some(BG));
    }

    #[test]
    fn test_no_writes_outside_clip() {
        let mut surface = Surface::filled(6, 6, BG);
        let payload: Vec<u8> = std::iter::repeat([7, 7, 7, 255]).take(16).flatten().collect();
        let mut record = cursor(CursorType::Color, 4, 4, payload.len());
        record.raster.left = 3;
        record.raster.top = -2;

        // Sequence occupies the inner 4x4; everything else is a guard band
        let placement = Placement::at(1, 1).clipped_to(ClipRect::new(1, 1, 4, 4));
        composite_cursor(&mut surface, &record, &payload, &placement, RenderQuality::Fast).unwrap();

        for y in 0..6 {
            for x in 0..6 {
                let inside = (4..5).contains(&x) && (1..3).contains(&y);
                let expected = if inside { [7, 7, 7, BG[3]] } else { BG };
                assert_eq!(surface.pixel(x, y), Some(expected), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_short_payload_skips_pixels() {
        let mut surface = Surface::filled(2, 2, BG);
        let payload = vec![5, 5, 5, 255, 6, 6, 6, 255];
        let record = cursor(CursorType::Color, 2, 2, 16);
        let stats = composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();
        assert_eq!(stats, CompositeStats { drawn: 2, skipped: 2 });
        assert_eq!(surface.pixel(0, 1), Some(BG));
    }

    #[test]
    fn test_nearest_resize_doubles_pixels() {
        let mut surface = Surface::filled(4, 2, [0, 0, 0, 255]);
        let payload = vec![1, 1, 1, 255, 2, 2, 2, 255];
        let mut record = cursor(CursorType::MaskedColor, 2, 1, payload.len());
        record.raster.width = 4;
        record.raster.height = 2;
        composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();

        let row: Vec<_> = (0..4).map(|x| surface.pixel(x, 1).unwrap()[0]).collect();
        assert_eq!(row, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_bilinear_blends_neighbours() {
        let mut surface = Surface::filled(4, 1, [0, 0, 0, 255]);
        let payload = vec![0, 0, 0, 255, 200, 200, 200, 255];
        let mut record = cursor(CursorType::Color, 2, 1, payload.len());
        record.raster.width = 4;

        composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::High).unwrap();
        let row: Vec<_> = (0..4).map(|x| surface.pixel(x, 0).unwrap()[0]).collect();
        assert_eq!(row[0], 0);
        assert_eq!(row[3], 200);
        assert!(row[1] > 0 && row[1] < row[2] && row[2] < 200);
    }

    #[test]
    fn test_rotation_half_turn_mirrors() {
        let mut surface = Surface::filled(2, 1, [0, 0, 0, 255]);
        let payload = vec![1, 1, 1, 0, 2, 2, 2, 0];
        let mut record = cursor(CursorType::MaskedColor, 2, 1, payload.len());
        record.raster.angle = 180.0;
        composite_cursor(&mut surface, &record, &payload, &Placement::at(0, 0), RenderQuality::Fast).unwrap();
        assert_eq!(surface.pixel(0, 0).unwrap()[0], 2);
        assert_eq!(surface.pixel(1, 0).unwrap()[0], 1);
    }

    #[test]
    fn test_frame_opacity_and_format() {
        let raster = Raster::bgra(1, 1).at(1, 0);
        let frame = FrameRecord {
            raster,
            expected_delay_ms: 0,
        };
        let mut surface = Surface::filled(2, 1, [0, 0, 0, 0]);
        composite_frame(&mut surface, &frame, &[200, 100, 50, 0], &Placement::at(0, 0).with_opacity(0.5), RenderQuality::Fast).unwrap();
        assert_eq!(surface.pixel(1, 0), Some([100, 50, 25, 0xFF]));
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));

        let mut bad = frame;
        bad.raster.bits_per_channel = 16;
        let err = composite_frame(&mut surface, &bad, &[], &Placement::at(0, 0), RenderQuality::Fast).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFormat { what: "frame", .. }));
    }

    #[test]
    fn test_mismatched_cursor_format_is_rejected() {
        let mut surface = Surface::new(1, 1);
        let mut record = cursor(CursorType::Color, 1, 1, 4);
        record.raster.channel_count = 3;
        assert!(composite_cursor(&mut surface, &record, &[0; 4], &Placement::at(0, 0), RenderQuality::Fast).is_err());
    }
}
