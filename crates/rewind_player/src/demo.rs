// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synthesized demo recording.
//!
//! Writes a small project with a screen track, a cursor track using every
//! cursor encoding (including a resized and a rotated cursor) and a key
//! track, the same way a recorder would.

use crate::error::Result;
use rewind_cache::{
    ticks_from_millis, CacheWriter, CursorType, KeyModifiers, KeyRecord, Raster, SubSequence,
    SubSequenceBody, SubSequenceKind,
};
use rewind_sequencer::{Project, Sequence, Track};
use std::path::Path;

/// Demo canvas width
pub const DEMO_WIDTH: u16 = 320;
/// Demo canvas height
pub const DEMO_HEIGHT: u16 = 200;

const FRAME_COUNT: i64 = 8;
const FRAME_INTERVAL_MS: i64 = 250;

/// What the demo wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemoSummary {
    /// Frame records
    pub frames: usize,
    /// Cursor records
    pub cursors: usize,
    /// Key records
    pub keys: usize,
}

/// Write the demo project into `dir`
pub fn write_demo(dir: &Path) -> Result<(Project, DemoSummary)> {
    std::fs::create_dir_all(dir.join("caches"))?;

    let summary = DemoSummary {
        frames: write_frames(&dir.join("caches/screen.cache"))?,
        cursors: write_cursors(&dir.join("caches/cursor.cache"))?,
        keys: write_keys(&dir.join("caches/keys.cache"))?,
    };

    let mut project = Project::new("Rewind demo", DEMO_WIDTH, DEMO_HEIGHT)
        .with_background([32, 24, 24, 255])
        .with_directory(dir);

    let mut screen = Track::new("Screen");
    screen.add_sequence(
        Sequence::new("Desktop", SubSequenceKind::Frame, "caches/screen.cache")
            .placed(0, 0, DEMO_WIDTH, DEMO_HEIGHT),
    );
    let mut cursor = Track::new("Cursor");
    cursor.add_sequence(
        Sequence::new("Pointer", SubSequenceKind::Cursor, "caches/cursor.cache")
            .placed(0, 0, DEMO_WIDTH, DEMO_HEIGHT),
    );
    let mut keys = Track::new("Keys");
    keys.add_sequence(Sequence::new("Keyboard", SubSequenceKind::Key, "caches/keys.cache"));

    project.add_track(screen);
    project.add_track(cursor);
    project.add_track(keys);
    project.save()?;

    let project = Project::open(dir)?;
    tracing::info!(
        "Wrote demo with {} frames, {} cursors and {} keys to {:?}",
        summary.frames,
        summary.cursors,
        summary.keys,
        dir
    );
    Ok((project, summary))
}

/// BGR gradient with a bright window sliding across
fn frame_pixels(index: i64) -> Vec<u8> {
    let (width, height) = (DEMO_WIDTH as i64, DEMO_HEIGHT as i64);
    let window_left = 20 + index * 30;
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let in_window = (window_left..window_left + 120).contains(&x) && (40..140).contains(&y);
            if in_window {
                let title_bar = y < 52;
                pixels.extend_from_slice(if title_bar { &[200, 120, 40] } else { &[235, 235, 235] });
            } else {
                pixels.extend_from_slice(&[(x * 255 / width) as u8, 64, (y * 255 / height) as u8]);
            }
        }
    }
    pixels
}

fn write_frames(path: &Path) -> Result<usize> {
    let mut writer = CacheWriter::create(path)?;
    for index in 0..FRAME_COUNT {
        let mut raster = Raster::bgra(DEMO_WIDTH, DEMO_HEIGHT);
        raster.channel_count = 3;
        let record = SubSequence::frame(ticks_from_millis(index * FRAME_INTERVAL_MS), raster, FRAME_INTERVAL_MS as u32);
        writer.append(record, &frame_pixels(index))?;
    }
    let count = writer.records_written();
    writer.finish()?;
    Ok(count)
}

/// 12x12 arrow: black outline, white fill, transparent outside
fn arrow_pixels() -> Vec<u8> {
    let mut pixels = Vec::with_capacity(12 * 12 * 4);
    for y in 0..12 {
        for x in 0..12 {
            let pixel = if x > y {
                [0, 0, 0, 0]
            } else if x == 0 || x == y || y == 11 {
                [0, 0, 0, 255]
            } else {
                [255, 255, 255, 230]
            };
            pixels.extend_from_slice(&pixel);
        }
    }
    pixels
}

/// 8x16 I-beam as AND then XOR masks; the beam inverts what is under it
fn ibeam_masks() -> Vec<u8> {
    let rows: Vec<u8> = (0..16)
        .map(|y| if y == 0 || y == 15 { 0b0111_1110 } else { 0b0001_1000 })
        .collect();
    let and = vec![0xFF; 16];
    and.into_iter().chain(rows).collect()
}

/// 8x8 crosshair: inverting lines around a copied black centre
fn crosshair_pixels() -> Vec<u8> {
    let mut pixels = Vec::with_capacity(8 * 8 * 4);
    for y in 0..8 {
        for x in 0..8 {
            let pixel = if (x, y) == (3, 3) || (x, y) == (4, 4) {
                [0, 0, 0, 0]
            } else if x == 3 || x == 4 || y == 3 || y == 4 {
                [255, 255, 255, 1]
            } else {
                [0, 0, 0, 1]
            };
            pixels.extend_from_slice(&pixel);
        }
    }
    pixels
}

fn cursor_record(ms: i64, raster: Raster, cursor_type: CursorType, hotspot: (u16, u16), pressed: bool) -> SubSequence {
    let mut record = SubSequence::cursor(ticks_from_millis(ms), raster, cursor_type, hotspot.0, hotspot.1);
    if let SubSequenceBody::Cursor(cursor) = &mut record.body {
        cursor.buttons.left = pressed;
    }
    record
}

fn write_cursors(path: &Path) -> Result<usize> {
    let mut writer = CacheWriter::create(path)?;
    let arrow = arrow_pixels();

    // Arrow gliding over the window, clicking on the title bar
    for step in 0..10 {
        let raster = Raster::bgra(12, 12).at(30 + step * 18, 30 + step * 9);
        writer.append(cursor_record(step as i64 * 100, raster, CursorType::Color, (0, 0), step == 4), &arrow)?;
    }

    let mut ibeam = Raster::bgra(8, 16).at(150, 100);
    ibeam.channel_count = 1;
    ibeam.bits_per_channel = 1;
    writer.append(cursor_record(1_000, ibeam, CursorType::Monochrome, (3, 8), false), &ibeam_masks())?;

    let crosshair = Raster::bgra(8, 8).at(200, 120);
    writer.append(cursor_record(1_500, crosshair, CursorType::MaskedColor, (4, 4), false), &crosshair_pixels())?;

    let enlarged = Raster::bgra(12, 12).at(240, 60).scaled_to(24, 24).rotated(30.0);
    writer.append(cursor_record(1_800, enlarged, CursorType::Color, (0, 0), false), &arrow)?;

    let count = writer.records_written();
    writer.finish()?;
    Ok(count)
}

fn write_keys(path: &Path) -> Result<usize> {
    let mut writer = CacheWriter::create(path)?;
    let presses = [
        (300, 0x48, KeyModifiers { shift: true, ..Default::default() }, true),
        (420, 0x49, KeyModifiers::default(), false),
        (1_200, 0x0D, KeyModifiers::default(), false),
        (1_650, 0x53, KeyModifiers { control: true, ..Default::default() }, false),
    ];
    for (ms, key_code, modifiers, is_uppercase) in presses {
        let key = KeyRecord {
            key_code,
            modifiers,
            is_uppercase,
            was_injected: false,
        };
        writer.append(SubSequence::key(ticks_from_millis(ms), key), &[])?;
    }
    let count = writer.records_written();
    writer.finish()?;
    Ok(count)
}
