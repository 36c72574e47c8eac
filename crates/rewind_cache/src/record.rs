// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sub-sequence records stored in a cache file.
//!
//! A record is a tagged union: the fields every record has (kind, timestamp,
//! stream position) live on [`SubSequence`], and [`SubSequenceBody`] carries
//! only what belongs to that kind.

use crate::header;
use serde::{Deserialize, Serialize};

/// Ticks (100 ns units) per millisecond
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Ticks per second
pub const TICKS_PER_SECOND: i64 = 1_000 * TICKS_PER_MILLISECOND;

/// Convert milliseconds to ticks
pub fn ticks_from_millis(millis: i64) -> i64 {
    millis.saturating_mul(TICKS_PER_MILLISECOND)
}

/// Convert ticks to milliseconds, truncating
pub fn millis_from_ticks(ticks: i64) -> i64 {
    ticks / TICKS_PER_MILLISECOND
}

/// Record discriminant, as stored in the first header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubSequenceKind {
    /// Captured screen frame
    Frame,
    /// Cursor image and mouse state
    Cursor,
    /// Key press
    Key,
}

impl SubSequenceKind {
    /// Discriminant byte
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Frame => 1,
            Self::Cursor => 2,
            Self::Key => 3,
        }
    }

    /// Parse a discriminant byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Frame),
            2 => Some(Self::Cursor),
            3 => Some(Self::Key),
            _ => None,
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Frame => "Frame",
            Self::Cursor => "Cursor",
            Self::Key => "Key",
        }
    }

    /// Fixed header size of records of this kind
    pub fn header_size(self) -> u64 {
        match self {
            Self::Frame => header::FRAME_HEADER_SIZE,
            Self::Cursor => header::CURSOR_HEADER_SIZE,
            Self::Key => header::KEY_HEADER_SIZE,
        }
    }
}

/// Pixel encoding of a cursor payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorType {
    /// Stacked AND and XOR 1-bit masks
    Monochrome,
    /// Straight BGRA with per-pixel alpha
    Color,
    /// BGRA where the alpha byte is an XOR flag
    MaskedColor,
}

impl CursorType {
    /// Value stored in the header
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Monochrome => 1,
            Self::Color => 2,
            Self::MaskedColor => 4,
        }
    }

    /// Parse a header value
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Monochrome),
            2 => Some(Self::Color),
            4 => Some(Self::MaskedColor),
            _ => None,
        }
    }
}

/// Mouse buttons held while a cursor record was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MouseButtons {
    /// Left button
    pub left: bool,
    /// Right button
    pub right: bool,
    /// Middle button
    pub middle: bool,
    /// First extra button
    pub first_extra: bool,
    /// Second extra button
    pub second_extra: bool,
}

impl MouseButtons {
    /// Pack into the header flag byte
    pub fn to_bits(self) -> u8 {
        (self.left as u8)
            | (self.right as u8) << 1
            | (self.middle as u8) << 2
            | (self.first_extra as u8) << 3
            | (self.second_extra as u8) << 4
    }

    /// Unpack the header flag byte, ignoring unknown bits
    pub fn from_bits(bits: u8) -> Self {
        Self {
            left: bits & 0b0_0001 != 0,
            right: bits & 0b0_0010 != 0,
            middle: bits & 0b0_0100 != 0,
            first_extra: bits & 0b0_1000 != 0,
            second_extra: bits & 0b1_0000 != 0,
        }
    }

    /// Whether any button is down
    pub fn any(self) -> bool {
        self.to_bits() != 0
    }
}

/// Keyboard modifiers held during a key record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyModifiers {
    /// Shift
    pub shift: bool,
    /// Control
    pub control: bool,
    /// Alt
    pub alt: bool,
    /// Windows / command key
    pub windows: bool,
}

impl KeyModifiers {
    /// Pack into the header byte
    pub fn to_bits(self) -> u8 {
        (self.shift as u8)
            | (self.control as u8) << 1
            | (self.alt as u8) << 2
            | (self.windows as u8) << 3
    }

    /// Unpack the header byte
    pub fn from_bits(bits: u8) -> Self {
        Self {
            shift: bits & 0b0001 != 0,
            control: bits & 0b0010 != 0,
            alt: bits & 0b0100 != 0,
            windows: bits & 0b1000 != 0,
        }
    }
}

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordOrigin {
    /// Produced by a live recording session
    Recorded,
    /// Read back from a cache file
    #[default]
    Loaded,
}

/// Geometry and pixel metadata shared by frame and cursor records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    /// Horizontal position within the sequence
    pub left: i32,
    /// Vertical position within the sequence
    pub top: i32,
    /// Rendered width
    pub width: u16,
    /// Rendered height
    pub height: u16,
    /// Rotation in degrees, clockwise
    pub angle: f64,
    /// Width of the stored bitmap
    pub original_width: u16,
    /// Height of the stored bitmap
    pub original_height: u16,
    /// Horizontal DPI of the capture
    pub horizontal_dpi: f64,
    /// Vertical DPI of the capture
    pub vertical_dpi: f64,
    /// Channels per pixel
    pub channel_count: u8,
    /// Bits per channel
    pub bits_per_channel: u8,
    /// Payload size in bytes
    pub data_length: u64,
}

impl Raster {
    /// Unrotated, unscaled BGRA8 raster of the given size at the origin
    pub fn bgra(width: u16, height: u16) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
            angle: 0.0,
            original_width: width,
            original_height: height,
            horizontal_dpi: 96.0,
            vertical_dpi: 96.0,
            channel_count: 4,
            bits_per_channel: 8,
            data_length: width as u64 * height as u64 * 4,
        }
    }

    /// Place the raster at a position
    pub fn at(mut self, left: i32, top: i32) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    /// Change the rendered size, keeping the stored bitmap size
    pub fn scaled_to(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the rotation
    pub fn rotated(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Whether the rendered size differs from the stored bitmap
    pub fn is_resized(&self) -> bool {
        self.width != self.original_width || self.height != self.original_height
    }

    /// Whether a rotation pass is needed
    pub fn is_rotated(&self) -> bool {
        self.angle != 0.0
    }

    /// Bytes per pixel for byte-aligned formats
    pub fn bytes_per_pixel(&self) -> usize {
        self.channel_count as usize * self.bits_per_channel as usize / 8
    }
}

/// Body of a frame record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Geometry and pixel metadata
    pub raster: Raster,
    /// Intended delay before the next frame, in milliseconds
    pub expected_delay_ms: u32,
}

/// Body of a cursor record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorRecord {
    /// Geometry and pixel metadata
    pub raster: Raster,
    /// Payload encoding
    pub cursor_type: CursorType,
    /// Click point, horizontally, within the bitmap
    pub x_hotspot: u16,
    /// Click point, vertically, within the bitmap
    pub y_hotspot: u16,
    /// Buttons held
    pub buttons: MouseButtons,
    /// Wheel delta since the previous record
    pub mouse_wheel_delta: i32,
    /// Not serialized; set by the writer or reader
    #[serde(default)]
    pub origin: RecordOrigin,
}

/// Body of a key record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Virtual key code
    pub key_code: u16,
    /// Modifiers held
    pub modifiers: KeyModifiers,
    /// Whether the key produced an uppercase character
    pub is_uppercase: bool,
    /// Whether the event was synthesized by software
    pub was_injected: bool,
}

impl KeyRecord {
    pub(crate) fn flags(&self) -> u8 {
        (self.is_uppercase as u8) | (self.was_injected as u8) << 1
    }
}

/// Kind-specific part of a record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SubSequenceBody {
    /// Screen frame
    Frame(FrameRecord),
    /// Cursor image
    Cursor(CursorRecord),
    /// Key press
    Key(KeyRecord),
}

/// One record of a sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubSequence {
    /// Offset from the start of the recording, in ticks
    pub timestamp_ticks: i64,
    /// Byte offset of the record header in the cache file
    pub stream_position: u64,
    /// Kind-specific fields
    pub body: SubSequenceBody,
}

impl SubSequence {
    /// Create a frame record (stream position is assigned when written)
    pub fn frame(timestamp_ticks: i64, raster: Raster, expected_delay_ms: u32) -> Self {
        Self {
            timestamp_ticks,
            stream_position: 0,
            body: SubSequenceBody::Frame(FrameRecord {
                raster,
                expected_delay_ms,
            }),
        }
    }

    /// Create a cursor record
    pub fn cursor(
        timestamp_ticks: i64,
        raster: Raster,
        cursor_type: CursorType,
        x_hotspot: u16,
        y_hotspot: u16,
    ) -> Self {
        Self {
            timestamp_ticks,
            stream_position: 0,
            body: SubSequenceBody::Cursor(CursorRecord {
                raster,
                cursor_type,
                x_hotspot,
                y_hotspot,
                buttons: MouseButtons::default(),
                mouse_wheel_delta: 0,
                origin: RecordOrigin::Recorded,
            }),
        }
    }

    /// Create a key record
    pub fn key(timestamp_ticks: i64, key: KeyRecord) -> Self {
        Self {
            timestamp_ticks,
            stream_position: 0,
            body: SubSequenceBody::Key(key),
        }
    }

    /// Record discriminant
    pub fn kind(&self) -> SubSequenceKind {
        match self.body {
            SubSequenceBody::Frame(_) => SubSequenceKind::Frame,
            SubSequenceBody::Cursor(_) => SubSequenceKind::Cursor,
            SubSequenceBody::Key(_) => SubSequenceKind::Key,
        }
    }

    /// Size of the header of this record
    pub fn header_size(&self) -> u64 {
        self.kind().header_size()
    }

    /// Raster metadata, for frame and cursor records
    pub fn raster(&self) -> Option<&Raster> {
        match &self.body {
            SubSequenceBody::Frame(frame) => Some(&frame.raster),
            SubSequenceBody::Cursor(cursor) => Some(&cursor.raster),
            SubSequenceBody::Key(_) => None,
        }
    }

    /// Mutable raster metadata
    pub fn raster_mut(&mut self) -> Option<&mut Raster> {
        match &mut self.body {
            SubSequenceBody::Frame(frame) => Some(&mut frame.raster),
            SubSequenceBody::Cursor(cursor) => Some(&mut cursor.raster),
            SubSequenceBody::Key(_) => None,
        }
    }

    /// Cursor body, if this is a cursor record
    pub fn as_cursor(&self) -> Option<&CursorRecord> {
        match &self.body {
            SubSequenceBody::Cursor(cursor) => Some(cursor),
            _ => None,
        }
    }

    /// Key body, if this is a key record
    pub fn as_key(&self) -> Option<&KeyRecord> {
        match &self.body {
            SubSequenceBody::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Payload size in bytes
    pub fn data_length(&self) -> u64 {
        self.raster().map_or(0, |r| r.data_length)
    }

    /// Byte offset of the payload
    pub fn data_stream_position(&self) -> u64 {
        self.stream_position.saturating_add(self.header_size())
    }

    /// Byte offset just past the payload, saturating at `u64::MAX`
    pub fn end_position(&self) -> u64 {
        self.checked_end_position().unwrap_or(u64::MAX)
    }

    /// Byte offset just past the payload, or `None` if a corrupt length
    /// puts it beyond `u64::MAX`
    pub fn checked_end_position(&self) -> Option<u64> {
        self.stream_position
            .checked_add(self.header_size())?
            .checked_add(self.data_length())
    }
}
