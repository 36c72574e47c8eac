// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary cache format for recorded screen sessions.
//!
//! A recording is split into sequences, and each sequence keeps its
//! records in one cache file:
//! - Frame records (captured screen pixels)
//! - Cursor records (cursor bitmap, hotspot and mouse state)
//! - Key records (key presses, no payload)
//!
//! ## Architecture
//!
//! The format is built on:
//! - Position-tracking little-endian streams
//! - Fixed-size headers per record kind, followed by the raw payload
//! - Append-only writers and read-only, scan-tolerant readers

pub mod cache;
pub mod error;
pub mod header;
pub mod record;
pub mod stream;

pub use cache::{CacheReader, CacheScan, CacheWriter, ScanFailure};
pub use error::{CacheError, Result};
pub use header::{
    read_header, write_header, CURSOR_HEADER_SIZE, FRAME_HEADER_SIZE, KEY_HEADER_SIZE,
    RASTER_BLOCK_SIZE, SUB_SEQUENCE_HEADER_SIZE,
};
pub use record::{
    millis_from_ticks, ticks_from_millis, CursorRecord, CursorType, FrameRecord, KeyModifiers,
    KeyRecord, MouseButtons, Raster, RecordOrigin, SubSequence, SubSequenceBody, SubSequenceKind,
    TICKS_PER_MILLISECOND, TICKS_PER_SECOND,
};
pub use stream::{LengthPrefix, StreamReader, StreamWriter};
