// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-layout record headers.
//!
//! Layout, little-endian:
//!
//! | block  | fields | bytes |
//! |--------|--------|-------|
//! | common | kind `u8`, timestamp `i64` | 9 |
//! | raster | left `i32`, top `i32`, width `u16`, height `u16`, angle `f64`, original width `u16`, original height `u16`, horizontal dpi `f64`, vertical dpi `f64`, channels `u8`, bits `u8`, data length `u64` | 50 |
//! | frame  | common, raster, expected delay `u32` | 63 |
//! | cursor | common, raster, cursor type `u8`, hotspot x `u16`, hotspot y `u16`, buttons `u8`, wheel delta `i32` | 69 |
//! | key    | common, key code `u16`, modifiers `u8`, flags `u8` | 13 |
//!
//! The payload of `data length` bytes follows the header immediately.

use crate::error::{CacheError, Result};
use crate::record::{
    CursorRecord, CursorType, FrameRecord, KeyModifiers, KeyRecord, MouseButtons, Raster,
    RecordOrigin, SubSequence, SubSequenceBody, SubSequenceKind,
};
use crate::stream::{StreamReader, StreamWriter};
use std::io::{Read, Write};

/// Bytes shared by every record header
pub const SUB_SEQUENCE_HEADER_SIZE: u64 = 1 + 8;

/// Bytes of the raster block
pub const RASTER_BLOCK_SIZE: u64 = 4 + 4 + 2 + 2 + 8 + 2 + 2 + 8 + 8 + 1 + 1 + 8;

/// Header size of a frame record
pub const FRAME_HEADER_SIZE: u64 = SUB_SEQUENCE_HEADER_SIZE + RASTER_BLOCK_SIZE + 4;

/// Header size of a cursor record
pub const CURSOR_HEADER_SIZE: u64 = SUB_SEQUENCE_HEADER_SIZE + RASTER_BLOCK_SIZE + 1 + 2 + 2 + 1 + 4;

/// Header size of a key record
pub const KEY_HEADER_SIZE: u64 = SUB_SEQUENCE_HEADER_SIZE + 2 + 1 + 1;

/// Write a record header and return its size in bytes
pub fn write_header<W: Write>(writer: &mut StreamWriter<W>, record: &SubSequence) -> Result<u64> {
    let start = writer.position();

    writer.write_u8(record.kind().to_byte())?;
    writer.write_i64(record.timestamp_ticks)?;

    match &record.body {
        SubSequenceBody::Frame(frame) => {
            write_raster(writer, &frame.raster)?;
            writer.write_u32(frame.expected_delay_ms)?;
        }
        SubSequenceBody::Cursor(cursor) => {
            write_raster(writer, &cursor.raster)?;
            writer.write_u8(cursor.cursor_type.to_byte())?;
            writer.write_u16(cursor.x_hotspot)?;
            writer.write_u16(cursor.y_hotspot)?;
            writer.write_u8(cursor.buttons.to_bits())?;
            writer.write_i32(cursor.mouse_wheel_delta)?;
        }
        SubSequenceBody::Key(key) => {
            writer.write_u16(key.key_code)?;
            writer.write_u8(key.modifiers.to_bits())?;
            writer.write_u8(key.flags())?;
        }
    }

    let written = writer.position() - start;
    debug_assert_eq!(written, record.header_size());
    Ok(written)
}

fn write_raster<W: Write>(writer: &mut StreamWriter<W>, raster: &Raster) -> Result<()> {
    writer.write_i32(raster.left)?;
    writer.write_i32(raster.top)?;
    writer.write_u16(raster.width)?;
    writer.write_u16(raster.height)?;
    writer.write_f64(raster.angle)?;
    writer.write_u16(raster.original_width)?;
    writer.write_u16(raster.original_height)?;
    writer.write_f64(raster.horizontal_dpi)?;
    writer.write_f64(raster.vertical_dpi)?;
    writer.write_u8(raster.channel_count)?;
    writer.write_u8(raster.bits_per_channel)?;
    writer.write_u64(raster.data_length)
}

/// Decoded header that has not been validated yet.
///
/// Reading and validating are split so a scan can still skip past a
/// record whose fields are out of range.
#[derive(Debug, Clone)]
pub struct RawHeader {
    /// Decoded record, with `stream_position` set
    pub record: SubSequence,
    /// Field that could not be represented (e.g. an unknown cursor type)
    pub defect: Option<String>,
}

impl RawHeader {
    /// Validate the decoded fields
    pub fn into_record(self) -> Result<SubSequence> {
        if let Some(reason) = self.defect {
            return Err(CacheError::malformed(self.record.stream_position, reason));
        }
        validate(&self.record)?;
        Ok(self.record)
    }
}

/// Read a header at the reader's current position without validating it
pub fn read_raw_header<R: Read>(reader: &mut StreamReader<R>) -> Result<RawHeader> {
    let position = reader.position();
    let kind_byte = reader.read_u8()?;
    let kind = SubSequenceKind::from_byte(kind_byte)
        .ok_or_else(|| CacheError::malformed(position, format!("unknown record kind {kind_byte}")))?;
    let timestamp_ticks = reader.read_i64()?;
    let mut defect = None;

    let body = match kind {
        SubSequenceKind::Frame => {
            let raster = read_raster(reader)?;
            let expected_delay_ms = reader.read_u32()?;
            SubSequenceBody::Frame(FrameRecord {
                raster,
                expected_delay_ms,
            })
        }
        SubSequenceKind::Cursor => {
            let raster = read_raster(reader)?;
            let type_byte = reader.read_u8()?;
            let x_hotspot = reader.read_u16()?;
            let y_hotspot = reader.read_u16()?;
            let buttons = MouseButtons::from_bits(reader.read_u8()?);
            let mouse_wheel_delta = reader.read_i32()?;
            let cursor_type = CursorType::from_byte(type_byte).unwrap_or_else(|| {
                defect = Some(format!("unknown cursor type {type_byte}"));
                CursorType::Monochrome
            });
            SubSequenceBody::Cursor(CursorRecord {
                raster,
                cursor_type,
                x_hotspot,
                y_hotspot,
                buttons,
                mouse_wheel_delta,
                origin: RecordOrigin::Loaded,
            })
        }
        SubSequenceKind::Key => {
            let key_code = reader.read_u16()?;
            let modifiers = KeyModifiers::from_bits(reader.read_u8()?);
            let flags = reader.read_u8()?;
            SubSequenceBody::Key(KeyRecord {
                key_code,
                modifiers,
                is_uppercase: flags & 0b01 != 0,
                was_injected: flags & 0b10 != 0,
            })
        }
    };

    Ok(RawHeader {
        record: SubSequence {
            timestamp_ticks,
            stream_position: position,
            body,
        },
        defect,
    })
}

fn read_raster<R: Read>(reader: &mut StreamReader<R>) -> Result<Raster> {
    Ok(Raster {
        left: reader.read_i32()?,
        top: reader.read_i32()?,
        width: reader.read_u16()?,
        height: reader.read_u16()?,
        angle: reader.read_f64()?,
        original_width: reader.read_u16()?,
        original_height: reader.read_u16()?,
        horizontal_dpi: reader.read_f64()?,
        vertical_dpi: reader.read_f64()?,
        channel_count: reader.read_u8()?,
        bits_per_channel: reader.read_u8()?,
        data_length: reader.read_u64()?,
    })
}

/// Read and validate a header at the reader's current position
pub fn read_header<R: Read>(reader: &mut StreamReader<R>) -> Result<SubSequence> {
    read_raw_header(reader)?.into_record()
}

/// Reject header values outside their declared domain
pub fn validate(record: &SubSequence) -> Result<()> {
    let position = record.stream_position;
    let fail = |reason: String| Err(CacheError::malformed(position, reason));

    if record.timestamp_ticks < 0 {
        return fail(format!("negative timestamp {}", record.timestamp_ticks));
    }

    let Some(raster) = record.raster() else {
        return Ok(());
    };

    let empty = raster.width == 0
        || raster.height == 0
        || raster.original_width == 0
        || raster.original_height == 0;
    if empty && raster.data_length > 0 {
        return fail(format!(
            "{}x{} (stored {}x{}) raster claims {} payload bytes",
            raster.width, raster.height, raster.original_width, raster.original_height, raster.data_length
        ));
    }
    if !empty && raster.data_length == 0 {
        return fail(format!(
            "{}x{} raster has no payload",
            raster.original_width, raster.original_height
        ));
    }
    if raster.channel_count == 0 || raster.channel_count > 4 {
        return fail(format!("channel count {} out of range", raster.channel_count));
    }
    if !matches!(raster.bits_per_channel, 1 | 8 | 16) {
        return fail(format!("{} bits per channel is not supported", raster.bits_per_channel));
    }
    if !raster.angle.is_finite() {
        return fail("rotation angle is not finite".to_string());
    }
    let dpi_ok = |dpi: f64| dpi.is_finite() && dpi > 0.0;
    if !dpi_ok(raster.horizontal_dpi) || !dpi_ok(raster.vertical_dpi) {
        return fail(format!(
            "invalid dpi {}x{}",
            raster.horizontal_dpi, raster.vertical_dpi
        ));
    }

    if let Some(cursor) = record.as_cursor() {
        if cursor.x_hotspot > raster.original_width || cursor.y_hotspot > raster.original_height {
            return fail(format!(
                "hotspot ({}, {}) outside {}x{} cursor",
                cursor.x_hotspot, cursor.y_hotspot, raster.original_width, raster.original_height
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cursor_record() -> SubSequence {
        let raster = Raster::bgra(32, 32).at(-4, 17).scaled_to(48, 48).rotated(90.0);
        let mut record = SubSequence::cursor(1_234_567, raster, CursorType::Color, 3, 5);
        if let SubSequenceBody::Cursor(cursor) = &mut record.body {
            cursor.buttons.right = true;
            cursor.mouse_wheel_delta = -120;
        }
        record
    }

    #[test]
    fn test_header_sizes() {
        assert_eq!(SUB_SEQUENCE_HEADER_SIZE, 9);
        assert_eq!(RASTER_BLOCK_SIZE, 50);
        assert_eq!(FRAME_HEADER_SIZE, 63);
        assert_eq!(CURSOR_HEADER_SIZE, 69);
        assert_eq!(KEY_HEADER_SIZE, 13);

        let records = [
            SubSequence::frame(0, Raster::bgra(4, 4), 33),
            cursor_record(),
            SubSequence::key(0, KeyRecord {
                key_code: 13,
                modifiers: KeyModifiers::default(),
                is_uppercase: false,
                was_injected: false,
            }),
        ];
        for record in records {
            let mut writer = StreamWriter::new(Vec::new());
            let written = write_header(&mut writer, &record).unwrap();
            assert_eq!(written, record.header_size());
            assert_eq!(writer.into_inner().len() as u64, record.header_size());
        }
    }

    #[test]
    fn test_cursor_header_round_trip() {
        let mut original = cursor_record();
        original.stream_position = 7;

        // Offset the header inside the stream to check stream positions
        let mut writer = StreamWriter::new(Vec::new());
        writer.write_bytes(&[0xFF; 7]).unwrap();
        write_header(&mut writer, &original).unwrap();

        let mut reader = StreamReader::new(Cursor::new(writer.into_inner()));
        reader.read_bytes(7).unwrap();
        let decoded = read_header(&mut reader).unwrap();

        assert_eq!(decoded.stream_position, 7);
        assert_eq!(decoded.data_stream_position(), original.data_stream_position());
        assert_eq!(decoded.timestamp_ticks, original.timestamp_ticks);
        assert_eq!(decoded.raster(), original.raster());

        let (a, b) = (decoded.as_cursor().unwrap(), original.as_cursor().unwrap());
        assert_eq!(a.cursor_type, b.cursor_type);
        assert_eq!((a.x_hotspot, a.y_hotspot), (3, 5));
        assert_eq!(a.buttons, b.buttons);
        assert_eq!(a.mouse_wheel_delta, -120);
        assert_eq!(a.origin, RecordOrigin::Loaded);
        assert_eq!(b.origin, RecordOrigin::Recorded);
    }

    #[test]
    fn test_frame_header_round_trip() {
        let mut raster = Raster::bgra(64, 32).at(12, -8).scaled_to(128, 16).rotated(-45.5);
        raster.channel_count = 3;
        raster.horizontal_dpi = 144.0;
        raster.vertical_dpi = 120.0;
        raster.data_length = 64 * 32 * 3;
        let mut original = SubSequence::frame(42_000, raster, 33);
        original.stream_position = 5;

        let mut writer = StreamWriter::new(Vec::new());
        writer.write_bytes(&[0; 5]).unwrap();
        write_header(&mut writer, &original).unwrap();

        let mut reader = StreamReader::new(Cursor::new(writer.into_inner()));
        reader.read_bytes(5).unwrap();
        let decoded = read_header(&mut reader).unwrap();

        assert_eq!(decoded.stream_position, 5);
        assert_eq!(decoded.data_stream_position(), 5 + FRAME_HEADER_SIZE);
        assert_eq!(decoded.timestamp_ticks, 42_000);
        assert_eq!(decoded.raster(), Some(&raster));
        let SubSequenceBody::Frame(frame) = decoded.body else {
            panic!("expected a frame record");
        };
        assert_eq!(frame.expected_delay_ms, 33);
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_key_header_round_trip() {
        let key = KeyRecord {
            key_code: 0x41,
            modifiers: KeyModifiers {
                control: true,
                ..Default::default()
            },
            is_uppercase: true,
            was_injected: true,
        };
        let mut writer = StreamWriter::new(Vec::new());
        write_header(&mut writer, &SubSequence::key(99, key)).unwrap();

        let mut reader = StreamReader::new(Cursor::new(writer.into_inner()));
        let decoded = read_header(&mut reader).unwrap();
        assert_eq!(decoded.as_key(), Some(&key));
        assert_eq!(decoded.timestamp_ticks, 99);
    }

    #[test]
    fn test_unknown_kind_is_malformed() {
        let mut reader = StreamReader::new(Cursor::new(vec![9u8; 32]));
        let err = read_header(&mut reader).unwrap_err();
        assert!(matches!(err, CacheError::MalformedHeader { position: 0, .. }));
    }

    #[test]
    fn test_unknown_cursor_type_keeps_length() {
        let mut writer = StreamWriter::new(Vec::new());
        write_header(&mut writer, &cursor_record()).unwrap();
        let mut bytes = writer.into_inner();
        let type_offset = (SUB_SEQUENCE_HEADER_SIZE + RASTER_BLOCK_SIZE) as usize;
        bytes[type_offset] = 3;

        let mut reader = StreamReader::new(Cursor::new(bytes));
        let raw = read_raw_header(&mut reader).unwrap();
        assert!(raw.defect.is_some());
        assert_eq!(raw.record.data_length(), 32 * 32 * 4);
        assert!(matches!(raw.into_record(), Err(CacheError::MalformedHeader { .. })));
    }

    #[test]
    fn test_truncated_header() {
        let mut writer = StreamWriter::new(Vec::new());
        write_header(&mut writer, &SubSequence::frame(0, Raster::bgra(1, 1), 0)).unwrap();
        let mut bytes = writer.into_inner();
        bytes.truncate(20);

        let mut reader = StreamReader::new(Cursor::new(bytes));
        assert!(read_header(&mut reader).unwrap_err().is_truncation());
    }

    #[test]
    fn test_validation_rejects_out_of_domain_values() {
        let mut zero_sized = SubSequence::frame(0, Raster::bgra(0, 10), 0);
        zero_sized.raster_mut().unwrap().data_length = 40;
        assert!(validate(&zero_sized).is_err());

        let mut no_payload = SubSequence::frame(0, Raster::bgra(2, 2), 0);
        no_payload.raster_mut().unwrap().data_length = 0;
        assert!(validate(&no_payload).is_err());

        let mut bad_dpi = SubSequence::frame(0, Raster::bgra(2, 2), 0);
        bad_dpi.raster_mut().unwrap().horizontal_dpi = 0.0;
        assert!(validate(&bad_dpi).is_err());

        let mut bad_channels = SubSequence::frame(0, Raster::bgra(2, 2), 0);
        bad_channels.raster_mut().unwrap().channel_count = 5;
        assert!(validate(&bad_channels).is_err());

        let hotspot = SubSequence::cursor(0, Raster::bgra(8, 8), CursorType::Color, 9, 0);
        assert!(validate(&hotspot).is_err());

        let negative = SubSequence::frame(-1, Raster::bgra(2, 2), 0);
        assert!(validate(&negative).is_err());

        assert!(validate(&SubSequence::frame(0, Raster::bgra(2, 2), 0)).is_ok());
    }
}
