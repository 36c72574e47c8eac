// SPDX-License-Identifier: MIT OR Apache-2.0
//! Position-tracking binary readers and writers.
//!
//! Every primitive is little-endian. Both sides keep a running byte
//! position so the offsets recorded in record headers always match the
//! bytes actually on disk.

use crate::error::{CacheError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Width of the length prefix of a Pascal-style string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthPrefix {
    /// One byte, up to 255 bytes of text
    U8,
    /// Two bytes, up to 65535 bytes of text
    U16,
    /// Four bytes
    U32,
}

impl LengthPrefix {
    /// Size of the prefix in bytes
    pub fn bytes(self) -> u8 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    fn max_len(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
        }
    }
}

/// Number of zero bytes needed to bring `position` to a multiple of `align`
pub fn padding_for(position: u64, align: u64) -> u64 {
    if align <= 1 {
        return 0;
    }
    (align - position % align) % align
}

/// Binary writer that counts every byte it emits
pub struct StreamWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> StreamWriter<W> {
    /// Wrap a writer positioned at the start of the stream
    pub fn new(inner: W) -> Self {
        Self::with_position(inner, 0)
    }

    /// Wrap a writer that already sits at `position`
    pub fn with_position(inner: W, position: u64) -> Self {
        Self { inner, position }
    }

    /// Current stream position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write a single byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_u8(value)?;
        self.position += 1;
        Ok(())
    }

    /// Write an unsigned 16-bit integer
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        self.position += 2;
        Ok(())
    }

    /// Write a signed 16-bit integer
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.inner.write_i16::<LittleEndian>(value)?;
        self.position += 2;
        Ok(())
    }

    /// Write an unsigned 32-bit integer
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    /// Write a signed 32-bit integer
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    /// Write an unsigned 64-bit integer
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.inner.write_u64::<LittleEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Write a signed 64-bit integer
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.inner.write_i64::<LittleEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Write a double
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.inner.write_f64::<LittleEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Write zero bytes until the position is a multiple of `align`
    pub fn pad_to(&mut self, align: u64) -> Result<()> {
        let padding = padding_for(self.position, align);
        for _ in 0..padding {
            self.write_u8(0)?;
        }
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string, optionally 4-byte aligned afterwards
    pub fn write_pascal_string(&mut self, value: &str, prefix: LengthPrefix, align: bool) -> Result<()> {
        let len = value.len();
        if len as u64 > prefix.max_len() {
            return Err(CacheError::StringTooLong {
                len,
                prefix_bytes: prefix.bytes(),
            });
        }

        match prefix {
            LengthPrefix::U8 => self.write_u8(len as u8)?,
            LengthPrefix::U16 => self.write_u16(len as u16)?,
            LengthPrefix::U32 => self.write_u32(len as u32)?,
        }
        self.write_bytes(value.as_bytes())?;

        if align {
            self.pad_to(4)?;
        }
        Ok(())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Binary reader that tracks its stream position
pub struct StreamReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> StreamReader<R> {
    /// Wrap a reader positioned at the start of the stream
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Current stream position
    pub fn position(&self) -> u64 {
        self.position
    }

    fn short_read(&self, error: io::Error, needed: u64) -> CacheError {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            CacheError::TruncatedData {
                position: self.position,
                needed,
            }
        } else {
            CacheError::Io(error)
        }
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.inner.read_u8().map_err(|e| self.short_read(e, 1))?;
        self.position += 1;
        Ok(value)
    }

    /// Read an unsigned 16-bit integer
    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self
            .inner
            .read_u16::<LittleEndian>()
            .map_err(|e| self.short_read(e, 2))?;
        self.position += 2;
        Ok(value)
    }

    /// Read a signed 16-bit integer
    pub fn read_i16(&mut self) -> Result<i16> {
        let value = self
            .inner
            .read_i16::<LittleEndian>()
            .map_err(|e| self.short_read(e, 2))?;
        self.position += 2;
        Ok(value)
    }

    /// Read an unsigned 32-bit integer
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self
            .inner
            .read_u32::<LittleEndian>()
            .map_err(|e| self.short_read(e, 4))?;
        self.position += 4;
        Ok(value)
    }

    /// Read a signed 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self
            .inner
            .read_i32::<LittleEndian>()
            .map_err(|e| self.short_read(e, 4))?;
        self.position += 4;
        Ok(value)
    }

    /// Read an unsigned 64-bit integer
    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self
            .inner
            .read_u64::<LittleEndian>()
            .map_err(|e| self.short_read(e, 8))?;
        self.position += 8;
        Ok(value)
    }

    /// Read a signed 64-bit integer
    pub fn read_i64(&mut self) -> Result<i64> {
        let value = self
            .inner
            .read_i64::<LittleEndian>()
            .map_err(|e| self.short_read(e, 8))?;
        self.position += 8;
        Ok(value)
    }

    /// Read a double
    pub fn read_f64(&mut self) -> Result<f64> {
        let value = self
            .inner
            .read_f64::<LittleEndian>()
            .map_err(|e| self.short_read(e, 8))?;
        self.position += 8;
        Ok(value)
    }

    /// Read exactly `len` bytes.
    ///
    /// The buffer grows with the data actually present, so a corrupt
    /// length cannot force a huge allocation up front.
    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let read = (&mut self.inner).take(len).read_to_end(&mut buffer)? as u64;
        if read < len {
            let error = CacheError::TruncatedData {
                position: self.position,
                needed: len,
            };
            self.position += read;
            return Err(error);
        }
        self.position += read;
        Ok(buffer)
    }

    /// Skip the zero padding that brings the position to a multiple of `align`
    pub fn skip_padding(&mut self, align: u64) -> Result<()> {
        let padding = padding_for(self.position, align);
        self.read_bytes(padding)?;
        Ok(())
    }

    /// Read a length-prefixed UTF-8 string written by [`StreamWriter::write_pascal_string`]
    pub fn read_pascal_string(&mut self, prefix: LengthPrefix, align: bool) -> Result<String> {
        let start = self.position;
        let len = match prefix {
            LengthPrefix::U8 => self.read_u8()? as u64,
            LengthPrefix::U16 => self.read_u16()? as u64,
            LengthPrefix::U32 => self.read_u32()? as u64,
        };

        let bytes = self.read_bytes(len)?;
        let value = String::from_utf8(bytes)
            .map_err(|e| CacheError::malformed(start, format!("string is not valid UTF-8: {e}")))?;

        if align {
            self.skip_padding(4)?;
        }
        Ok(value)
    }

    /// Unwrap the underlying reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> StreamReader<R> {
    /// Move to an absolute stream position
    pub fn seek_to(&mut self, position: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    /// Total length of the stream in bytes
    pub fn stream_len(&mut self) -> Result<u64> {
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(self.position))?;
        Ok(len)
    }
}
