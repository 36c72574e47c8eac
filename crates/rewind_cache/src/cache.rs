// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cache files: `[header][payload]` records back to back.
//!
//! Writers append only. Readers open the file read-only, so any number of
//! readers may look at the same cache at once; a cache is never read while
//! a recording session is still writing it.

use crate::error::{CacheError, Result};
use crate::header::{read_header, read_raw_header, write_header};
use crate::record::{RecordOrigin, SubSequence, SubSequenceBody};
use crate::stream::{StreamReader, StreamWriter};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Appends records to a cache file
pub struct CacheWriter {
    writer: StreamWriter<BufWriter<File>>,
    path: PathBuf,
    records_written: usize,
}

impl CacheWriter {
    /// Create (or truncate) a cache file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        tracing::debug!("Created cache file {:?}", path);
        Ok(Self {
            writer: StreamWriter::new(BufWriter::new(file)),
            path,
            records_written: 0,
        })
    }

    /// Open an existing cache file and continue after its last byte
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().append(true).open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::MissingCache(path.clone())
            } else {
                CacheError::Io(e)
            }
        })?;
        let position = file.metadata()?.len();
        Ok(Self {
            writer: StreamWriter::with_position(BufWriter::new(file), position),
            path,
            records_written: 0,
        })
    }

    /// Position the next record will be written at
    pub fn position(&self) -> u64 {
        self.writer.position()
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended by this writer
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Append a record and its payload.
    ///
    /// The stream position and (for raster records) the data length are
    /// taken from the writer and the payload; the returned record is the one
    /// that was stored.
    pub fn append(&mut self, mut record: SubSequence, payload: &[u8]) -> Result<SubSequence> {
        record.stream_position = self.writer.position();

        match &mut record.body {
            SubSequenceBody::Frame(frame) => frame.raster.data_length = payload.len() as u64,
            SubSequenceBody::Cursor(cursor) => {
                cursor.raster.data_length = payload.len() as u64;
                cursor.origin = RecordOrigin::Recorded;
            }
            SubSequenceBody::Key(_) => {
                if !payload.is_empty() {
                    return Err(CacheError::malformed(
                        record.stream_position,
                        "key records carry no payload",
                    ));
                }
            }
        }
        crate::header::validate(&record)?;

        write_header(&mut self.writer, &record)?;
        self.writer.write_bytes(payload)?;
        debug_assert_eq!(self.writer.position(), record.end_position());

        self.records_written += 1;
        Ok(record)
    }

    /// Flush and close the file, returning its final length
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        tracing::debug!(
            "Closed cache file {:?} after {} records ({} bytes)",
            self.path,
            self.records_written,
            self.writer.position()
        );
        Ok(self.writer.position())
    }
}

/// A record the scan could not load
#[derive(Debug)]
pub struct ScanFailure {
    /// Stream position of the failed record
    pub position: u64,
    /// Why it failed
    pub error: CacheError,
}

/// Result of walking a whole cache file
#[derive(Debug, Default)]
pub struct CacheScan {
    /// Records that loaded, in file order
    pub records: Vec<SubSequence>,
    /// Records that were skipped
    pub failures: Vec<ScanFailure>,
}

impl CacheScan {
    /// Whether every record loaded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reads records and payloads from a cache file
pub struct CacheReader {
    reader: StreamReader<BufReader<File>>,
    path: PathBuf,
    len: u64,
}

impl CacheReader {
    /// Open a cache file read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::MissingCache(path.clone())
            } else {
                CacheError::Io(e)
            }
        })?;
        let len = file.metadata()?.len();
        Ok(Self {
            reader: StreamReader::new(BufReader::new(file)),
            path,
            len,
        })
    }

    /// Length of the cache file in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the cache file is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the header at `position`
    pub fn read_record_at(&mut self, position: u64) -> Result<SubSequence> {
        self.reader.seek_to(position)?;
        read_header(&mut self.reader)
    }

    /// Read the payload of a record
    pub fn read_payload(&mut self, record: &SubSequence) -> Result<Vec<u8>> {
        let start = record.data_stream_position();
        let length = record.data_length();
        if !record.checked_end_position().is_some_and(|end| end <= self.len) {
            return Err(CacheError::TruncatedData {
                position: start,
                needed: length,
            });
        }

        self.reader.seek_to(start)?;
        self.reader.read_bytes(length)
    }

    /// Walk every record in the file.
    ///
    /// A record with out-of-range fields is reported and skipped using its
    /// declared payload length. A record cut short by the end of the file,
    /// or whose kind is unknown, is reported and ends the walk since the
    /// next record's position cannot be known.
    pub fn scan(&mut self) -> Result<CacheScan> {
        let mut scan = CacheScan::default();
        let mut position = 0;
        self.reader.seek_to(0)?;

        while position < self.len {
            let raw = match read_raw_header(&mut self.reader) {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::warn!("Cache {:?}: stopping scan at byte {}: {}", self.path, position, error);
                    scan.failures.push(ScanFailure { position, error });
                    break;
                }
            };

            // A corrupt length can point past the end or overflow; either way
            // the next record cannot be located
            let next = match raw.record.checked_end_position() {
                Some(end) if end > position && end <= self.len => end,
                _ => {
                    let error = CacheError::TruncatedData {
                        position: raw.record.data_stream_position(),
                        needed: raw.record.data_length(),
                    };
                    tracing::warn!("Cache {:?}: {}", self.path, error);
                    scan.failures.push(ScanFailure { position, error });
                    break;
                }
            };

            match raw.into_record() {
                Ok(record) => scan.records.push(record),
                Err(error) => {
                    tracing::warn!("Cache {:?}: skipping record: {}", self.path, error);
                    scan.failures.push(ScanFailure { position, error });
                }
            }

            position = next;
            self.reader.seek_to(position)?;
        }

        tracing::debug!(
            "Scanned {:?}: {} records, {} failures",
            self.path,
            scan.records.len(),
            scan.failures.len()
        );
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{CURSOR_HEADER_SIZE, FRAME_HEADER_SIZE};
    use crate::record::{CursorType, KeyModifiers, KeyRecord, Raster};
    use std::io::Write;

    fn write_sample(path: &Path) -> Vec<SubSequence> {
        let mut writer = CacheWriter::create(path).unwrap();
        let mut stored = Vec::new();
        stored.push(
            writer
                .append(SubSequence::frame(0, Raster::bgra(2, 2), 40), &[1u8; 16])
                .unwrap(),
        );
        stored.push(
            writer
                .append(
                    SubSequence::cursor(100, Raster::bgra(1, 1), CursorType::Color, 0, 0),
                    &[2u8; 4],
                )
                .unwrap(),
        );
        stored.push(
            writer
                .append(
                    SubSequence::key(150, KeyRecord {
                        key_code: 32,
                        modifiers: KeyModifiers::default(),
                        is_uppercase: false,
                        was_injected: false,
                    }),
                    &[],
                )
                .unwrap(),
        );
        stored.push(
            writer
                .append(SubSequence::frame(250, Raster::bgra(1, 2), 40), &[3u8; 8])
                .unwrap(),
        );
        assert_eq!(writer.records_written(), 4);
        writer.finish().unwrap();
        stored
    }

    #[test]
    fn test_writer_assigns_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.cache");
        let stored = write_sample(&path);

        assert_eq!(stored[0].stream_position, 0);
        assert_eq!(stored[1].stream_position, FRAME_HEADER_SIZE + 16);
        assert_eq!(stored[2].stream_position, stored[1].stream_position + CURSOR_HEADER_SIZE + 4);
        for pair in stored.windows(2) {
            assert_eq!(pair[0].end_position(), pair[1].stream_position);
        }
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, stored.last().unwrap().end_position());
    }

    #[test]
    fn test_scan_and_read_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.cache");
        let stored = write_sample(&path);

        let mut reader = CacheReader::open(&path).unwrap();
        let scan = reader.scan().unwrap();
        assert!(scan.is_clean());
        assert_eq!(scan.records.len(), 4);
        for (loaded, original) in scan.records.iter().zip(&stored) {
            assert_eq!(loaded.stream_position, original.stream_position);
            assert_eq!(loaded.timestamp_ticks, original.timestamp_ticks);
            assert_eq!(loaded.kind(), original.kind());
        }

        assert_eq!(reader.read_payload(&scan.records[3]).unwrap(), vec![3u8; 8]);
        assert_eq!(reader.read_payload(&scan.records[0]).unwrap(), vec![1u8; 16]);

        let cursor = reader.read_record_at(stored[1].stream_position).unwrap();
        assert_eq!(cursor.as_cursor().unwrap().origin, RecordOrigin::Loaded);
    }

    #[test]
    fn test_truncated_tail_keeps_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.cache");
        let stored = write_sample(&path);

        // Chop the last payload in half
        let len = stored[3].end_position() - 4;
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len).unwrap();

        let mut reader = CacheReader::open(&path).unwrap();
        let scan = reader.scan().unwrap();
        assert_eq!(scan.records.len(), 3);
        assert_eq!(scan.failures.len(), 1);
        assert_eq!(scan.failures[0].position, stored[3].stream_position);
        assert!(scan.failures[0].error.is_truncation());

        let err = reader.read_payload(&stored[3]).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.cache");
        let stored = write_sample(&path);

        // Corrupt the horizontal dpi of the cursor record (header byte 33)
        let mut bytes = std::fs::read(&path).unwrap();
        let dpi_offset = stored[1].stream_position as usize + 9 + 4 + 4 + 2 + 2 + 8 + 2 + 2;
        bytes[dpi_offset..dpi_offset + 8].copy_from_slice(&(-1.0f64).to_le_bytes());
        let mut file = File::create(&path).unwrap();
        file.write_all(&bytes).unwrap();
        drop(file);

        let mut reader = CacheReader::open(&path).unwrap();
        let scan = reader.scan().unwrap();
        assert_eq!(scan.records.len(), 3);
        assert_eq!(scan.failures.len(), 1);
        assert!(matches!(scan.failures[0].error, CacheError::MalformedHeader { .. }));
        assert_eq!(scan.records[2].timestamp_ticks, 250);
    }

    #[test]
    fn test_huge_data_length_ends_scan() {
        // Byte offset of `data_length` inside a frame header
        let length_offset = 9 + 4 + 4 + 2 + 2 + 8 + 2 + 2 + 8 + 8 + 1 + 1;
        assert_eq!(length_offset, 51);

        for data_length in [u64::MAX, u64::MAX - 62] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("frames.cache");
            let stored = write_sample(&path);

            let mut bytes = std::fs::read(&path).unwrap();
            bytes[length_offset..length_offset + 8].copy_from_slice(&data_length.to_le_bytes());
            std::fs::write(&path, &bytes).unwrap();

            let mut reader = CacheReader::open(&path).unwrap();
            let scan = reader.scan().unwrap();
            assert!(scan.records.is_empty(), "data_length {data_length}");
            assert_eq!(scan.failures.len(), 1);
            assert_eq!(scan.failures[0].position, 0);
            assert!(scan.failures[0].error.is_truncation());

            let mut corrupt = stored[0];
            corrupt.raster_mut().unwrap().data_length = data_length;
            assert!(reader.read_payload(&corrupt).unwrap_err().is_truncation());
        }
    }

    #[test]
    fn test_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.cache");
        assert!(matches!(CacheReader::open(&missing), Err(CacheError::MissingCache(_))));
        assert!(matches!(CacheWriter::append_to(&missing), Err(CacheError::MissingCache(_))));
    }

    #[test]
    fn test_append_continues_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.cache");
        let stored = write_sample(&path);

        let mut writer = CacheWriter::append_to(&path).unwrap();
        let record = writer
            .append(SubSequence::frame(300, Raster::bgra(1, 1), 40), &[9u8; 4])
            .unwrap();
        assert_eq!(record.stream_position, stored[3].end_position());
        writer.finish().unwrap();

        let scan = CacheReader::open(&path).unwrap().scan().unwrap();
        assert_eq!(scan.records.len(), 5);
    }

    #[test]
    fn test_key_with_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CacheWriter::create(dir.path().join("keys.cache")).unwrap();
        let key = SubSequence::key(0, KeyRecord {
            key_code: 1,
            modifiers: KeyModifiers::default(),
            is_uppercase: false,
            was_injected: false,
        });
        assert!(writer.append(key, &[1]).is_err());
        assert_eq!(writer.position(), 0);
    }
}
