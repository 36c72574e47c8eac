// SPDX-License-Identifier: MIT OR Apache-2.0
//! A sequence of records backed by one cache file.

use crate::compositor::{composite_record, CompositeStats, Placement, RenderQuality};
use crate::error::{RenderError, SequenceError};
use crate::surface::{Bgra, ClipRect, Surface};
use rewind_cache::{CacheReader, CacheError, ScanFailure, SubSequence, SubSequenceKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique identifier for a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub Uuid);

impl SequenceId {
    /// Create a new random sequence ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of loading a sequence's records from its cache
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Records added to the sequence
    pub loaded: usize,
    /// Records the cache scan could not decode
    pub failures: Vec<ScanFailure>,
    /// Decoded records that broke the sequence's ordering or kind
    pub rejected: usize,
}

/// Records of one kind, placed on the canvas, stored in one cache file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    /// Unique sequence ID
    pub id: SequenceId,
    /// Sequence name
    pub name: String,
    /// Kind shared by every record
    pub kind: SubSequenceKind,
    /// Horizontal canvas offset
    pub left: i32,
    /// Vertical canvas offset
    pub top: i32,
    /// Width of the sequence's canvas region
    pub width: u16,
    /// Height of the sequence's canvas region
    pub height: u16,
    /// Fill drawn under the records
    pub background: Option<Bgra>,
    /// Frame opacity, 0 to 1
    pub opacity: f64,
    /// Cache file, relative to the project directory
    pub cache_path: PathBuf,
    /// Records ordered by timestamp
    #[serde(skip)]
    records: Vec<SubSequence>,
}

impl Sequence {
    /// Create an empty sequence
    pub fn new(name: impl Into<String>, kind: SubSequenceKind, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            id: SequenceId::new(),
            name: name.into(),
            kind,
            left: 0,
            top: 0,
            width: 0,
            height: 0,
            background: None,
            opacity: 1.0,
            cache_path: cache_path.into(),
            records: Vec::new(),
        }
    }

    /// Set the canvas region
    pub fn placed(mut self, left: i32, top: i32, width: u16, height: u16) -> Self {
        self.left = left;
        self.top = top;
        self.width = width;
        self.height = height;
        self
    }

    /// Set the background fill
    pub fn with_background(mut self, color: Bgra) -> Self {
        self.background = Some(color);
        self
    }

    /// Set the frame opacity
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Replace the records, validating them in order
    pub fn with_records(mut self, records: impl IntoIterator<Item = SubSequence>) -> Result<Self, SequenceError> {
        self.records.clear();
        for record in records {
            self.push_record(record)?;
        }
        Ok(self)
    }

    /// Append a record after the current last one
    pub fn push_record(&mut self, record: SubSequence) -> Result<(), SequenceError> {
        if record.kind() != self.kind {
            return Err(SequenceError::KindMismatch {
                expected: self.kind,
                found: record.kind(),
            });
        }

        if let Some(last) = self.records.last() {
            if record.timestamp_ticks < last.timestamp_ticks {
                return Err(SequenceError::TimestampOrder {
                    timestamp: record.timestamp_ticks,
                    previous: last.timestamp_ticks,
                });
            }
            if record.stream_position < last.end_position() {
                return Err(SequenceError::Overlap {
                    position: record.stream_position,
                    previous_end: last.end_position(),
                });
            }
        }

        self.records.push(record);
        Ok(())
    }

    /// Records in timestamp order
    pub fn records(&self) -> &[SubSequence] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the sequence has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The last record at or before `timestamp`.
    ///
    /// Among records sharing a timestamp the last one in the list wins.
    pub fn active_record_at(&self, timestamp: i64) -> Option<&SubSequence> {
        let count = self.records.partition_point(|r| r.timestamp_ticks <= timestamp);
        count.checked_sub(1).map(|index| &self.records[index])
    }

    /// Records with `from < timestamp <= to`
    pub fn records_between(&self, from: i64, to: i64) -> &[SubSequence] {
        if to <= from {
            return &[];
        }
        let start = self.records.partition_point(|r| r.timestamp_ticks <= from);
        let end = self.records.partition_point(|r| r.timestamp_ticks <= to);
        &self.records[start..end]
    }

    /// Timestamp of the last record
    pub fn duration(&self) -> i64 {
        self.records.last().map_or(0, |r| r.timestamp_ticks)
    }

    /// First record timestamp strictly after `timestamp`
    pub fn next_timestamp_after(&self, timestamp: i64) -> Option<i64> {
        let index = self.records.partition_point(|r| r.timestamp_ticks <= timestamp);
        self.records.get(index).map(|r| r.timestamp_ticks)
    }

    /// Last record timestamp strictly before `timestamp`
    pub fn previous_timestamp_before(&self, timestamp: i64) -> Option<i64> {
        let index = self.records.partition_point(|r| r.timestamp_ticks < timestamp);
        index.checked_sub(1).map(|i| self.records[i].timestamp_ticks)
    }

    /// Canvas region of the sequence
    pub fn rect(&self) -> ClipRect {
        ClipRect::new(self.left as i64, self.top as i64, self.width as i64, self.height as i64)
    }

    /// Where records are drawn on the canvas
    pub fn placement(&self) -> Placement {
        Placement::at(self.left as i64, self.top as i64)
            .clipped_to(self.rect())
            .with_opacity(self.opacity)
    }

    /// Absolute cache file path inside a project directory
    pub fn cache_file(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.cache_path)
    }

    /// Replace the records with those scanned from the cache file.
    ///
    /// Undecodable records and records that break ordering are logged and
    /// left out; a missing cache is an error.
    pub fn load_records(&mut self, project_dir: &Path) -> Result<LoadReport, SequenceError> {
        let mut reader = CacheReader::open(self.cache_file(project_dir))?;
        let scan = reader.scan()?;

        let mut report = LoadReport {
            failures: scan.failures,
            ..Default::default()
        };
        self.records.clear();
        for record in scan.records {
            let timestamp = record.timestamp_ticks;
            match self.push_record(record) {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    tracing::warn!("Sequence '{}': dropping record at tick {}: {}", self.name, timestamp, e);
                    report.rejected += 1;
                }
            }
        }

        tracing::debug!(
            "Sequence '{}': loaded {} records ({} failed, {} rejected)",
            self.name,
            report.loaded,
            report.failures.len(),
            report.rejected
        );
        Ok(report)
    }

    /// Read the payload of one of this sequence's records
    pub fn read_payload(&self, record: &SubSequence, cache_file: &Path) -> Result<Vec<u8>, CacheError> {
        if record.data_length() == 0 {
            return Ok(Vec::new());
        }
        CacheReader::open(cache_file)?.read_payload(record)
    }

    /// Draw the background, then `record` with an already-read payload
    pub fn draw(
        &self,
        surface: &mut Surface,
        record: Option<&SubSequence>,
        payload: &[u8],
        quality: RenderQuality,
    ) -> Result<CompositeStats, RenderError> {
        if let Some(color) = self.background {
            surface.fill_rect(self.rect(), color);
        }
        match record {
            Some(record) => composite_record(surface, record, payload, &self.placement(), quality),
            None => Ok(CompositeStats::default()),
        }
    }

    /// Render the state of this sequence at `timestamp` onto `surface`.
    ///
    /// The cache is opened read-only for this call only.
    pub fn render_at(
        &self,
        surface: &mut Surface,
        timestamp: i64,
        quality: RenderQuality,
        cache_file: &Path,
    ) -> Result<CompositeStats, RenderError> {
        let record = self.active_record_at(timestamp);
        let payload = match record {
            Some(record) => self.read_payload(record, cache_file)?,
            None => Vec::new(),
        };
        self.draw(surface, record, &payload, quality)
    }
}
