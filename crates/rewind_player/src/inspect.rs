// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project summaries for the `inspect` command.

use rewind_cache::{millis_from_ticks, SubSequenceKind};
use rewind_sequencer::{Project, Sequence, Track};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Summary of one sequence
#[derive(Debug, Serialize)]
pub struct SequenceSummary {
    /// Sequence name
    pub name: String,
    /// Record kind
    pub kind: SubSequenceKind,
    /// Cache file, relative to the project
    pub cache_path: PathBuf,
    /// Canvas region as left, top, width, height
    pub rect: (i32, i32, u16, u16),
    /// Number of loaded records
    pub records: usize,
    /// First record time in milliseconds
    pub first_ms: Option<i64>,
    /// Last record time in milliseconds
    pub last_ms: Option<i64>,
    /// Total payload bytes
    pub payload_bytes: u64,
}

impl SequenceSummary {
    fn new(sequence: &Sequence) -> Self {
        let records = sequence.records();
        Self {
            name: sequence.name.clone(),
            kind: sequence.kind,
            cache_path: sequence.cache_path.clone(),
            rect: (sequence.left, sequence.top, sequence.width, sequence.height),
            records: records.len(),
            first_ms: records.first().map(|r| millis_from_ticks(r.timestamp_ticks)),
            last_ms: records.last().map(|r| millis_from_ticks(r.timestamp_ticks)),
            payload_bytes: records.iter().map(|r| r.data_length()).sum(),
        }
    }
}

/// Summary of one track
#[derive(Debug, Serialize)]
pub struct TrackSummary {
    /// Track name
    pub name: String,
    /// Whether the track is drawn
    pub visible: bool,
    /// Whether the track is locked
    pub locked: bool,
    /// Its sequences
    pub sequences: Vec<SequenceSummary>,
}

impl TrackSummary {
    fn new(track: &Track) -> Self {
        Self {
            name: track.name.clone(),
            visible: track.visible,
            locked: track.locked,
            sequences: track.sequences().iter().map(SequenceSummary::new).collect(),
        }
    }
}

/// Summary of a project
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    /// Project name
    pub name: String,
    /// Canvas width
    pub width: u16,
    /// Canvas height
    pub height: u16,
    /// Latest record in milliseconds
    pub duration_ms: i64,
    /// Tracks in draw order
    pub tracks: Vec<TrackSummary>,
}

impl ProjectSummary {
    /// Summarize an opened project
    pub fn new(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            width: project.width,
            height: project.height,
            duration_ms: millis_from_ticks(project.duration()),
            tracks: project.tracks().map(TrackSummary::new).collect(),
        }
    }
}

impl fmt::Display for ProjectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}x{}, {} ms)", self.name, self.width, self.height, self.duration_ms)?;
        for track in &self.tracks {
            let mut flags = Vec::new();
            if !track.visible {
                flags.push("hidden");
            }
            if track.locked {
                flags.push("locked");
            }
            if flags.is_empty() {
                writeln!(f, "  {}", track.name)?;
            } else {
                writeln!(f, "  {} [{}]", track.name, flags.join(", "))?;
            }

            for sequence in &track.sequences {
                let span = match (sequence.first_ms, sequence.last_ms) {
                    (Some(first), Some(last)) => format!("{first}..{last} ms"),
                    _ => "empty".to_string(),
                };
                writeln!(
                    f,
                    "    {} ({}): {} records, {}, {} bytes in {}",
                    sequence.name,
                    sequence.kind.name(),
                    sequence.records,
                    span,
                    sequence.payload_bytes,
                    sequence.cache_path.display()
                )?;
            }
        }
        Ok(())
    }
}
