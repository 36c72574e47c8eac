// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequencer errors.

use rewind_cache::{CacheError, SubSequenceKind};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from editing a sequence's record list
#[derive(Debug, Error)]
pub enum SequenceError {
    /// Record kind differs from the sequence kind
    #[error("{found:?} record cannot be added to a {expected:?} sequence")]
    KindMismatch {
        /// Kind of the sequence
        expected: SubSequenceKind,
        /// Kind of the record
        found: SubSequenceKind,
    },

    /// Record is older than the last record
    #[error("Timestamp {timestamp} precedes the previous record at {previous}")]
    TimestampOrder {
        /// Offending timestamp
        timestamp: i64,
        /// Timestamp of the previous record
        previous: i64,
    },

    /// Record starts before the previous record's payload ends
    #[error("Record at byte {position} overlaps the previous record ending at byte {previous_end}")]
    Overlap {
        /// Stream position of the offending record
        position: u64,
        /// End of the previous record
        previous_end: u64,
    },

    /// Cache file error
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors from rendering a single record
#[derive(Debug, Error)]
pub enum RenderError {
    /// Reading the cache failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The payload's pixel format cannot be composited
    #[error("Unsupported pixel format: {channels} channels of {bits} bits for {what}")]
    UnsupportedFormat {
        /// Channel count
        channels: u8,
        /// Bits per channel
        bits: u8,
        /// What was being drawn
        what: &'static str,
    },

    /// The thread reading the payload panicked
    #[error("Payload read thread panicked")]
    FetchPanicked,
}

/// Errors from loading or saving a project
#[derive(Debug, Error)]
pub enum ProjectError {
    /// IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or cache decoding failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Record list rejected
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// Not a project manifest
    #[error("Not a project manifest: {}", .0.display())]
    BadMagic(PathBuf),

    /// Manifest written by a newer version
    #[error("Project version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u16,
        /// Highest version this build reads
        supported: u16,
    },

    /// Too many items for the manifest's count fields
    #[error("Too many {what} to store: {count}")]
    TooMany {
        /// What overflowed
        what: &'static str,
        /// How many there were
        count: usize,
    },
}

/// Result type for project operations
pub type Result<T> = std::result::Result<T, ProjectError>;
