// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised while reading or writing cache streams.

use std::path::PathBuf;
use thiserror::Error;

/// Cache codec errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// The stream ended before a complete value could be read
    #[error("Truncated data at byte {position}: needed {needed} more bytes")]
    TruncatedData {
        /// Stream position where the short read started
        position: u64,
        /// Number of bytes that were requested
        needed: u64,
    },

    /// A header field is outside its declared domain
    #[error("Malformed header at byte {position}: {reason}")]
    MalformedHeader {
        /// Stream position of the record header
        position: u64,
        /// What was wrong with it
        reason: String,
    },

    /// The backing cache file does not exist
    #[error("Cache file not found: {}", .0.display())]
    MissingCache(PathBuf),

    /// A string does not fit its length prefix
    #[error("String of {len} bytes does not fit a {prefix_bytes}-byte length prefix")]
    StringTooLong {
        /// Encoded length in bytes
        len: usize,
        /// Width of the length prefix
        prefix_bytes: u8,
    },

    /// Any other IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Build a malformed header error
    pub fn malformed(position: u64, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            position,
            reason: reason.into(),
        }
    }

    /// Whether the error means no further records can be read after it
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedData { .. })
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
