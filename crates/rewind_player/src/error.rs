// SPDX-License-Identifier: MIT OR Apache-2.0
//! Player command errors.

use crate::settings::SettingsError;
use crate::snapshot::SnapshotError;
use rewind_cache::CacheError;
use rewind_sequencer::ProjectError;
use thiserror::Error;

/// Errors that end a player command
#[derive(Debug, Error)]
pub enum PlayerError {
    /// IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Project could not be opened or saved
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Settings could not be loaded
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Snapshot could not be written
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A background task failed
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Nothing to do with the given arguments
    #[error("{0}")]
    Usage(String),
}

/// Result type for player commands
pub type Result<T> = std::result::Result<T, PlayerError>;
