// SPDX-License-Identifier: MIT OR Apache-2.0
//! Player settings stored as RON.

use rewind_sequencer::RenderQuality;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name used when none is given
pub const SETTINGS_FILE_NAME: &str = "rewind.ron";

/// Errors from loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid settings RON
    #[error("Invalid settings file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer player
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Settings format version
    pub version: u32,
    /// Resampling quality for resized records
    pub quality: RenderQuality,
    /// Playback ticks per second
    pub fps: u32,
    /// Playback speed multiplier
    pub speed: f64,
    /// Log filter directives, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Upper bound on frames written by `play`
    pub max_frames: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            quality: RenderQuality::Fast,
            fps: 10,
            speed: 1.0,
            log_filter: "rewind_player=info,rewind_sequencer=info,rewind_cache=warn".to_string(),
            max_frames: 600,
        }
    }
}

impl PlayerSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: PlayerSettings = ron::from_str(&content)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
