// SPDX-License-Identifier: MIT OR Apache-2.0
//! Projects: the canvas, its tracks and where their caches live.

use crate::error::{ProjectError, Result, SequenceError};
use crate::project_file::{read_manifest, write_manifest};
use crate::sequence::{LoadReport, Sequence};
use crate::surface::{Bgra, BLACK};
use crate::track::{Track, TrackId};
use indexmap::IndexMap;
use rewind_cache::{CacheError, KeyRecord, SubSequenceKind};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Manifest file name inside a project directory
pub const MANIFEST_FILE_NAME: &str = "project.rwp";

/// A key record reached during playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Track holding the key sequence
    pub track: TrackId,
    /// When the key was pressed, in ticks
    pub timestamp_ticks: i64,
    /// The key press
    pub key: KeyRecord,
}

/// A recording project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project name
    pub name: String,
    /// Canvas width in pixels
    pub width: u16,
    /// Canvas height in pixels
    pub height: u16,
    /// Canvas fill drawn before any track
    pub background: Bgra,
    /// Tracks in draw order
    tracks: IndexMap<TrackId, Track>,
    /// Directory holding the manifest and caches
    #[serde(skip)]
    directory: PathBuf,
}

impl Project {
    /// Create an empty project
    pub fn new(name: impl Into<String>, width: u16, height: u16) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            background: BLACK,
            tracks: IndexMap::new(),
            directory: PathBuf::new(),
        }
    }

    /// Set the canvas fill
    pub fn with_background(mut self, color: Bgra) -> Self {
        self.background = color;
        self
    }

    /// Set the directory caches are resolved against
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Directory caches are resolved against
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Manifest path for a project directory
    pub fn manifest_path(project_dir: &Path) -> PathBuf {
        project_dir.join(MANIFEST_FILE_NAME)
    }

    /// Check if a directory contains a project manifest
    pub fn is_project_directory(dir: &Path) -> bool {
        Self::manifest_path(dir).is_file()
    }

    /// Open a project and load every sequence's records.
    ///
    /// A sequence whose cache is missing stays empty and is reported when
    /// rendered; other cache problems are logged and the sequence keeps what
    /// could be read.
    pub fn open(project_dir: &Path) -> Result<Self> {
        let manifest_path = Self::manifest_path(project_dir);
        let file = File::open(&manifest_path)?;
        let mut project = read_manifest(BufReader::new(file), &manifest_path)?.with_directory(project_dir);

        let directory = project.directory.clone();
        for track in project.tracks.values_mut() {
            for sequence in track.sequences_mut() {
                match sequence.load_records(&directory) {
                    Ok(LoadReport { failures, rejected, .. }) if !failures.is_empty() || rejected > 0 => {
                        tracing::warn!(
                            "Sequence '{}' loaded with {} unreadable and {} rejected records",
                            sequence.name,
                            failures.len(),
                            rejected
                        );
                    }
                    Ok(_) => {}
                    Err(SequenceError::Cache(CacheError::MissingCache(path))) => {
                        tracing::warn!("Sequence '{}' has no cache at {:?}", sequence.name, path);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        tracing::info!(
            "Opened project '{}' ({} tracks) from {:?}",
            project.name,
            project.track_count(),
            project_dir
        );
        Ok(project)
    }

    /// Write the manifest into the project directory
    pub fn save(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(ProjectError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "project has no directory",
            )));
        }
        std::fs::create_dir_all(&self.directory)?;

        let path = Self::manifest_path(&self.directory);
        let file = File::create(&path)?;
        let written = write_manifest(self, BufWriter::new(file))?;
        tracing::info!("Saved project '{}' to {:?} ({} bytes)", self.name, path, written);
        Ok(())
    }

    /// Add a track on top of the existing ones
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.insert(id, track);
        id
    }

    /// Remove a track, keeping the order of the others
    pub fn remove_track(&mut self, track_id: TrackId) -> Option<Track> {
        self.tracks.shift_remove(&track_id)
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Get a mutable track
    pub fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&track_id)
    }

    /// All tracks in draw order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Visible tracks in draw order
    pub fn visible_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values().filter(|t| t.visible)
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Latest record timestamp across all tracks
    pub fn duration(&self) -> i64 {
        self.tracks.values().map(Track::duration).max().unwrap_or(0)
    }

    fn drawn_sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.visible_tracks()
            .flat_map(Track::sequences)
            .filter(|s| s.kind != SubSequenceKind::Key)
    }

    /// Next timestamp after `timestamp` where any visible frame or cursor changes
    pub fn next_change_after(&self, timestamp: i64) -> Option<i64> {
        self.drawn_sequences()
            .filter_map(|s| s.next_timestamp_after(timestamp))
            .min()
    }

    /// Last timestamp before `timestamp` where any visible frame or cursor changes
    pub fn previous_change_before(&self, timestamp: i64) -> Option<i64> {
        self.drawn_sequences()
            .filter_map(|s| s.previous_timestamp_before(timestamp))
            .max()
    }

    /// Key presses with `from < timestamp <= to` on visible tracks, in time order
    pub fn keys_between(&self, from: i64, to: i64) -> Vec<KeyEvent> {
        let mut events: Vec<KeyEvent> = self
            .visible_tracks()
            .flat_map(|track| {
                track
                    .sequences()
                    .iter()
                    .filter(|s| s.kind == SubSequenceKind::Key)
                    .flat_map(move |s| {
                        s.records_between(from, to).iter().filter_map(move |r| {
                            r.as_key().map(|key| KeyEvent {
                                track: track.id,
                                timestamp_ticks: r.timestamp_ticks,
                                key: *key,
                            })
                        })
                    })
            })
            .collect();
        events.sort_by_key(|e| e.timestamp_ticks);
        events
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled Project", 1280, 720)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_cache::{CacheWriter, CursorType, KeyModifiers, Raster, SubSequence};

    fn key(ticks: i64, code: u16) -> SubSequence {
        SubSequence::key(ticks, KeyRecord {
            key_code: code,
            modifiers: KeyModifiers::default(),
            is_uppercase: false,
            was_injected: false,
        })
    }

    #[test]
    fn test_default_project() {
        let project = Project::default();
        assert_eq!(project.track_count(), 0);
        assert_eq!(project.background, BLACK);
        assert_eq!(project.duration(), 0);
    }

    #[test]
    fn test_track_order_survives_removal() {
        let mut project = Project::new("P", 10, 10);
        let a = project.add_track(Track::new("a"));
        project.add_track(Track::new("b"));
        project.add_track(Track::new("c"));
        project.remove_track(a);
        let names: Vec<_> = project.tracks().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CacheWriter::create(dir.path().join("cursor.cache")).unwrap();
        writer
            .append(SubSequence::cursor(0, Raster::bgra(1, 1), CursorType::Color, 0, 0), &[0, 0, 255, 255])
            .unwrap();
        writer
            .append(SubSequence::cursor(500, Raster::bgra(1, 1), CursorType::Color, 0, 0), &[0, 255, 0, 255])
            .unwrap();
        writer.finish().unwrap();

        let mut project = Project::new("Saved", 4, 4).with_directory(dir.path());
        let mut track = Track::new("Cursor");
        track.add_sequence(Sequence::new("Pointer", SubSequenceKind::Cursor, "cursor.cache").placed(0, 0, 4, 4));
        track.add_sequence(Sequence::new("Lost", SubSequenceKind::Frame, "lost.cache"));
        project.add_track(track);
        project.save().unwrap();
        assert!(Project::is_project_directory(dir.path()));

        let opened = Project::open(dir.path()).unwrap();
        assert_eq!(opened.name, "Saved");
        assert_eq!(opened.directory(), dir.path());
        let sequences = opened.tracks().next().unwrap().sequences();
        assert_eq!(sequences[0].len(), 2);
        assert!(sequences[1].is_empty());
        assert_eq!(opened.duration(), 500);
        assert_eq!(opened.next_change_after(0), Some(500));
        assert_eq!(opened.previous_change_before(500), Some(0));
    }

    #[test]
    fn test_save_without_directory_fails() {
        assert!(Project::new("Nowhere", 1, 1).save().is_err());
    }

    #[test]
    fn test_keys_between_skips_hidden_tracks() {
        let mut project = Project::new("Keys", 1, 1);
        let mut shown = Track::new("Keys");
        let keys = [key(10, 65), key(20, 66)]
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.stream_position = i as u64 * 13;
                r
            });
        shown.add_sequence(Sequence::new("K", SubSequenceKind::Key, "k.cache").with_records(keys).unwrap());
        let mut hidden = shown.clone();
        hidden.id = TrackId::new();
        hidden.visible = false;
        project.add_track(shown);
        project.add_track(hidden);

        let events = project.keys_between(0, 15);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key.key_code, 65);
        assert_eq!(project.keys_between(10, 20)[0].timestamp_ticks, 20);
        assert!(project.keys_between(20, 100).is_empty());
    }
}
