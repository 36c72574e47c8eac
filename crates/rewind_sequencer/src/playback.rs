// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback position and transport state.

use crate::project::{KeyEvent, Project};
use serde::{Deserialize, Serialize};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused
    Paused,
    /// Playing in reverse
    Reverse,
}

/// Loop region, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRange {
    /// Start time
    pub start: i64,
    /// End time
    pub end: i64,
}

/// Drives the current timestamp of a project
#[derive(Debug, Clone)]
pub struct PlaybackController {
    /// Current playback time, in ticks
    pub time: i64,
    /// Playback state
    pub state: PlaybackState,
    /// Playback speed multiplier
    pub speed: f64,
    /// Loop region; without one playback stops at the ends
    pub loop_range: Option<LoopRange>,
    /// Key presses passed during the last update
    pending_keys: Vec<KeyEvent>,
}

impl PlaybackController {
    /// Create a new playback controller
    pub fn new() -> Self {
        Self {
            time: 0,
            state: PlaybackState::Stopped,
            speed: 1.0,
            loop_range: None,
            pending_keys: Vec::new(),
        }
    }

    /// Advance by `delta_ticks` of wall time.
    ///
    /// Returns whether the time changed.
    pub fn update(&mut self, delta_ticks: i64, project: &Project) -> bool {
        let before = self.time;
        let step = (delta_ticks as f64 * self.speed).round() as i64;
        match self.state {
            PlaybackState::Playing => {
                self.time = self.time.saturating_add(step);
                self.check_bounds(project);
            }
            PlaybackState::Reverse => {
                self.time = self.time.saturating_sub(step);
                self.check_bounds_reverse(project);
            }
            PlaybackState::Paused | PlaybackState::Stopped => {}
        }

        self.collect_keys(before, project);
        self.time != before
    }

    fn bounds(&self, project: &Project) -> (i64, i64) {
        match self.loop_range {
            Some(range) => (range.start, range.end),
            None => (0, project.duration()),
        }
    }

    /// Handle reaching the end
    fn check_bounds(&mut self, project: &Project) {
        let (start, end) = self.bounds(project);
        if self.time < end {
            return;
        }
        if self.loop_range.is_some() && end > start {
            self.time = start + (self.time - end) % (end - start);
        } else {
            self.time = end;
            self.state = PlaybackState::Stopped;
        }
    }

    /// Handle reaching the start while reversing
    fn check_bounds_reverse(&mut self, project: &Project) {
        let (start, end) = self.bounds(project);
        if self.time > start {
            return;
        }
        if self.loop_range.is_some() && end > start {
            self.time = end - (start - self.time) % (end - start);
        } else {
            self.time = start;
            self.state = PlaybackState::Stopped;
        }
    }

    /// Collect key presses between the previous and current time
    fn collect_keys(&mut self, before: i64, project: &Project) {
        self.pending_keys.clear();
        if self.state == PlaybackState::Reverse || self.time == before {
            return;
        }

        if self.time > before {
            self.pending_keys = project.keys_between(before, self.time);
        } else if let Some(range) = self.loop_range {
            // Wrapped around the loop end
            self.pending_keys = project.keys_between(before, range.end);
            self.pending_keys.extend(project.keys_between(range.start - 1, self.time));
        }
    }

    /// Get pending key presses and clear them
    pub fn take_keys(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.pending_keys)
    }

    /// Play from current position
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and reset to beginning
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = self.loop_range.map_or(0, |r| r.start);
        self.pending_keys.clear();
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Reverse => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Play in reverse
    pub fn play_reverse(&mut self) {
        self.state = PlaybackState::Reverse;
    }

    /// Seek to a specific time
    pub fn seek(&mut self, time: i64) {
        self.time = time.max(0);
        self.pending_keys.clear();
    }

    /// Jump to the next frame or cursor change; returns whether one existed
    pub fn step_forward(&mut self, project: &Project) -> bool {
        match project.next_change_after(self.time) {
            Some(time) => {
                self.seek(time);
                true
            }
            None => false,
        }
    }

    /// Jump to the previous frame or cursor change; returns whether one existed
    pub fn step_backward(&mut self, project: &Project) -> bool {
        match project.previous_change_before(self.time) {
            Some(time) => {
                self.seek(time);
                true
            }
            None => false,
        }
    }

    /// Set loop range
    pub fn set_loop_range(&mut self, start: i64, end: i64) {
        self.loop_range = Some(LoopRange {
            start: start.min(end),
            end: start.max(end),
        });
    }

    /// Clear loop range
    pub fn clear_loop_range(&mut self) {
        self.loop_range = None;
    }

    /// Is currently playing (forward or reverse)
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Reverse)
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;
    use crate::track::Track;
    use rewind_cache::{CursorType, KeyModifiers, KeyRecord, Raster, SubSequence, SubSequenceKind};

    fn project() -> Project {
        let cursors = [0, 400, 1_000].into_iter().enumerate().map(|(i, t)| {
            let mut record = SubSequence::cursor(t, Raster::bgra(1, 1), CursorType::Color, 0, 0);
            record.stream_position = i as u64 * 100;
            record
        });
        let keys = [150, 700].into_iter().enumerate().map(|(i, t)| {
            let mut record = SubSequence::key(t, KeyRecord {
                key_code: 65 + i as u16,
                modifiers: KeyModifiers::default(),
                is_uppercase: false,
                was_injected: false,
            });
            record.stream_position = i as u64 * 13;
            record
        });

        let mut track = Track::new("Input");
        track.add_sequence(Sequence::new("Cursor", SubSequenceKind::Cursor, "c").with_records(cursors).unwrap());
        track.add_sequence(Sequence::new("Keys", SubSequenceKind::Key, "k").with_records(keys).unwrap());
        let mut project = Project::new("Playback", 1, 1);
        project.add_track(track);
        project
    }

    #[test]
    fn test_play_pause_stop() {
        let project = project();
        let mut playback = PlaybackController::new();
        assert!(!playback.update(100, &project));

        playback.play();
        assert!(playback.update(100, &project));
        assert_eq!(playback.time, 100);

        playback.toggle_playback();
        assert_eq!(playback.state, PlaybackState::Paused);
        playback.update(100, &project);
        assert_eq!(playback.time, 100);

        playback.stop();
        assert_eq!(playback.time, 0);
        assert!(!playback.is_playing());
    }

    #[test]
    fn test_stops_at_end() {
        let project = project();
        let mut playback = PlaybackController::new();
        playback.speed = 2.0;
        playback.play();
        playback.update(600, &project);
        assert_eq!(playback.time, 1_000);
        assert_eq!(playback.state, PlaybackState::Stopped);

        playback.play_reverse();
        playback.update(2_000, &project);
        assert_eq!(playback.time, 0);
        assert_eq!(playback.state, PlaybackState::Stopped);
    }

    #[test]
    fn test_loop_wraps_and_collects_keys() {
        let project = project();
        let mut playback = PlaybackController::new();
        playback.set_loop_range(800, 100);
        playback.seek(600);
        playback.play();

        playback.update(300, &project);
        assert_eq!(playback.time, 200);
        let codes: Vec<_> = playback.take_keys().iter().map(|k| k.key.key_code).collect();
        assert_eq!(codes, vec![66, 65]);
        assert!(playback.take_keys().is_empty());
    }

    #[test]
    fn test_keys_collected_forward_only() {
        let project = project();
        let mut playback = PlaybackController::new();
        playback.play();
        playback.update(150, &project);
        assert_eq!(playback.take_keys().len(), 1);
        playback.update(100, &project);
        assert!(playback.take_keys().is_empty());
    }

    #[test]
    fn test_step_between_changes() {
        let project = project();
        let mut playback = PlaybackController::new();
        assert!(playback.step_forward(&project));
        assert_eq!(playback.time, 400);
        assert!(playback.step_forward(&project));
        assert_eq!(playback.time, 1_000);
        assert!(!playback.step_forward(&project));

        playback.seek(500);
        assert!(playback.step_backward(&project));
        assert_eq!(playback.time, 400);
        playback.seek(0);
        assert!(!playback.step_backward(&project));
    }
}
